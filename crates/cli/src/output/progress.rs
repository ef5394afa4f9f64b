//! Progress bars for transfer operations
//!
//! A [`ProgressBar`] is handed to the transfer engine as its progress sink.
//! Bulk transfers count finished files; single-object transfers count bytes.

use std::time::Duration;

use indicatif::{ProgressDrawTarget, ProgressStyle};
use s3cli_core::transfer::ProgressSink;

use super::OutputConfig;

const FILES_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({elapsed}, eta {eta})";
const BYTES_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})";
const UNKNOWN_BYTES_TEMPLATE: &str = "{spinner:.green} {bytes} ({bytes_per_sec})";

/// What the bar is counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressUnit {
    Files,
    Bytes,
}

/// Progress bar wrapper
///
/// In quiet, JSON or no-progress mode the bar is never drawn.
#[derive(Debug)]
pub struct ProgressBar {
    unit: ProgressUnit,
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Bar counting finished files
    pub fn files(config: &OutputConfig) -> Self {
        Self::new(config, ProgressUnit::Files)
    }

    /// Bar counting transferred bytes
    pub fn bytes(config: &OutputConfig) -> Self {
        Self::new(config, ProgressUnit::Bytes)
    }

    fn new(config: &OutputConfig, unit: ProgressUnit) -> Self {
        let bar = config.progress_enabled().then(|| {
            indicatif::ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())
        });
        Self { unit, bar }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    fn style(&self, known_total: bool) -> ProgressStyle {
        let template = match (self.unit, known_total) {
            (ProgressUnit::Files, _) => FILES_TEMPLATE,
            (ProgressUnit::Bytes, true) => BYTES_TEMPLATE,
            (ProgressUnit::Bytes, false) => UNKNOWN_BYTES_TEMPLATE,
        };
        ProgressStyle::with_template(template)
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl ProgressSink for ProgressBar {
    fn set_total(&self, total: Option<u64>) {
        let Some(bar) = &self.bar else { return };
        bar.set_style(self.style(total.is_some()));
        match total {
            Some(len) => bar.set_length(len),
            None => {
                bar.unset_length();
                bar.enable_steady_tick(Duration::from_millis(100));
            }
        }
    }

    fn inc(&self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_quiet_mode() {
        let config = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        let bar = ProgressBar::files(&config);
        assert!(!bar.is_visible());
        // Hidden bars accept updates
        bar.set_total(Some(3));
        bar.inc(1);
        bar.finish();
    }

    #[test]
    fn test_progress_bar_json_mode() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        };
        assert!(!ProgressBar::bytes(&config).is_visible());
    }

    #[test]
    fn test_progress_bar_no_progress() {
        let config = OutputConfig {
            no_progress: true,
            ..Default::default()
        };
        assert!(!ProgressBar::bytes(&config).is_visible());
    }

    #[test]
    fn test_progress_bar_normal() {
        let bar = ProgressBar::bytes(&OutputConfig::default());
        assert!(bar.is_visible());
        bar.finish();
    }

    #[test]
    fn test_templates_parse() {
        for template in [FILES_TEMPLATE, BYTES_TEMPLATE, UNKNOWN_BYTES_TEMPLATE] {
            assert!(ProgressStyle::with_template(template).is_ok());
        }
    }
}
