//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles progress bars and colored output.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::ProgressBar;

use s3cli_core::{ColorMode, Defaults, OutputFormat};

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Fill in anything the flags left unset from the config file defaults
    pub fn with_defaults(mut self, defaults: &Defaults) -> Self {
        self.json |= defaults.output == OutputFormat::Json;
        self.no_color |= defaults.color == ColorMode::Never;
        self.no_progress |= !defaults.progress;
        self
    }

    /// Whether progress bars may be drawn
    pub fn progress_enabled(&self) -> bool {
        !(self.quiet || self.json || self.no_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_win_over_defaults() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        }
        .with_defaults(&Defaults::default());
        assert!(config.json);
        assert!(!config.no_color);
        assert!(!config.progress_enabled());
    }

    #[test]
    fn test_defaults_apply() {
        let defaults = Defaults {
            output: OutputFormat::Json,
            color: ColorMode::Never,
            progress: false,
            ..Default::default()
        };
        let config = OutputConfig::default().with_defaults(&defaults);
        assert!(config.json);
        assert!(config.no_color);
        assert!(config.no_progress);
    }

    #[test]
    fn test_progress_enabled_by_default() {
        assert!(OutputConfig::default().progress_enabled());
        let quiet = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        assert!(!quiet.progress_enabled());
    }
}
