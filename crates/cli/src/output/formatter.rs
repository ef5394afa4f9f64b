//! Output formatter for human-readable and JSON output
//!
//! Command results go to stdout; status lines and errors go to stderr, except
//! success notes which belong to the result.

use console::{Style, style};
use serde::Serialize;

use super::OutputConfig;

/// Kind of one-line status message
#[derive(Debug, Clone, Copy)]
enum Status {
    Success,
    Warning,
    Error,
}

impl Status {
    fn symbol(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }

    fn style(self) -> Style {
        match self {
            Status::Success => Style::new().green(),
            Status::Warning => Style::new().yellow(),
            Status::Error => Style::new().red(),
        }
    }
}

/// Formatter for CLI output
///
/// In JSON mode only structured values and errors are printed, without
/// colors.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    fn status_line(&self, status: Status, message: &str) -> String {
        let symbol = if self.colors_enabled() {
            status.style().apply_to(status.symbol()).to_string()
        } else {
            status.symbol().to_string()
        };
        format!("{symbol} {message}")
    }

    /// Success note; silent in quiet and JSON modes where the exit code says it all
    pub fn success(&self, message: &str) {
        if !(self.config.quiet || self.config.json) {
            println!("{}", self.status_line(Status::Success, message));
        }
    }

    /// Warning on stderr; silent in quiet and JSON modes
    pub fn warning(&self, message: &str) {
        if !(self.config.quiet || self.config.json) {
            eprintln!("{}", self.status_line(Status::Warning, message));
        }
    }

    /// Error on stderr, printed in every mode
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{}", self.status_line(Status::Error, message));
        }
    }

    /// Pretty-printed JSON value on stdout
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => self.error(&format!("Error serializing output: {e}")),
        }
    }

    /// Plain result line on stdout (respects quiet mode)
    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }

    pub fn dim(&self, text: &str) -> String {
        if self.colors_enabled() {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn dir_name(&self, text: &str) -> String {
        if self.colors_enabled() {
            style(text).blue().bold().to_string()
        } else {
            text.to_string()
        }
    }
}
