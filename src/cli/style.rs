//! Terminal styling helpers
//!
//! Colors are applied only when the target stream supports them.

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;

/// Check mark shown on success
pub const CHECK: &str = "✓";

/// Semantic styles for CLI text
pub trait Stylize {
    /// Bold, for names the user typed
    fn emphasis(&self) -> String;
    /// Cyan, for counts and identifiers
    fn accent(&self) -> String;
    /// Dimmed, for secondary information
    fn muted(&self) -> String;
    /// Bold red, for error prefixes on stderr
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn emphasis(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.bold())
            .to_string()
    }

    fn accent(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.cyan())
            .to_string()
    }

    fn muted(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.dimmed())
            .to_string()
    }

    fn error(&self) -> String {
        self.if_supports_color(Stream::Stderr, |t| t.red().bold().to_string())
            .to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK
        .if_supports_color(Stream::Stdout, |t| t.green())
        .to_string()
}

/// Spinner used while waiting on providers
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
