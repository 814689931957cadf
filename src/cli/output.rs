//! Shared CLI output helpers for consistent operator-facing text.
//!
//! Each printer has a `format_*` counterpart so the layout can be checked
//! without capturing stdout.

use std::fmt::Display;
use std::io::{self, Write};

use crate::domain::ServerAddr;

const RULE_WIDTH: usize = 56;
const LABEL_WIDTH: usize = 16;

/// Print a section header and separator.
pub fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(RULE_WIDTH));
}

/// Print a `label value` line with the label padded to a fixed column.
pub fn key_value(label: &str, value: impl Display) {
    println!("{}", format_key_value(label, value));
}

#[must_use]
pub fn format_key_value(label: &str, value: impl Display) -> String {
    format!("{label:<LABEL_WIDTH$} {value}")
}

/// Print a successful status line.
pub fn ok(message: &str) {
    println!("✓ {message}");
}

/// Print a warning status line.
pub fn warn(message: &str) {
    println!("⚠ {message}");
}

/// Print an error status line to stderr.
pub fn error(message: &str) {
    eprintln!("✗ {message}");
}

/// Print a server list as an indented, numbered block.
///
/// An empty list prints a warning instead.
pub fn servers(servers: &[ServerAddr]) {
    if servers.is_empty() {
        warn("Directory returned no servers");
        return;
    }
    for line in format_servers(servers) {
        println!("{line}");
    }
}

#[must_use]
pub fn format_servers(servers: &[ServerAddr]) -> Vec<String> {
    let width = servers.len().to_string().len();
    servers
        .iter()
        .enumerate()
        .map(|(i, server)| format!("  {:>width$}. {server}", i + 1))
        .collect()
}

/// Start a progress line in the format `Label... `.
pub fn progress(label: &str) {
    print!("{label}... ");
    let _ = io::stdout().flush();
}

/// Finish a progress line.
pub fn progress_done(success: bool) {
    println!("{}", if success { "ok" } else { "failed" });
}
