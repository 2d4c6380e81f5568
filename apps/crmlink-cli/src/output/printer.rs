//! Console formatting for menu output and results
//!
//! Every helper takes a writer so the menu loop can be driven against an
//! in-memory buffer.

use crate::logging::Redactor;
use std::io::{self, Write};

/// Check if color output is enabled
pub fn use_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Write a success message (green checkmark)
pub fn write_success(out: &mut dyn Write, message: &str) -> io::Result<()> {
    if use_color() {
        writeln!(out, "\x1b[32m✓\x1b[0m {}", message)
    } else {
        writeln!(out, "OK: {}", message)
    }
}

/// Write a warning message (yellow)
pub fn write_warning(out: &mut dyn Write, message: &str) -> io::Result<()> {
    if use_color() {
        writeln!(out, "\x1b[33mWarning:\x1b[0m {}", message)
    } else {
        writeln!(out, "Warning: {}", message)
    }
}

/// Write a header with decorative border
pub fn write_header(out: &mut dyn Write, title: &str) -> io::Result<()> {
    let border = "═".repeat(59);
    writeln!(out)?;
    writeln!(out, "{}", border)?;
    writeln!(out, "{:^59}", title)?;
    writeln!(out, "{}", border)?;
    writeln!(out)
}

/// Write a key-value pair with consistent formatting
pub fn write_key_value(out: &mut dyn Write, key: &str, value: &str) -> io::Result<()> {
    if use_color() {
        writeln!(out, "  \x1b[1m{}:\x1b[0m {}", key, value)
    } else {
        writeln!(out, "  {}: {}", key, value)
    }
}

/// Token text for the console: masked unless `show` is set, `none` when absent.
pub fn format_token(token: Option<&str>, show: bool) -> String {
    match token.filter(|t| !t.is_empty()) {
        None => "none".to_string(),
        Some(token) if show => token.to_string(),
        Some(token) => Redactor::new().mask_token(token),
    }
}
