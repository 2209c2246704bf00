// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Console formatting helpers.

use colored::Colorize;
use std::time::Duration;

/// Enable or disable ANSI colors for the whole process.
pub fn set_color(enabled: bool) {
    colored::control::set_override(enabled);
}

/// Boxed section title.
pub fn banner(title: &str) -> String {
    let width = title.chars().count() + 6;
    let rule = "═".repeat(width);
    format!(
        "{}\n{}\n{}",
        format!("╔{rule}╗").blue(),
        format!("║   {title}   ║").blue(),
        format!("╚{rule}╝").blue()
    )
}

pub fn heading(text: &str) -> String {
    text.yellow().to_string()
}

pub fn ok(text: &str) -> String {
    format!("✓ {text}").green().to_string()
}

pub fn warning(text: &str) -> String {
    format!("⚠ {text}").yellow().to_string()
}

pub fn failure(text: &str) -> String {
    format!("✗ {text}").red().to_string()
}

pub fn good<T: std::fmt::Display>(value: T) -> String {
    value.to_string().green().to_string()
}

pub fn bad<T: std::fmt::Display>(value: T) -> String {
    value.to_string().red().to_string()
}

/// Milliseconds with two decimals.
pub fn millis(duration: Duration) -> String {
    format!("{:.2}ms", duration.as_secs_f64() * 1000.0)
}

/// Milliseconds, or `n/a` when there is nothing to show.
pub fn millis_or_na(duration: Option<Duration>) -> String {
    duration.map(millis).unwrap_or_else(|| "n/a".to_string())
}
