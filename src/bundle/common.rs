//! Common utilities for bundle generation.
//!
//! Shared helpers for date formatting, Typst escaping and filenames.

use chrono::{Local, NaiveDate};
use std::path::Path;

/// Format the current local date for the letter's `DATE:` line (e.g. "19 October 2026").
pub fn format_letter_date() -> String {
    format_date(Local::now().date_naive())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

/// Typst markup that renders `value` literally, as an inline string expression.
pub fn typst_text(value: &str) -> String {
    format!("#\"{}\"", escape_typst_string(value))
}

/// Escape special characters for Typst string literals.
pub fn escape_typst_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\r', "")
        .replace('\n', r"\n")
}

/// Sanitize a string for use in filenames.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut last_dash = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !last_dash && !result.is_empty()
        {
            result.push('-');
            last_dash = true;
        }
    }

    if result.is_empty() {
        return fallback.to_string();
    }

    result.trim_matches('-').to_string()
}

/// Download name for a bundle, e.g. `claim-acme-dispute.pdf`.
pub fn bundle_filename(case_title: &str) -> String {
    format!("claim-{}.pdf", sanitize_filename(case_title, "case"))
}

/// Get the static assets directory path.
pub fn get_static_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}
