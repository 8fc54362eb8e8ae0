//! Human-readable transfer speeds.

use crate::error::{Error, Result};

const KILOBYTE: f64 = 1024.0;
const MEGABYTE: f64 = KILOBYTE * 1024.0;
const GIGABYTE: f64 = MEGABYTE * 1024.0;

/// Shown in place of a speed that could not be parsed.
pub const PLACEHOLDER: &str = "-- kb/s";

/// Format a per-interval byte count, e.g. "1536" -> "1.5 kb/s".
///
/// Anything below one kilobyte reads as `0 kb/s`.
///
/// # Errors
///
/// Returns [`Error::FormatParse`] if `bytes` is not a finite, non-negative
/// number.
pub fn format_speed(bytes: &str) -> Result<String> {
    let value: f64 = bytes
        .trim()
        .parse()
        .map_err(|_| Error::FormatParse(bytes.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::FormatParse(bytes.to_string()));
    }

    let formatted = if value < KILOBYTE {
        "0 kb/s".to_string()
    } else if value < MEGABYTE {
        format!("{:.1} kb/s", value / KILOBYTE)
    } else if value < GIGABYTE {
        format!("{:.1} mb/s", value / MEGABYTE)
    } else {
        format!("{:.1} gb/s", value / GIGABYTE)
    };
    Ok(formatted)
}

/// Format a speed for display, falling back to [`PLACEHOLDER`].
pub fn format_speed_or_placeholder(bytes: &str) -> String {
    format_speed(bytes).unwrap_or_else(|_| PLACEHOLDER.to_string())
}
