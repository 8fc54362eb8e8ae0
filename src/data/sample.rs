//! Sample extraction from tokenized data lines.

use serde::{Deserialize, Serialize};

use super::header::ColumnLayout;
use crate::error::{Error, Result};

/// One (bytes in, bytes out) observation for a sampling interval.
///
/// Values are kept exactly as printed by netstat. With `-w` netstat prints
/// per-interval deltas, so a one second interval yields bytes per second.
/// The first row after startup is the exception: it holds the totals since
/// boot and is reported as [`crate::data::Ingested::Baseline`] when the
/// source says so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Raw inbound byte count.
    pub bytes_in: String,
    /// Raw outbound byte count.
    pub bytes_out: String,
}

impl Sample {
    pub fn new(bytes_in: impl Into<String>, bytes_out: impl Into<String>) -> Self {
        Self {
            bytes_in: bytes_in.into(),
            bytes_out: bytes_out.into(),
        }
    }
}

/// Outcome of classifying a line after the header has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// A data row carrying a sample.
    Sample(Sample),
    /// netstat re-printed its column titles.
    RepeatedHeader,
}

/// Whether a line is a re-emission of the header.
///
/// A line is a header when its first column equals the header's first column,
/// or when none of its columns is numeric (netstat's `input (en0) output`
/// banner above the column titles).
pub fn is_repeated_header<S: AsRef<str>>(tokens: &[&str], header: &[S]) -> bool {
    if let (Some(first), Some(header_first)) = (tokens.first(), header.first()) {
        if *first == header_first.as_ref() {
            return true;
        }
    }

    !tokens.iter().any(|token| is_numeric(token))
}

fn is_numeric(token: &str) -> bool {
    token.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Extract a sample from a tokenized line using a resolved layout.
///
/// # Errors
///
/// Returns [`Error::MalformedLine`] if the line has fewer columns than the
/// layout requires.
pub fn extract<S: AsRef<str>>(
    tokens: &[&str],
    header: &[S],
    layout: ColumnLayout,
) -> Result<Extracted> {
    if is_repeated_header(tokens, header) {
        return Ok(Extracted::RepeatedHeader);
    }

    match (tokens.get(layout.bytes_in), tokens.get(layout.bytes_out)) {
        (Some(bytes_in), Some(bytes_out)) => {
            Ok(Extracted::Sample(Sample::new(*bytes_in, *bytes_out)))
        }
        _ => Err(Error::MalformedLine {
            needed: layout.min_columns(),
            got: tokens.len(),
        }),
    }
}
