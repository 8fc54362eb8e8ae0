//! Header resolution: locating the byte counters in netstat's column titles.

use crate::error::{Error, Result};

/// Column title that labels both byte counters.
pub const DEFAULT_MARKER: &str = "bytes";

/// Positions of the two byte counters within a tokenized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Index of the inbound byte counter.
    pub bytes_in: usize,
    /// Index of the outbound byte counter.
    pub bytes_out: usize,
}

impl ColumnLayout {
    /// Resolve the layout from header tokens.
    ///
    /// The first token equal to `marker` is the inbound column, the second
    /// is the outbound column. Any further occurrences are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderNotResolved`] if the marker appears fewer than
    /// two times.
    pub fn resolve<S: AsRef<str>>(tokens: &[S], marker: &str) -> Result<Self> {
        let mut positions = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.as_ref() == marker)
            .map(|(i, _)| i);

        match (positions.next(), positions.next()) {
            (Some(bytes_in), Some(bytes_out)) => Ok(Self {
                bytes_in,
                bytes_out,
            }),
            (first, _) => Err(Error::HeaderNotResolved {
                marker: marker.to_string(),
                found: usize::from(first.is_some()),
            }),
        }
    }

    /// Minimum number of columns a data line needs for this layout.
    pub fn min_columns(&self) -> usize {
        self.bytes_in.max(self.bytes_out) + 1
    }
}
