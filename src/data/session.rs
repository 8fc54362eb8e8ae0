//! Per-interface parser state.

use tracing::{debug, info, warn};

use super::header::{ColumnLayout, DEFAULT_MARKER};
use super::sample::{extract, Extracted, Sample};
use super::segment::{select_last_line, tokenize};
use crate::error::{Error, Result};

/// What a chunk turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// The chunk had no non-blank line.
    Nothing,
    /// The first line was taken as the header.
    Header,
    /// netstat re-printed its header; no sample.
    RepeatedHeader,
    /// A data row.
    Sample(Sample),
    /// The first data row of a source whose first row holds totals since
    /// boot rather than a per-interval delta. Not a rate.
    Baseline(Sample),
}

/// Parser state for one monitoring session.
///
/// The first non-blank line ever seen is the header. It is tokenized once to
/// find the byte counter columns, and kept to recognise later re-prints.
#[derive(Debug, Clone)]
pub struct Session {
    interface: String,
    marker: String,
    header_seen: bool,
    header_tokens: Vec<String>,
    layout: Option<ColumnLayout>,
    marker_count: usize,
    baseline_pending: bool,
}

impl Session {
    /// Create a fresh session for `interface` using the default marker.
    pub fn new(interface: impl Into<String>) -> Self {
        Self::with_marker(interface, DEFAULT_MARKER)
    }

    /// Create a fresh session that locates counters by `marker`.
    pub fn with_marker(interface: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            marker: marker.into(),
            header_seen: false,
            header_tokens: Vec::new(),
            layout: None,
            marker_count: 0,
            baseline_pending: false,
        }
    }

    /// Treat the first data row as a baseline instead of a sample.
    ///
    /// `netstat -w` subtracts the previous totals from the current ones, and
    /// the previous totals start at zero, so its first row is the total since
    /// boot.
    pub fn skipping_first_row(mut self, skip: bool) -> Self {
        self.baseline_pending = skip;
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Whether the header line has been consumed.
    pub fn header_seen(&self) -> bool {
        self.header_seen
    }

    pub fn header_tokens(&self) -> &[String] {
        &self.header_tokens
    }

    /// The resolved counter columns, if the header contained the marker twice.
    pub fn layout(&self) -> Option<ColumnLayout> {
        self.layout
    }

    /// Feed a raw chunk from the stream source.
    ///
    /// # Errors
    ///
    /// [`Error::StreamDecode`] if the chunk is not UTF-8, otherwise as
    /// [`Session::ingest`].
    pub fn ingest_bytes(&mut self, chunk: &[u8]) -> Result<Ingested> {
        let text = std::str::from_utf8(chunk)?;
        self.ingest(text)
    }

    /// Feed a decoded chunk.
    ///
    /// Only the last non-blank line of the chunk is considered.
    ///
    /// # Errors
    ///
    /// - [`Error::HeaderNotResolved`] when a data line arrives but the header
    ///   did not name both counters.
    /// - [`Error::MalformedLine`] when a data line is too short. The session
    ///   stays usable.
    pub fn ingest(&mut self, chunk: &str) -> Result<Ingested> {
        let tokens = tokenize(select_last_line(chunk));
        if tokens.is_empty() {
            return Ok(Ingested::Nothing);
        }

        if !self.header_seen {
            self.resolve_header(&tokens);
            return Ok(Ingested::Header);
        }

        let Some(layout) = self.layout else {
            return Err(Error::HeaderNotResolved {
                marker: self.marker.clone(),
                found: self.marker_count,
            });
        };

        match extract(&tokens, self.header_tokens.as_slice(), layout)? {
            Extracted::Sample(sample) if self.baseline_pending => {
                self.baseline_pending = false;
                debug!(
                    "{}: first row is a total since boot ({} in, {} out)",
                    self.interface, sample.bytes_in, sample.bytes_out
                );
                Ok(Ingested::Baseline(sample))
            }
            Extracted::Sample(sample) => Ok(Ingested::Sample(sample)),
            Extracted::RepeatedHeader => {
                debug!("{}: skipping repeated header", self.interface);
                Ok(Ingested::RepeatedHeader)
            }
        }
    }

    fn resolve_header(&mut self, tokens: &[&str]) {
        self.header_seen = true;
        self.header_tokens = tokens.iter().map(|t| t.to_string()).collect();
        self.marker_count = tokens.iter().filter(|t| **t == self.marker).count();

        match ColumnLayout::resolve(tokens, &self.marker) {
            Ok(layout) => {
                info!(
                    "{}: bytes in at column {}, bytes out at column {}",
                    self.interface, layout.bytes_in, layout.bytes_out
                );
                self.layout = Some(layout);
            }
            Err(e) => {
                warn!("{}: {} (header: {:?})", self.interface, e, self.header_tokens);
                self.layout = None;
            }
        }
    }
}
