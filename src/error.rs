//! Error types for sampling and formatting.

use thiserror::Error;

/// Errors raised while monitoring an interface.
///
/// Parsing errors ([`Error::MalformedLine`], [`Error::FormatParse`]) are local
/// to a single line or value and are recoverable. Lifecycle errors
/// ([`Error::NoInterfaceFound`], [`Error::Spawn`]) end the monitoring attempt.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable network interface was found.
    #[error("no network interface found")]
    NoInterfaceFound,

    /// A chunk from the stream source was not valid UTF-8.
    #[error("stream chunk is not valid UTF-8: {0}")]
    StreamDecode(#[from] std::str::Utf8Error),

    /// The header line did not contain the marker column twice.
    #[error("header has {found} '{marker}' column(s), need 2")]
    HeaderNotResolved { marker: String, found: usize },

    /// A data line had fewer columns than the resolved layout needs.
    #[error("data line has {got} column(s), need {needed}")]
    MalformedLine { needed: usize, got: usize },

    /// A byte count could not be parsed as a non-negative number.
    #[error("not a byte count: {0:?}")]
    FormatParse(String),

    /// The external tool could not be launched.
    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A one-shot source was started a second time.
    #[error("source {0} has already been consumed")]
    SourceExhausted(String),
}

/// Result alias for monitoring operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error only affects the current line and the session can go on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedLine { .. } | Error::FormatParse(_))
    }
}
