//! Stream sources that feed raw netstat output to the monitor.
//!
//! A source is started with the netstat argument list and hands back a
//! channel of raw chunks. Chunks are whatever the producer happened to flush:
//! they may hold zero, one or many lines, or part of a line.

mod channel;
mod netstat;
mod reader;

pub use channel::ChannelSource;
pub use netstat::{NetstatSource, DEFAULT_ARGS, DEFAULT_COMMAND};
pub use reader::ReaderSource;

use std::fmt::Debug;

use tokio::sync::mpsc;

use crate::error::Result;

/// A block of raw bytes as produced by the external tool.
pub type Chunk = Vec<u8>;

/// Buffered chunks between a source and the monitor.
pub(crate) const CHANNEL_CAPACITY: usize = 16;

/// Placeholder in argument templates replaced by the interface name.
pub const INTERFACE_PLACEHOLDER: &str = "{interface}";

/// Trait for producers of netstat-style output.
///
/// # Example
///
/// ```
/// use netstat_meter::{ChannelSource, StreamSource};
///
/// # tokio_test::block_on(async {
/// let (tx, mut source) = ChannelSource::create("test");
/// let mut chunks = source.start(&[]).unwrap();
/// tx.send(b"packets bytes\n".to_vec()).await.unwrap();
/// assert_eq!(chunks.recv().await.unwrap(), b"packets bytes\n".to_vec());
/// source.stop();
/// # });
/// ```
pub trait StreamSource: Send + Debug {
    /// Start producing chunks.
    ///
    /// Starting a source that is already running restarts it. Must be called
    /// from within a Tokio runtime.
    fn start(&mut self, args: &[String]) -> Result<mpsc::Receiver<Chunk>>;

    /// Stop producing chunks and release the producer. Idempotent.
    fn stop(&mut self);

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Whether the first data row is a running total rather than a delta.
    ///
    /// The monitor drops that row instead of reporting it as a rate.
    fn leads_with_totals(&self) -> bool {
        false
    }
}

/// Substitute the interface name into an argument template.
pub fn expand_args(template: &[String], interface: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(INTERFACE_PLACEHOLDER, interface))
        .collect()
}
