//! Channel-based stream source.
//!
//! Receives raw chunks pushed by the caller through a tokio mpsc channel.
//! This is useful for embedding, where the producer is already running
//! elsewhere, and for driving the monitor in tests.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use super::{Chunk, StreamSource, CHANNEL_CAPACITY};
use crate::error::Result;

/// A stream source fed through a channel.
///
/// Each `start` forwards the shared input to a fresh output channel, so the
/// source can be stopped and started again while the sender stays alive.
///
/// # Example
///
/// ```
/// use netstat_meter::ChannelSource;
///
/// // Create a channel pair
/// let (tx, source) = ChannelSource::create("replay");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    input: Arc<Mutex<mpsc::Receiver<Chunk>>>,
    description: String,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl ChannelSource {
    /// Create a new channel source around `receiver`.
    pub fn new(receiver: mpsc::Receiver<Chunk>, source_description: &str) -> Self {
        Self {
            input: Arc::new(Mutex::new(receiver)),
            description: format!("channel: {}", source_description),
            stop_tx: None,
        }
    }

    /// Create a channel pair for pushing chunks to a ChannelSource.
    ///
    /// Returns (sender, source).
    pub fn create(source_description: &str) -> (mpsc::Sender<Chunk>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Self::new(rx, source_description))
    }
}

impl StreamSource for ChannelSource {
    fn start(&mut self, _args: &[String]) -> Result<mpsc::Receiver<Chunk>> {
        self.stop();

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let input = Arc::clone(&self.input);

        tokio::spawn(async move {
            let mut input = input.lock().await;
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    chunk = input.recv() => match chunk {
                        Some(chunk) => {
                            if tx.send(chunk).await.is_err() {
                                break;
                            }
                        }
                        // Sender dropped
                        None => break,
                    },
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_forwards() {
        let (tx, mut source) = ChannelSource::create("test");
        let mut rx = source.start(&[]).unwrap();

        tx.send(b"one\n".to_vec()).await.unwrap();
        tx.send(b"two\n".to_vec()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), b"one\n".to_vec());
        assert_eq!(rx.recv().await.unwrap(), b"two\n".to_vec());
    }

    #[tokio::test]
    async fn test_channel_source_closes_with_sender() {
        let (tx, mut source) = ChannelSource::create("test");
        let mut rx = source.start(&[]).unwrap();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_channel_source_restart() {
        let (tx, mut source) = ChannelSource::create("test");

        let mut first = source.start(&[]).unwrap();
        source.stop();
        assert!(first.recv().await.is_none());

        let mut second = source.start(&[]).unwrap();
        tx.send(b"again\n".to_vec()).await.unwrap();
        assert_eq!(second.recv().await.unwrap(), b"again\n".to_vec());
    }

    #[test]
    fn test_channel_source_description() {
        let (_tx, source) = ChannelSource::create("tcp://localhost:9090");
        assert_eq!(source.description(), "channel: tcp://localhost:9090");
    }
}
