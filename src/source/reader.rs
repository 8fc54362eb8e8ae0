//! Reader-based stream source.
//!
//! Replays netstat output from any async reader, such as a captured
//! transcript file. Each line becomes one chunk.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{Chunk, StreamSource, CHANNEL_CAPACITY};
use crate::error::{Error, Result};

/// A one-shot source that replays an async reader line by line.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use netstat_meter::{ReaderSource, StreamSource};
///
/// # tokio_test::block_on(async {
/// let data = b"packets bytes packets bytes\n1 10 2 20\n";
/// let mut source = ReaderSource::new(Cursor::new(data.to_vec()), "example");
/// let mut chunks = source.start(&[]).unwrap();
/// assert_eq!(chunks.recv().await.unwrap(), b"packets bytes packets bytes\n".to_vec());
/// # });
/// ```
pub struct ReaderSource<R> {
    reader: Option<R>,
    description: String,
    pace: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, description: &str) -> Self {
        Self {
            reader: Some(reader),
            description: format!("replay: {}", description),
            pace: Duration::ZERO,
            stop_tx: None,
        }
    }

    /// Wait `pace` between lines, to replay a capture at its recorded speed.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }
}

impl<R> fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSource")
            .field("description", &self.description)
            .field("pace", &self.pace)
            .field("consumed", &self.reader.is_none())
            .finish()
    }
}

impl<R> StreamSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn start(&mut self, _args: &[String]) -> Result<mpsc::Receiver<Chunk>> {
        self.stop();

        let reader = self
            .reader
            .take()
            .ok_or_else(|| Error::SourceExhausted(self.description.clone()))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let pace = self.pace;

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    read = reader.read_line(&mut line) => match read {
                        Ok(0) => {
                            debug!("replay finished");
                            break;
                        }
                        Ok(_) => {
                            if tx.send(line.clone().into_bytes()).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("replay read error: {}", e);
                            break;
                        }
                    },
                }

                if !pace.is_zero() {
                    tokio::select! {
                        biased;
                        _ = &mut stop_rx => break,
                        _ = tokio::time::sleep(pace) => {}
                    }
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
