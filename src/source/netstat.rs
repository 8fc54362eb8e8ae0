//! Subprocess-backed source that runs netstat.

use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{Chunk, StreamSource, CHANNEL_CAPACITY};
use crate::error::{Error, Result};

/// Program launched by default.
pub const DEFAULT_COMMAND: &str = "netstat";

/// Default argument template: per-second byte deltas for one interface.
///
/// `netstat -I <if> -b -w 1` prints an `input (<if>) output` banner, a row of
/// column titles containing `bytes` twice, then one row per second. Each row
/// is the difference from the previous one, except the first, which holds the
/// totals since boot (see [`StreamSource::leads_with_totals`]).
pub const DEFAULT_ARGS: &[&str] = &["-I", "{interface}", "-b", "-w", "1"];

const READ_BUFFER_SIZE: usize = 4096;

/// A source that spawns the external tool and streams its stdout.
///
/// The child is killed when the source is stopped, restarted or dropped, and
/// when the receiving end of the chunk channel goes away.
#[derive(Debug)]
pub struct NetstatSource {
    command: String,
    description: String,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl NetstatSource {
    /// Create a source for `command` (usually [`DEFAULT_COMMAND`]).
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let description = format!("command: {}", command);
        Self {
            command,
            description,
            stop_tx: None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for NetstatSource {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND)
    }
}

impl StreamSource for NetstatSource {
    fn start(&mut self, args: &[String]) -> Result<mpsc::Receiver<Chunk>> {
        self.stop();

        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| Error::Spawn {
            command: self.command.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        info!("started {} {}", self.command, args.join(" "));

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let command = self.command.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUFFER_SIZE];

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        debug!("stop requested for {}", command);
                        break;
                    }
                    _ = tx.closed() => {
                        debug!("consumer of {} went away", command);
                        break;
                    }
                    read = stdout.read(&mut buf) => match read {
                        Ok(0) => {
                            info!("{} closed its output", command);
                            break;
                        }
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("reading from {} failed: {}", command, e);
                            break;
                        }
                    },
                }
            }

            if let Err(e) = child.kill().await {
                debug!("{} already exited: {}", command, e);
            }
        });

        self.description = format!("command: {} {}", self.command, args.join(" "));
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

    fn leads_with_totals(&self) -> bool {
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_streams_child_output() {
        let mut source = NetstatSource::new("printf");
        let mut rx = source.start(&args(&["a bytes b bytes\\n1 10 2 20\\n"])).unwrap();

        let mut collected = Vec::new();
        while let Some(chunk) = rx.recv().await {
            collected.extend(chunk);
        }
        assert_eq!(
            String::from_utf8(collected).unwrap(),
            "a bytes b bytes\n1 10 2 20\n"
        );
    }

    #[tokio::test]
    async fn test_stop_closes_channel() {
        let mut source = NetstatSource::new("sleep");
        let mut rx = source.start(&args(&["30"])).unwrap();

        source.stop();
        source.stop();

        let closed = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(closed, Ok(None)));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let mut source = NetstatSource::new("/nonexistent/netstat-meter-test");
        match source.start(&[]) {
            Err(Error::Spawn { command, .. }) => {
                assert_eq!(command, "/nonexistent/netstat-meter-test")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_description_includes_args() {
        let mut source = NetstatSource::new("true");
        assert_eq!(source.description(), "command: true");
        let _rx = source.start(&args(&["-I", "en0"])).unwrap();
        assert_eq!(source.description(), "command: true -I en0");
    }
}
