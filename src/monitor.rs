//! Monitoring lifecycle: wires a stream source to the parser and a callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::data::{Ingested, Sample, Session, DEFAULT_MARKER};
use crate::error::Result;
use crate::interface::{default_interface_name, InterfaceProvider};
use crate::source::{expand_args, Chunk, StreamSource, DEFAULT_ARGS};

/// Lifecycle state of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
}

/// A running session: the chunk handler task and its kill switch.
#[derive(Debug)]
struct Subscription {
    interface: String,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Samples one interface through a [`StreamSource`].
///
/// Each `start` begins a fresh [`Session`], so header resolution happens again
/// for every session. If the source [leads with totals], the first data row of
/// each session is dropped. The update callback runs on the Tokio worker that
/// handles the chunk; UI consumers should hand samples off, e.g. with
/// [`Monitor::start_watch`].
///
/// [leads with totals]: StreamSource::leads_with_totals
///
/// # Example
///
/// ```
/// use netstat_meter::{ChannelSource, Monitor};
///
/// # tokio_test::block_on(async {
/// let (tx, source) = ChannelSource::create("example");
/// let mut monitor = Monitor::new(Box::new(source));
/// let mut samples = monitor.start_watch("en0").unwrap();
///
/// tx.send(b"packets errs bytes packets errs bytes colls\n".to_vec()).await.unwrap();
/// tx.send(b"3 0 1536 2 0 512 0\n".to_vec()).await.unwrap();
///
/// samples.changed().await.unwrap();
/// let sample = samples.borrow().clone().unwrap();
/// assert_eq!(sample.bytes_in, "1536");
/// monitor.stop();
/// # });
/// ```
#[derive(Debug)]
pub struct Monitor {
    source: Box<dyn StreamSource>,
    args: Vec<String>,
    marker: String,
    subscription: Option<Subscription>,
}

impl Monitor {
    /// Create an idle monitor using the default netstat arguments and marker.
    pub fn new(source: Box<dyn StreamSource>) -> Self {
        Self {
            source,
            args: DEFAULT_ARGS.iter().map(|arg| arg.to_string()).collect(),
            marker: DEFAULT_MARKER.to_string(),
            subscription: None,
        }
    }

    /// Set the argument template passed to the source.
    ///
    /// `{interface}` is replaced by the monitored interface name.
    pub fn with_args(mut self, template: Vec<String>) -> Self {
        self.args = template;
        self
    }

    /// Set the column title that marks the byte counters.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn state(&self) -> MonitorState {
        if self.is_running() {
            MonitorState::Running
        } else {
            MonitorState::Idle
        }
    }

    /// Whether a session is live. Turns false once the session ends by itself.
    pub fn is_running(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|sub| sub.active.load(Ordering::Acquire))
    }

    /// Interface of the current or last session.
    pub fn interface(&self) -> Option<&str> {
        self.subscription.as_ref().map(|sub| sub.interface.as_str())
    }

    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Start sampling `interface`, calling `on_update` for every data row.
    ///
    /// A running session is stopped first. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns the source's error if it cannot be started; the monitor is
    /// then idle.
    pub fn start<F>(&mut self, interface: &str, on_update: F) -> Result<()>
    where
        F: FnMut(Sample) + Send + 'static,
    {
        self.stop();

        let args = expand_args(&self.args, interface);
        let chunks = self.source.start(&args)?;

        let active = Arc::new(AtomicBool::new(true));
        let session = Session::with_marker(interface, self.marker.clone())
            .skipping_first_row(self.source.leads_with_totals());
        let task = tokio::spawn(run_session(chunks, session, Arc::clone(&active), on_update));

        info!("monitoring {} via {}", interface, self.source.description());
        self.subscription = Some(Subscription {
            interface: interface.to_string(),
            active,
            task,
        });
        Ok(())
    }

    /// Start sampling `interface`, publishing the latest sample on a watch channel.
    pub fn start_watch(&mut self, interface: &str) -> Result<watch::Receiver<Option<Sample>>> {
        let (tx, rx) = watch::channel(None);
        self.start(interface, move |sample| {
            tx.send_replace(Some(sample));
        })?;
        Ok(rx)
    }

    /// Start sampling the default interface.
    ///
    /// Returns the name of the interface being monitored.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NoInterfaceFound`] if the provider has no candidate,
    /// otherwise as [`Monitor::start`].
    pub fn start_default<F>(
        &mut self,
        provider: &dyn InterfaceProvider,
        on_update: F,
    ) -> Result<String>
    where
        F: FnMut(Sample) + Send + 'static,
    {
        let interface = default_interface_name(provider)?;
        self.start(&interface, on_update)?;
        Ok(interface)
    }

    /// Stop the current session. Calling it while idle does nothing.
    ///
    /// No update is delivered after this returns, except from a chunk whose
    /// processing had already begun.
    pub fn stop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };

        subscription.active.store(false, Ordering::Release);
        subscription.task.abort();
        self.source.stop();
        info!("stopped monitoring {}", subscription.interface);
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Chunk handler: one chunk is processed to completion before the next.
async fn run_session<F>(
    mut chunks: mpsc::Receiver<Chunk>,
    mut session: Session,
    active: Arc<AtomicBool>,
    mut on_update: F,
) where
    F: FnMut(Sample),
{
    while let Some(chunk) = chunks.recv().await {
        if !active.load(Ordering::Acquire) {
            break;
        }

        match session.ingest_bytes(&chunk) {
            Ok(Ingested::Sample(sample)) => on_update(sample),
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {
                warn!("{}: skipping line: {}", session.interface(), e);
            }
            Err(e) => {
                error!("{}: ending session: {}", session.interface(), e);
                break;
            }
        }
    }

    active.store(false, Ordering::Release);
    debug!("{}: session ended", session.interface());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::interface::InterfaceInfo;
    use crate::source::{ChannelSource, ReaderSource};
    use std::time::Duration;

    const HEADER: &[u8] = b"   packets  errs      bytes    packets  errs      bytes colls\n";

    fn collecting_monitor() -> (mpsc::Sender<Chunk>, Monitor) {
        let (tx, source) = ChannelSource::create("test");
        (tx, Monitor::new(Box::new(source)))
    }

    fn start_collecting(
        monitor: &mut Monitor,
        interface: &str,
    ) -> mpsc::UnboundedReceiver<Sample> {
        let (sample_tx, sample_rx) = mpsc::unbounded_channel();
        monitor
            .start(interface, move |sample| {
                let _ = sample_tx.send(sample);
            })
            .unwrap();
        sample_rx
    }

    async fn next_sample(rx: &mut mpsc::UnboundedReceiver<Sample>) -> Option<Sample> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    async fn wait_until_idle(monitor: &Monitor) {
        for _ in 0..200 {
            if !monitor.is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("monitor did not become idle");
    }

    #[tokio::test]
    async fn test_delivers_samples() {
        let (tx, mut monitor) = collecting_monitor();
        let mut samples = start_collecting(&mut monitor, "en0");
        assert_eq!(monitor.state(), MonitorState::Running);
        assert_eq!(monitor.interface(), Some("en0"));

        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"  12 0 1024 10 0 2048 0\n".to_vec()).await.unwrap();

        assert_eq!(next_sample(&mut samples).await, Some(Sample::new("1024", "2048")));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_repeated_header_produces_no_sample() {
        let (tx, mut monitor) = collecting_monitor();
        let mut samples = start_collecting(&mut monitor, "en0");

        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"1 0 7 1 0 8 0\n".to_vec()).await.unwrap();

        assert_eq!(next_sample(&mut samples).await, Some(Sample::new("7", "8")));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_malformed_line_skipped() {
        let (tx, mut monitor) = collecting_monitor();
        let mut samples = start_collecting(&mut monitor, "en0");

        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"1 0 7\n".to_vec()).await.unwrap();
        tx.send(b"1 0 9 1 0 10 0\n".to_vec()).await.unwrap();

        assert_eq!(next_sample(&mut samples).await, Some(Sample::new("9", "10")));
        assert!(monitor.is_running());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_stop_twice_is_idle() {
        let (_tx, mut monitor) = collecting_monitor();
        let _samples = start_collecting(&mut monitor, "en0");

        monitor.stop();
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert_eq!(monitor.interface(), None);
    }

    #[tokio::test]
    async fn test_stop_when_never_started() {
        let (_tx, mut monitor) = collecting_monitor();
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Idle);
    }

    #[tokio::test]
    async fn test_undecodable_chunk_ends_session() {
        let (tx, mut monitor) = collecting_monitor();
        let mut samples = start_collecting(&mut monitor, "en0");

        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(vec![0xff, 0xfe, b'\n']).await.unwrap();

        wait_until_idle(&monitor).await;
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert!(next_sample(&mut samples).await.is_none());
    }

    #[tokio::test]
    async fn test_unresolved_header_ends_session() {
        let (tx, mut monitor) = collecting_monitor();
        let _samples = start_collecting(&mut monitor, "eth0");

        tx.send(b"Iface MTU RX-OK TX-OK\n".to_vec()).await.unwrap();
        tx.send(b"eth0 1500 10 20\n".to_vec()).await.unwrap();

        wait_until_idle(&monitor).await;
    }

    #[tokio::test]
    async fn test_end_of_stream_ends_session() {
        let (tx, mut monitor) = collecting_monitor();
        let _samples = start_collecting(&mut monitor, "en0");

        drop(tx);
        wait_until_idle(&monitor).await;

        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Idle);
    }

    #[tokio::test]
    async fn test_restart_resets_session() {
        let (tx, mut monitor) = collecting_monitor();
        let mut first = start_collecting(&mut monitor, "en0");
        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"1 0 1 1 0 2 0\n".to_vec()).await.unwrap();
        assert_eq!(next_sample(&mut first).await, Some(Sample::new("1", "2")));

        // The new session must see a header again
        let mut second = start_collecting(&mut monitor, "en1");
        assert_eq!(monitor.interface(), Some("en1"));
        tx.send(b"pkts bytes pkts bytes\n".to_vec()).await.unwrap();
        tx.send(b"1 30 2 40\n".to_vec()).await.unwrap();

        assert_eq!(next_sample(&mut second).await, Some(Sample::new("30", "40")));
        assert!(next_sample(&mut first).await.is_none());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_start_watch_publishes_latest() {
        let (tx, mut monitor) = collecting_monitor();
        let mut watch_rx = monitor.start_watch("en0").unwrap();
        assert!(watch_rx.borrow().is_none());

        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"1 0 5 1 0 6 0\n".to_vec()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), watch_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*watch_rx.borrow(), Some(Sample::new("5", "6")));
        monitor.stop();
    }

    /// A channel source whose first row is a total since boot, like netstat.
    #[derive(Debug)]
    struct TotalsFirst(ChannelSource);

    impl StreamSource for TotalsFirst {
        fn start(&mut self, args: &[String]) -> Result<mpsc::Receiver<Chunk>> {
            self.0.start(args)
        }

        fn stop(&mut self) {
            self.0.stop();
        }

        fn description(&self) -> &str {
            self.0.description()
        }

        fn leads_with_totals(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_first_row_of_totals_not_reported() {
        let (tx, source) = ChannelSource::create("test");
        let mut monitor = Monitor::new(Box::new(TotalsFirst(source)));
        let mut samples = start_collecting(&mut monitor, "en0");

        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"91234 0 39954012160 80211 0 7340032 0\n".to_vec())
            .await
            .unwrap();
        tx.send(b"12 0 1536 10 0 512 0\n".to_vec()).await.unwrap();

        assert_eq!(next_sample(&mut samples).await, Some(Sample::new("1536", "512")));

        // A restart starts from totals again
        let mut samples = start_collecting(&mut monitor, "en0");
        tx.send(HEADER.to_vec()).await.unwrap();
        tx.send(b"91240 0 39954013696 80221 0 7340544 0\n".to_vec())
            .await
            .unwrap();
        tx.send(b"3 0 64 2 0 32 0\n".to_vec()).await.unwrap();

        assert_eq!(next_sample(&mut samples).await, Some(Sample::new("64", "32")));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_replayed_capture() {
        let capture = include_str!("../demos/en0.netstat");
        let source = ReaderSource::new(std::io::Cursor::new(capture), "en0.netstat");
        let mut monitor = Monitor::new(Box::new(source));
        let mut samples = start_collecting(&mut monitor, "en0");

        let mut bytes_in = Vec::new();
        while let Some(sample) = next_sample(&mut samples).await {
            bytes_in.push(sample.bytes_in);
        }
        assert_eq!(
            bytes_in,
            vec!["51840", "163204", "1298342", "3145728", "1536", "512"]
        );
        assert_eq!(monitor.state(), MonitorState::Idle);
    }

    #[derive(Debug)]
    struct Fixed(Vec<InterfaceInfo>);

    impl InterfaceProvider for Fixed {
        fn interfaces(&self) -> Vec<InterfaceInfo> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_start_default() {
        let (_tx, mut monitor) = collecting_monitor();
        let provider = Fixed(vec![InterfaceInfo {
            name: "en0".to_string(),
            total_received: 1,
            total_transmitted: 1,
        }]);

        let name = monitor.start_default(&provider, |_| {}).unwrap();
        assert_eq!(name, "en0");
        assert!(monitor.is_running());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_start_default_without_interface() {
        let (_tx, mut monitor) = collecting_monitor();
        let result = monitor.start_default(&Fixed(Vec::new()), |_| {});
        assert!(matches!(result, Err(Error::NoInterfaceFound)));
        assert_eq!(monitor.state(), MonitorState::Idle);
    }

    #[tokio::test]
    async fn test_args_template_expanded() {
        #[derive(Debug, Default)]
        struct Recording(Arc<std::sync::Mutex<Vec<String>>>);

        impl StreamSource for Recording {
            fn start(&mut self, args: &[String]) -> Result<mpsc::Receiver<Chunk>> {
                *self.0.lock().unwrap() = args.to_vec();
                let (_tx, rx) = mpsc::channel(1);
                Ok(rx)
            }
            fn stop(&mut self) {}
            fn description(&self) -> &str {
                "recording"
            }
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let template = ["-w", "1", "-I", "{interface}"].map(String::from).to_vec();
        let mut monitor = Monitor::new(Box::new(Recording(Arc::clone(&seen)))).with_args(template);
        monitor.start("wlan0", |_| {}).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["-w", "1", "-I", "wlan0"]);
    }
}
