//! Application state for the terminal meter.

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::watch;

use crate::data::{format_speed_or_placeholder, Sample};
use crate::monitor::Monitor;
use crate::ui::Theme;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    // Sampling
    monitor: Monitor,
    interface: String,
    samples: Option<watch::Receiver<Option<Sample>>>,
    pub latest: Option<Sample>,
    pub samples_received: u64,
    pub last_sample_at: Option<Instant>,
    pub load_error: Option<String>,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App for `interface`. Call [`App::start`] to begin sampling.
    pub fn new(monitor: Monitor, interface: impl Into<String>) -> Self {
        Self::with_theme(monitor, interface, Theme::auto_detect())
    }

    pub fn with_theme(monitor: Monitor, interface: impl Into<String>, theme: Theme) -> Self {
        Self {
            running: true,
            show_help: false,
            monitor,
            interface: interface.into(),
            samples: None,
            latest: None,
            samples_received: 0,
            last_sample_at: None,
            load_error: None,
            theme,
            status_message: None,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Returns a description of the current stream source.
    pub fn source_description(&self) -> &str {
        self.monitor.source_description()
    }

    /// Whether the monitor is still delivering samples.
    pub fn is_live(&self) -> bool {
        self.monitor.is_running()
    }

    /// Start (or restart) monitoring. The displayed sample is cleared.
    pub fn start(&mut self) -> Result<()> {
        let samples = self.monitor.start_watch(&self.interface)?;
        self.samples = Some(samples);
        self.latest = None;
        self.load_error = None;
        Ok(())
    }

    /// Restart monitoring, reporting the outcome in the status bar.
    pub fn restart(&mut self) {
        match self.start() {
            Ok(()) => self.set_status_message(format!("Restarted {}", self.interface)),
            Err(e) => {
                self.load_error = Some(e.to_string());
                self.set_status_message(format!("Restart failed: {}", e));
            }
        }
    }

    /// Pick up the latest sample, if a new one arrived.
    ///
    /// Once the session has ended the receiver is read one last time and then
    /// released, so a sample published just before the end is still shown.
    ///
    /// Returns true if the displayed sample changed.
    pub fn reload_data(&mut self) -> bool {
        let mut closed = false;
        let latest = match self.samples.as_mut() {
            None => None,
            Some(samples) => match samples.has_changed() {
                Ok(true) => samples.borrow_and_update().clone(),
                Ok(false) => None,
                Err(_) => {
                    closed = true;
                    let last = samples.borrow_and_update();
                    let unseen = if last.has_changed() { last.clone() } else { None };
                    unseen
                }
            },
        };

        if closed {
            self.samples = None;
        }

        if let Some(sample) = latest {
            self.samples_received += 1;
            self.last_sample_at = Some(Instant::now());
            self.latest = Some(sample);
            return true;
        }

        if !self.monitor.is_running() && self.load_error.is_none() {
            self.load_error = Some("Monitoring stopped (press r to restart)".to_string());
        }
        false
    }

    /// Formatted (in, out) speeds of the latest sample.
    pub fn speeds(&self) -> (String, String) {
        match &self.latest {
            Some(sample) => (
                format_speed_or_placeholder(&sample.bytes_in),
                format_speed_or_placeholder(&sample.bytes_out),
            ),
            None => ("0 kb/s".to_string(), "0 kb/s".to_string()),
        }
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Stop monitoring and signal the application to quit.
    pub fn quit(&mut self) {
        self.monitor.stop();
        self.running = false;
    }
}
