//! # netstat-meter
//!
//! A live bandwidth meter driven by the periodic output of `netstat`.
//!
//! netstat prints a header of column titles and then one row of counters per
//! interval, re-printing the header every so often. The layout differs between
//! platforms and flags, so the byte counters are located at run time from the
//! header, by finding the `bytes` title twice.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │ source  │───▶│ monitor  │───▶│  app    │───▶│   ui    │ │
//! │  │ (input) │    │(session) │    │ (state) │    │(render) │ │
//! │  └─────────┘    └────┬─────┘    └─────────┘    └─────────┘ │
//! │                      │                                      │
//! │                      ▼                                      │
//! │                 ┌──────────┐                                │
//! │                 │   data   │ segment → header → sample      │
//! │                 └──────────┘                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Producers of raw output ([`StreamSource`]): the netstat
//!   subprocess, a channel, or a replayed capture
//! - **[`data`]**: Line selection, header resolution, sample extraction and
//!   speed formatting
//! - **[`monitor`]**: Start/stop lifecycle tying a source to a [`Session`] and
//!   an update callback
//! - **[`interface`]**: Default interface discovery
//! - **[`app`]** / **[`ui`]**: Terminal presentation
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Monitor the busiest interface
//! netstat-meter
//!
//! # Print one line per second for en0
//! netstat-meter --interface en0 --plain
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use netstat_meter::{format_speed, Monitor, NetstatSource};
//!
//! # tokio_test::block_on(async {
//! let mut monitor = Monitor::new(Box::new(NetstatSource::default()));
//! monitor
//!     .start("en0", |sample| {
//!         println!(
//!             "in {} out {}",
//!             format_speed(&sample.bytes_in).unwrap_or_default(),
//!             format_speed(&sample.bytes_out).unwrap_or_default(),
//!         );
//!     })
//!     .unwrap();
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod interface;
pub mod monitor;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use data::{format_speed, ColumnLayout, Ingested, Sample, Session};
pub use error::{Error, Result};
pub use interface::{default_interface_name, InterfaceInfo, InterfaceProvider, SystemInterfaces};
pub use monitor::{Monitor, MonitorState};
pub use source::{ChannelSource, Chunk, NetstatSource, ReaderSource, StreamSource};
