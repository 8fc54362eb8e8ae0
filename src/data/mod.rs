//! Parsing of netstat's periodic interface statistics.
//!
//! netstat prints a header of column titles, then one data row per interval,
//! and re-prints the header every so often. Output reaches us in arbitrary
//! chunks.
//!
//! ## Submodules
//!
//! - [`segment`]: Picks the latest line out of a chunk
//! - [`header`]: Locates the byte counter columns ([`ColumnLayout`])
//! - [`sample`]: Tells data rows from re-printed headers and pulls out a [`Sample`]
//! - [`session`]: Per-interface state tying the above together ([`Session`])
//! - [`speed`]: Human-readable transfer speeds
//!
//! ## Data Flow
//!
//! ```text
//! raw chunk
//!     │
//!     ▼
//! select_last_line() ──▶ tokenize()
//!                             │
//!              first line?    │
//!             ┌───────────────┴───────────────┐
//!             ▼                               ▼
//!  ColumnLayout::resolve()                extract()
//!                                             │
//!                                             ▼
//!                               Sample ──▶ format_speed()
//! ```

pub mod header;
pub mod sample;
pub mod segment;
pub mod session;
pub mod speed;

pub use header::{ColumnLayout, DEFAULT_MARKER};
pub use sample::{extract, is_repeated_header, Extracted, Sample};
pub use segment::{select_last_line, tokenize};
pub use session::{Ingested, Session};
pub use speed::{format_speed, format_speed_or_placeholder, PLACEHOLDER};
