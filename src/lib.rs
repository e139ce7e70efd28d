//! # seglog
//!
//! A segmented, append-only commit log.
//!
//! Producers append opaque payloads and receive monotonically increasing
//! 64-bit offsets; consumers read any retained record by offset or stream
//! the raw log. State is durable across restarts and memory use stays
//! bounded regardless of total bytes stored.
//!
//! ## Features
//!
//! - **Segmented Storage**: the log is a directory of segments, each a
//!   store file of length-prefixed frames plus a fixed-width,
//!   memory-mapped offset index
//! - **Dense Offsets**: appends are totally ordered; offsets have no gaps
//! - **Bounded Retention**: whole segment prefixes can be truncated away
//! - **Crash Recovery**: reopening a cleanly closed directory restores
//!   the offset range and all records
//! - **Concurrent Access**: many readers alongside a serialized writer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seglog::{Log, Options};
//!
//! // Open (or recover) a log
//! let log = Log::open("./my_log", Options::default())?;
//!
//! // Append and read back
//! let offset = log.append(b"hello world")?;
//! let record = log.read(offset)?;
//! assert_eq!(&record.value[..], b"hello world");
//!
//! // Drop everything at or below offset 100
//! log.truncate(100)?;
//!
//! log.close()?;
//! ```

// Public modules
pub mod error;
pub mod options;
pub mod record;

// Internal modules
mod index;
mod log;
mod segment;
mod store;
mod util;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use log::{Log, LogReader};
pub use options::{Options, OptionsBuilder};
pub use record::Record;
