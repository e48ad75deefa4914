//! Recovers conversion history from the Japanese IME's predictive-text
//! store, `JpnIHDS.dat`.
//!
//! The file is a 32-byte header followed by `entry_count` sentence records.
//! Each record carries a FILETIME and a number of substitution entries, each
//! holding the raw input and the committed result as UTF-16LE text.
//!
//! ```no_run
//! let data = std::fs::read("JpnIHDS.dat")?;
//! let history = imehistory::decode_history(&data)?;
//! for line in &history.lines {
//!     println!("{} {}", line.timestamp, line.text);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod config;
pub mod cursor;
pub mod error;
pub mod file_types;
pub mod filetime;
pub mod header;
pub mod history;
pub mod processor;
pub mod record;
pub mod report;
pub mod substitution;

pub use error::{HistoryError, Result, TextBlock, TextDecodeWarning};
pub use header::FileHeader;
pub use history::{decode_history, recover_history, History, HistoryLine, HistoryReader, Recovery};
