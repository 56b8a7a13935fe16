//! Log filters used by the category adapters.
//!
//! - [`limit_time`]: keep only lines whose timestamp falls inside a trailing
//!   [`Period`](gwbundle_utils::Period)
//! - [`limit_size`]: copy files newest-first until a byte budget is spent,
//!   truncating the last one to its newest lines
//! - [`FileMatcher`]: glob selection of candidate files below a directory
//!
//! Gzip-compressed inputs (`*.gz`) are decompressed transparently and written
//! out as plain text without the `.gz` suffix.

mod error;
mod matcher;
mod reader;
mod size_window;
mod time_window;
mod timestamp;

pub use error::FilterError;
pub use matcher::FileMatcher;
pub use reader::{is_gzip, open_log, output_name};
pub use size_window::limit_size;
pub use time_window::{limit_time, limit_time_file};
pub use timestamp::{Delimiter, TimestampFormat, TimestampParser};

/// What a filter call produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Candidate files examined
    pub files_seen: usize,
    /// Output files written
    pub files_written: usize,
    /// Bytes written across all output files
    pub bytes_written: u64,
}

