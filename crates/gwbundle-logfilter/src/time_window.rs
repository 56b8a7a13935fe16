use camino::Utf8Path;
use chrono::NaiveDateTime;
use gwbundle_utils::Period;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use tracing::debug;

use crate::reader::{open_log, output_name};
use crate::{FileMatcher, FilterError, FilterStats, TimestampParser};

/// Copy the in-window lines of every file matched under `src_dir` into `dest_dir`.
///
/// A line is in the window when its timestamp is no older than `now - period`.
/// Lines without a timestamp (stack traces, wrapped messages) follow the
/// decision for the nearest timestamped line above them; lines before the first
/// timestamp are dropped. Files with no parsable timestamp, or with nothing in
/// the window, produce no output.
pub fn limit_time(
    src_dir: &Utf8Path,
    matcher: &FileMatcher,
    dest_dir: &Utf8Path,
    parser: &TimestampParser,
    period: Period,
    now: NaiveDateTime,
) -> Result<FilterStats, FilterError> {
    let cutoff = now - period.as_chrono();
    let mut stats = FilterStats::default();

    for src in matcher.find(src_dir)? {
        let dest = dest_dir.join(output_name(&src));
        stats.files_seen += 1;
        if let Some(bytes) = limit_time_file(&src, &dest, parser, cutoff)? {
            stats.files_written += 1;
            stats.bytes_written += bytes;
        }
    }

    debug!(
        pattern = matcher.pattern(),
        src = %src_dir,
        cutoff = %cutoff,
        files_seen = stats.files_seen,
        files_written = stats.files_written,
        bytes = stats.bytes_written,
        "Time window applied"
    );
    Ok(stats)
}

/// Filter one file. Returns the bytes written, or `None` when nothing qualified.
pub fn limit_time_file(
    src: &Utf8Path,
    dest: &Utf8Path,
    parser: &TimestampParser,
    cutoff: NaiveDateTime,
) -> Result<Option<u64>, FilterError> {
    let mut reader = open_log(src).map_err(|e| FilterError::io(src, e))?;
    let mut writer: Option<BufWriter<File>> = None;
    let mut keep: Option<bool> = None;
    let mut saw_timestamp = false;
    let mut written: u64 = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| FilterError::io(src, e))?;
        if n == 0 {
            break;
        }

        if let Some(ts) = parser.parse_line(&String::from_utf8_lossy(&buf)) {
            saw_timestamp = true;
            keep = Some(ts >= cutoff);
        }
        if keep != Some(true) {
            continue;
        }

        if writer.is_none() {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| FilterError::io(parent, e))?;
            }
            let file = File::create(dest).map_err(|e| FilterError::io(dest, e))?;
            writer = Some(BufWriter::new(file));
        }
        if let Some(w) = writer.as_mut() {
            w.write_all(&buf).map_err(|e| FilterError::io(dest, e))?;
            written += n as u64;
        }
    }

    if let Some(mut w) = writer {
        w.flush().map_err(|e| FilterError::io(dest, e))?;
    }
    if !saw_timestamp {
        debug!(file = %src, "No parsable timestamps; file excluded");
    }

    Ok((written > 0).then_some(written))
}
