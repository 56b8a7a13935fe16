//! Category filter adapters.
//!
//! Thin layers between the orchestrator and the log filters: each one picks
//! its candidates, consults the budget the way its category requires, and
//! writes into the staging area.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use gwbundle_logfilter::{FileMatcher, FilterStats, limit_size, limit_time};
use gwbundle_utils::paths::{copy_into, ensure_dir_all};
use gwbundle_utils::{ByteSize, GwBundleError, Period};
use std::fs;
use tracing::{info, warn};

use crate::budget::BudgetTracker;
use crate::category::{LogCategory, LogRole};
use crate::selection::Candidate;

/// Files and bytes an adapter put into the staging area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Copied {
    pub files: usize,
    pub bytes: u64,
}

impl From<FilterStats> for Copied {
    fn from(stats: FilterStats) -> Self {
        Self {
            files: stats.files_written,
            bytes: stats.bytes_written,
        }
    }
}

/// How the compressed-log copy decides whether the next file fits.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Gate<'a> {
    Unbounded,
    /// Rescan the staging area before every file
    Remaining(&'a BudgetTracker),
    /// A fixed allowance, drawn down by each copy
    Pool(u64),
}

/// Time-window every log pattern from `source` into `staging_dir`.
///
/// All patterns run, even when an earlier one matched nothing.
pub(crate) fn time_window(
    staging_dir: &Utf8Path,
    source: &Utf8Path,
    logs: [&LogCategory; 3],
    period: Period,
    now: NaiveDateTime,
) -> Result<Vec<(LogRole, Copied)>, GwBundleError> {
    let mut results = Vec::with_capacity(logs.len());
    for log in logs {
        let stats = limit_time(
            source,
            &log.matcher,
            staging_dir,
            &log.parser,
            period,
            now,
        )?;
        if stats.files_seen == 0 {
            info!(pattern = log.matcher.pattern(), source = %source, "No logs matched");
        }
        results.push((log.role, Copied::from(stats)));
    }
    Ok(results)
}

/// Size-window one pattern against whatever budget is left.
///
/// Returns `None` (after a warning) when the budget is already spent.
pub(crate) fn size_window(
    tracker: &BudgetTracker,
    source: &Utf8Path,
    matcher: &FileMatcher,
    dest: &Utf8Path,
) -> Result<Option<Copied>, GwBundleError> {
    let budget = match tracker.remaining()? {
        Some(left) if left == ByteSize::ZERO => {
            warn!(
                pattern = matcher.pattern(),
                "Size limit exhausted; skipping log pattern"
            );
            return Ok(None);
        }
        Some(left) => left,
        None => ByteSize::from_bytes(u64::MAX),
    };
    let stats = limit_size(source, matcher, dest, budget)?;
    Ok(Some(stats.into()))
}

/// Size-window one pattern within a fixed allowance.
pub(crate) fn size_window_within(
    allowance: u64,
    source: &Utf8Path,
    matcher: &FileMatcher,
    dest: &Utf8Path,
) -> Result<Copied, GwBundleError> {
    let stats = limit_size(source, matcher, dest, ByteSize::from_bytes(allowance))?;
    Ok(stats.into())
}

/// Copy every matching file into `dest` unfiltered.
pub(crate) fn copy_all(
    source: &Utf8Path,
    matcher: &FileMatcher,
    dest: &Utf8Path,
) -> Result<Copied, GwBundleError> {
    let mut copied = Copied::default();
    for file in matcher.find(source)? {
        let size = fs::metadata(&file)?.len();
        copy_into(&file, dest)?;
        copied.files += 1;
        copied.bytes += size;
    }
    Ok(copied)
}

/// Copy compressed logs in enumeration order while they fit.
///
/// The first file that would overflow ends the copy; later files are not
/// tried even if they are smaller.
pub(crate) fn copy_compressed(
    source: &Utf8Path,
    matcher: &FileMatcher,
    dest: &Utf8Path,
    gate: Gate<'_>,
) -> Result<Copied, GwBundleError> {
    let mut copied = Copied::default();
    for file in matcher.find(source)? {
        let size = fs::metadata(&file)?.len();
        let available = match gate {
            Gate::Unbounded => None,
            Gate::Remaining(tracker) => tracker.remaining()?.map(ByteSize::bytes),
            Gate::Pool(pool) => Some(pool.saturating_sub(copied.bytes)),
        };
        if available.is_some_and(|left| size > left) {
            info!(
                file = %file,
                size,
                available = available.unwrap_or_default(),
                "Compressed log does not fit; stopping"
            );
            break;
        }
        copy_into(&file, dest)?;
        copied.files += 1;
        copied.bytes += size;
    }
    Ok(copied)
}

/// Stage `candidates` (already latest-N, newest first) while each one's raw
/// size fits the remaining budget. Stops on the first overflow.
///
/// `stage` writes one candidate and returns the bytes it produced.
pub(crate) fn stage_latest_gated<F>(
    candidates: &[Candidate],
    tracker: &BudgetTracker,
    mut stage: F,
) -> Result<Copied, GwBundleError>
where
    F: FnMut(&Candidate) -> Result<u64, GwBundleError>,
{
    let mut copied = Copied::default();
    for candidate in candidates {
        if !tracker.fits(ByteSize::from_bytes(candidate.size))? {
            info!(
                file = %candidate.path,
                size = candidate.size,
                "File does not fit remaining budget; stopping"
            );
            break;
        }
        copied.bytes += stage(candidate)?;
        copied.files += 1;
    }
    Ok(copied)
}

/// Copy `file` to `dest_root`, keeping its path relative to `root`.
pub(crate) fn copy_relative(
    file: &Utf8Path,
    root: &Utf8Path,
    dest_root: &Utf8Path,
) -> Result<u64, GwBundleError> {
    let rel = file
        .strip_prefix(root)
        .ok()
        .map_or_else(
            || Utf8PathBuf::from(file.file_name().unwrap_or("file")),
            Utf8Path::to_path_buf,
        );
    let dest = dest_root.join(rel);
    if let Some(parent) = dest.parent() {
        ensure_dir_all(parent)?;
    }
    Ok(fs::copy(file, &dest)?)
}
