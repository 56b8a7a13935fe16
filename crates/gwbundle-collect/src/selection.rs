use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::time::SystemTime;

/// A candidate file with the metadata the selection rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: Utf8PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl Candidate {
    pub fn stat(path: &Utf8Path) -> io::Result<Self> {
        let meta = path.metadata()?;
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }
}

/// The `n` most recently modified of `paths`, newest first.
///
/// Files that disappear before they can be stat'ed are dropped. Ties on
/// modification time fall back to path order so the result is stable.
pub fn latest_n(paths: &[Utf8PathBuf], n: usize) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = paths
        .iter()
        .filter_map(|p| Candidate::stat(p).ok())
        .collect();
    candidates.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.path.cmp(&b.path))
    });
    candidates.truncate(n);
    candidates
}

/// Longest newest-first prefix of `candidates` whose sizes fit in `available`.
///
/// Stops at the first file that would overflow; later, smaller files are not
/// considered. `None` means unbounded and keeps everything.
#[must_use]
pub fn prefix_within(candidates: &[Candidate], available: Option<u64>) -> &[Candidate] {
    let Some(mut left) = available else {
        return candidates;
    };
    let mut end = 0;
    for candidate in candidates {
        if candidate.size > left {
            break;
        }
        left -= candidate.size;
        end += 1;
    }
    &candidates[..end]
}
