//! Single-flight lock guarding the node's staging directory.
//!
//! A bundle run holds an exclusive `fd-lock` on `<staging>.lock` for its whole
//! lifetime. The lock is advisory: it coordinates gwbundle processes and is
//! released by the OS when the holder exits, so a crashed run never blocks the
//! next one.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::process;

/// Holder details written into the lock file so a contender can report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that holds the lock
    pub pid: u32,
    /// Bundle being generated by the holder
    pub bundle_id: String,
    /// When the lock was taken
    pub created_at: DateTime<Utc>,
    /// gwbundle version of the holder
    pub version: String,
}

/// Lock errors for staging-area coordination
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Bundle '{bundle_id}' is already in progress (PID {pid}, started {created_ago} ago)")]
    BundleInProgress {
        bundle_id: String,
        pid: u32,
        created_ago: String,
    },

    #[error("Failed to acquire lock at {path}: {reason}")]
    AcquisitionFailed { path: String, reason: String },

    #[error("IO error during lock operation: {0}")]
    Io(#[from] io::Error),
}

/// Exclusive lock on `<staging>.lock`, held until dropped.
pub struct StagingLock {
    lock_path: Utf8PathBuf,
    // Keeps the descriptor (and with it the flock) open.
    _fd_lock: Box<RwLock<fs::File>>,
    info: LockInfo,
}

impl StagingLock {
    /// Path of the lock file that guards `staging_dir`.
    #[must_use]
    pub fn lock_path_for(staging_dir: &Utf8Path) -> Utf8PathBuf {
        let name = staging_dir.file_name().unwrap_or("staging");
        let parent = staging_dir.parent().unwrap_or_else(|| Utf8Path::new("."));
        parent.join(format!("{name}.lock"))
    }

    /// Take the lock for `staging_dir`, failing fast if another run holds it.
    pub fn acquire(staging_dir: &Utf8Path, bundle_id: &str) -> Result<Self, LockError> {
        let lock_path = Self::lock_path_for(staging_dir);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::AcquisitionFailed {
                path: lock_path.to_string(),
                reason: format!("Failed to create lock directory: {e}"),
            })?;
        }

        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::AcquisitionFailed {
                path: lock_path.to_string(),
                reason: e.to_string(),
            })?;

        let info = LockInfo {
            pid: process::id(),
            bundle_id: bundle_id.to_string(),
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let mut rw_lock = Box::new(RwLock::new(file));
        {
            let mut guard = match rw_lock.try_write() {
                Ok(guard) => guard,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(Self::contended(&lock_path));
                }
                Err(e) => {
                    return Err(LockError::AcquisitionFailed {
                        path: lock_path.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            let json =
                serde_json::to_string_pretty(&info).map_err(|e| LockError::AcquisitionFailed {
                    path: lock_path.to_string(),
                    reason: format!("Failed to serialize lock info: {e}"),
                })?;
            let file: &mut fs::File = &mut guard;
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;

            // Dropping the guard would unlock; the flock instead lives as long
            // as the descriptor owned by `rw_lock`.
            std::mem::forget(guard);
        }

        Ok(Self {
            lock_path,
            _fd_lock: rw_lock,
            info,
        })
    }

    /// Read the holder details of a lock file, if present and well-formed.
    pub fn read_info(lock_path: &Utf8Path) -> Option<LockInfo> {
        let mut content = String::new();
        fs::File::open(lock_path)
            .and_then(|mut f| f.read_to_string(&mut content))
            .ok()?;
        serde_json::from_str(&content).ok()
    }

    #[must_use]
    pub fn lock_path(&self) -> &Utf8Path {
        &self.lock_path
    }

    #[must_use]
    pub const fn info(&self) -> &LockInfo {
        &self.info
    }

    fn contended(lock_path: &Utf8Path) -> LockError {
        match Self::read_info(lock_path) {
            Some(holder) => LockError::BundleInProgress {
                created_ago: format_age(holder.created_at),
                bundle_id: holder.bundle_id,
                pid: holder.pid,
            },
            None => LockError::BundleInProgress {
                bundle_id: "unknown".to_string(),
                pid: 0,
                created_ago: "unknown".to_string(),
            },
        }
    }
}

impl std::fmt::Debug for StagingLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingLock")
            .field("lock_path", &self.lock_path)
            .field("info", &self.info)
            .field("_fd_lock", &"<RwLock>")
            .finish()
    }
}

impl Drop for StagingLock {
    fn drop(&mut self) {
        // Remove while still holding the descriptor; the flock goes with it.
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn format_age(since: DateTime<Utc>) -> String {
    let secs = Utc::now()
        .signed_duration_since(since)
        .num_seconds()
        .max(0);

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staging_in(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().join("s3_support_bundle")).unwrap()
    }

    #[test]
    fn test_lock_path_sits_next_to_staging() {
        let path = StagingLock::lock_path_for(Utf8Path::new("/tmp/s3_support_bundle"));
        assert_eq!(path, Utf8PathBuf::from("/tmp/s3_support_bundle.lock"));
    }

    #[test]
    fn test_acquire_writes_holder_info() {
        let temp = TempDir::new().unwrap();
        let staging = staging_in(&temp);

        let lock = StagingLock::acquire(&staging, "b-001").unwrap();
        let info = StagingLock::read_info(lock.lock_path()).unwrap();
        assert_eq!(info.bundle_id, "b-001");
        assert_eq!(info.pid, process::id());
    }

    #[test]
    fn test_second_acquire_reports_bundle_in_progress() {
        let temp = TempDir::new().unwrap();
        let staging = staging_in(&temp);

        let _held = StagingLock::acquire(&staging, "first").unwrap();
        let err = StagingLock::acquire(&staging, "second").unwrap_err();
        match err {
            LockError::BundleInProgress { bundle_id, pid, .. } => {
                assert_eq!(bundle_id, "first");
                assert_eq!(pid, process::id());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let temp = TempDir::new().unwrap();
        let staging = staging_in(&temp);

        {
            let lock = StagingLock::acquire(&staging, "first").unwrap();
            assert!(lock.lock_path().exists());
        }
        assert!(!StagingLock::lock_path_for(&staging).exists());

        let again = StagingLock::acquire(&staging, "second").unwrap();
        assert_eq!(again.info().bundle_id, "second");
    }

    #[test]
    fn test_leftover_lock_file_without_holder_is_reusable() {
        let temp = TempDir::new().unwrap();
        let staging = staging_in(&temp);
        let lock_path = StagingLock::lock_path_for(&staging);
        fs::write(&lock_path, "garbage from a crashed run").unwrap();

        let lock = StagingLock::acquire(&staging, "fresh").unwrap();
        assert_eq!(
            StagingLock::read_info(lock.lock_path()).unwrap().bundle_id,
            "fresh"
        );
    }

    #[test]
    fn test_format_age_units() {
        assert!(format_age(Utc::now()).ends_with('s'));
        assert_eq!(format_age(Utc::now() - chrono::Duration::hours(3)), "3h");
        assert_eq!(format_age(Utc::now() - chrono::Duration::days(2)), "2d");
    }
}
