//! Staging area lifecycle.
//!
//! One run owns one staging directory. The directory is guarded by an advisory
//! lock on the sibling `<staging>.lock` file for as long as the
//! [`StagingArea`] lives, and is removed when it is dropped.

use camino::{Utf8Path, Utf8PathBuf};
use gwbundle_lock::StagingLock;
use gwbundle_utils::GwBundleError;
use gwbundle_utils::paths::{copy_dir_all, ensure_dir_all, move_file, remove_dir_all_if_exists};
use std::fs;
use std::io;
use tracing::{debug, warn};

pub struct StagingArea {
    dir: Utf8PathBuf,
    _lock: StagingLock,
    torn_down: bool,
}

impl StagingArea {
    /// Lock, clear and recreate `dir`.
    ///
    /// Anything left behind by an earlier (crashed or interrupted) run is
    /// deleted. Fails with [`LockError::BundleInProgress`](gwbundle_lock::LockError)
    /// while another run holds the lock.
    pub fn prepare(dir: &Utf8Path, bundle_id: &str) -> Result<Self, GwBundleError> {
        let lock = StagingLock::acquire(dir, bundle_id)?;

        remove_dir_all_if_exists(dir).map_err(|e| staging_error(dir, "clear", &e))?;
        ensure_dir_all(dir).map_err(|e| staging_error(dir, "create", &e))?;
        debug!(staging = %dir, lock = %lock.lock_path(), "Staging area prepared");

        Ok(Self {
            dir: dir.to_owned(),
            _lock: lock,
            torn_down: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.dir
    }

    /// Move every top-level entry except those named in `keep` into `dest`.
    ///
    /// Returns the number of entries moved.
    pub fn relocate_except(&self, keep: &[&str], dest: &Utf8Path) -> io::Result<usize> {
        ensure_dir_all(dest)?;
        let mut moved = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if keep.contains(&name) {
                continue;
            }
            let src = self.dir.join(name);
            let target = dest.join(name);
            if entry.file_type()?.is_dir() {
                move_dir(&src, &target)?;
            } else {
                move_file(&src, &target)?;
            }
            moved += 1;
        }
        debug!(staging = %self.dir, dest = %dest, moved, "Relocated staged entries");
        Ok(moved)
    }

    /// Remove the staging directory. Safe to call more than once.
    pub fn teardown(&mut self) -> io::Result<()> {
        if self.torn_down {
            return Ok(());
        }
        remove_dir_all_if_exists(&self.dir)?;
        self.torn_down = true;
        debug!(staging = %self.dir, "Staging area removed");
        Ok(())
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(staging = %self.dir, error = %e, "Failed to remove staging area");
        }
    }
}

fn move_dir(src: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_dir_all(src, dest)?;
            fs::remove_dir_all(src)
        }
    }
}

fn staging_error(dir: &Utf8Path, action: &str, err: &io::Error) -> GwBundleError {
    GwBundleError::Staging {
        path: dir.to_string(),
        reason: format!("failed to {action} directory: {err}"),
    }
}
