use camino::{Utf8Path, Utf8PathBuf};
use gwbundle_utils::ByteSize;
use gwbundle_utils::paths::dir_size;
use std::io;

/// Bytes left under `limit` given what is already staged in `staging_dir`.
///
/// Rescans the directory on every call and clamps at zero.
pub fn remaining(staging_dir: &Utf8Path, limit: ByteSize) -> io::Result<ByteSize> {
    let used = ByteSize::from_bytes(dir_size(staging_dir)?);
    Ok(limit.saturating_sub(used))
}

/// Byte budget for one staging area.
///
/// Nothing is cached: every query walks the staging directory, so files written
/// by filters, tools and plain copies are all accounted for the same way.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    staging_dir: Utf8PathBuf,
    limit: Option<ByteSize>,
}

impl BudgetTracker {
    /// A zero `limit` is the same as no limit.
    #[must_use]
    pub fn new(staging_dir: impl Into<Utf8PathBuf>, limit: Option<ByteSize>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            limit: limit.filter(|l| !l.is_unbounded()),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> Option<ByteSize> {
        self.limit
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.limit.is_none()
    }

    /// Bytes currently under the staging directory.
    pub fn used(&self) -> io::Result<ByteSize> {
        Ok(ByteSize::from_bytes(dir_size(&self.staging_dir)?))
    }

    /// Remaining budget, or `None` when unbounded.
    pub fn remaining(&self) -> io::Result<Option<ByteSize>> {
        match self.limit {
            Some(limit) => remaining(&self.staging_dir, limit).map(Some),
            None => Ok(None),
        }
    }

    /// True if `size` more bytes would stay within the limit.
    pub fn fits(&self, size: ByteSize) -> io::Result<bool> {
        Ok(self.remaining()?.is_none_or(|left| size <= left))
    }
}
