//! Run summary returned by [`Collector::run`](crate::Collector::run).

use crate::category::CategoryKind;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    /// Something was staged (possibly nothing, when no candidates matched)
    Included,
    /// Deliberately left out: not requested, source missing, no budget
    Skipped(String),
    /// A tool failed; any placeholder written is counted in `bytes`
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub kind: CategoryKind,
    pub status: CategoryStatus,
    /// Bytes this category added to the staging area
    pub bytes: u64,
    pub files: usize,
}

/// What a bundle run collected, category by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub categories: Vec<CategoryReport>,
    /// Bytes under the staging area just before archiving
    pub staged_bytes: u64,
    pub limit: Option<u64>,
}

impl CollectionReport {
    pub(crate) fn included(&mut self, kind: CategoryKind, files: usize, bytes: u64) {
        self.push(kind, CategoryStatus::Included, files, bytes);
    }

    pub(crate) fn skipped(&mut self, kind: CategoryKind, reason: impl Into<String>) {
        self.push(kind, CategoryStatus::Skipped(reason.into()), 0, 0);
    }

    pub(crate) fn degraded(&mut self, kind: CategoryKind, reason: impl Into<String>, bytes: u64) {
        let files = usize::from(bytes > 0);
        self.push(kind, CategoryStatus::Degraded(reason.into()), files, bytes);
    }

    fn push(&mut self, kind: CategoryKind, status: CategoryStatus, files: usize, bytes: u64) {
        // Log categories can contribute from several steps; merge them.
        if let Some(existing) = self.categories.iter_mut().find(|c| c.kind == kind) {
            existing.files += files;
            existing.bytes += bytes;
            if matches!(existing.status, CategoryStatus::Skipped(_)) {
                existing.status = status;
            }
            return;
        }
        self.categories.push(CategoryReport {
            kind,
            status,
            bytes,
            files,
        });
    }

    #[must_use]
    pub fn get(&self, kind: CategoryKind) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.kind == kind)
    }

    pub fn skipped_categories(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|c| matches!(c.status, CategoryStatus::Skipped(_)))
    }

    pub fn degradations(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|c| matches!(c.status, CategoryStatus::Degraded(_)))
    }

    /// Emit one `info` line per category.
    pub fn log(&self) {
        for c in &self.categories {
            info!(
                category = %c.kind,
                files = c.files,
                bytes = c.bytes,
                status = %c.status,
                "Category summary"
            );
        }
        info!(
            staged_bytes = self.staged_bytes,
            limit = ?self.limit,
            "Collection finished"
        );
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Included => write!(f, "included"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Degraded(reason) => write!(f, "degraded ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_category_merges() {
        let mut report = CollectionReport::default();
        report.skipped(CategoryKind::LogsBySize, "no budget");
        report.included(CategoryKind::LogsBySize, 2, 100);
        report.included(CategoryKind::LogsBySize, 1, 50);

        assert_eq!(report.categories.len(), 1);
        let logs = report.get(CategoryKind::LogsBySize).unwrap();
        assert_eq!(logs.status, CategoryStatus::Included);
        assert_eq!((logs.files, logs.bytes), (3, 150));
    }

    #[test]
    fn test_filters() {
        let mut report = CollectionReport::default();
        report.included(CategoryKind::Config, 1, 10);
        report.skipped(CategoryKind::CrashDumps, "not requested");
        report.degraded(CategoryKind::StackTrace, "gdb missing", 24);

        assert_eq!(report.skipped_categories().count(), 1);
        let degraded: Vec<_> = report.degradations().collect();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].files, 1);
        assert_eq!(
            degraded[0].status.to_string(),
            "degraded (gdb missing)"
        );
    }
}
