//! The log allocation plan.
//!
//! Once the always-included categories are staged, the remaining service logs
//! are collected from an ordered list of [`Allocation`]s. Each entry names what
//! to collect, where from, and which [`Policy`] governs its share of the size
//! limit. [`Plan::execute`] walks the list in order.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::adapters::{self, Copied, Gate};
use crate::budget::BudgetTracker;
use crate::category::{CategorySet, LogRole};
use gwbundle_utils::GwBundleError;

/// What an allocation collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// One of the three service-log patterns, size-windowed
    Log(LogRole),
    /// Rotated, gzip-compressed service logs, copied whole
    Compressed,
}

/// How an allocation's share of the size limit is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No limit applies
    Unconditional,
    /// Whatever is left of the limit when the entry runs
    BudgetedFromRemaining,
    /// A fixed percentage of the original limit, shared by every entry with
    /// this policy and independent of what is already staged
    FixedPercentOverride(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub target: Target,
    pub source: Utf8PathBuf,
    pub policy: Policy,
}

/// Result of one [`Allocation`]; `copied` is `None` when it was skipped for
/// lack of budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub target: Target,
    pub copied: Option<Copied>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    entries: Vec<Allocation>,
}

impl Plan {
    /// Plan for a run with a size limit.
    ///
    /// When the working set `fits` the remaining budget every pattern is
    /// size-windowed from what is left, then compressed logs are copied while
    /// they fit. Otherwise the primary logs and their compressed rotations
    /// share `percent`% of the original limit, and the two secondary patterns
    /// get whatever is left of the limit after that.
    #[must_use]
    pub fn size_limited(
        fits: bool,
        working_set: &Utf8Path,
        log_source: &Utf8Path,
        percent: u8,
    ) -> Self {
        let log = |role, policy| Allocation {
            target: Target::Log(role),
            source: working_set.to_path_buf(),
            policy,
        };
        let compressed = |policy| Allocation {
            target: Target::Compressed,
            source: log_source.to_path_buf(),
            policy,
        };

        let entries = if fits {
            vec![
                log(LogRole::Primary, Policy::BudgetedFromRemaining),
                log(LogRole::Underscore, Policy::BudgetedFromRemaining),
                log(LogRole::Gateway, Policy::BudgetedFromRemaining),
                compressed(Policy::BudgetedFromRemaining),
            ]
        } else {
            let share = Policy::FixedPercentOverride(percent);
            vec![
                log(LogRole::Primary, share),
                compressed(share),
                log(LogRole::Underscore, Policy::BudgetedFromRemaining),
                log(LogRole::Gateway, Policy::BudgetedFromRemaining),
            ]
        };
        Self { entries }
    }

    /// Plan for a run with neither a size limit nor a duration: every
    /// matching log is copied as-is.
    #[must_use]
    pub fn unbounded(log_source: &Utf8Path) -> Self {
        let entry = |target| Allocation {
            target,
            source: log_source.to_path_buf(),
            policy: Policy::Unconditional,
        };
        Self {
            entries: vec![
                entry(Target::Log(LogRole::Primary)),
                entry(Target::Log(LogRole::Underscore)),
                entry(Target::Log(LogRole::Gateway)),
                entry(Target::Compressed),
            ],
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[Allocation] {
        &self.entries
    }

    /// Run every entry in order, writing into `dest`.
    pub fn execute(
        &self,
        categories: &CategorySet,
        tracker: &BudgetTracker,
        dest: &Utf8Path,
    ) -> Result<Vec<AllocationOutcome>, GwBundleError> {
        // Lazily sized on the first override entry, then drawn down.
        let mut pool: Option<u64> = None;
        let mut outcomes = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let copied = match (entry.target, entry.policy) {
                (Target::Log(role), Policy::Unconditional) => Some(adapters::copy_all(
                    &entry.source,
                    &categories.log(role).matcher,
                    dest,
                )?),
                (Target::Log(role), Policy::BudgetedFromRemaining) => adapters::size_window(
                    tracker,
                    &entry.source,
                    &categories.log(role).matcher,
                    dest,
                )?,
                (Target::Log(role), Policy::FixedPercentOverride(percent)) => {
                    let left = pool.get_or_insert_with(|| override_share(tracker, percent));
                    if *left == 0 {
                        warn!(
                            log = role.as_str(),
                            "Override share exhausted; skipping log pattern"
                        );
                        None
                    } else {
                        let copied = adapters::size_window_within(
                            *left,
                            &entry.source,
                            &categories.log(role).matcher,
                            dest,
                        )?;
                        *left = left.saturating_sub(copied.bytes);
                        Some(copied)
                    }
                }
                (Target::Compressed, policy) => {
                    let gate = match policy {
                        Policy::Unconditional => Gate::Unbounded,
                        Policy::BudgetedFromRemaining => Gate::Remaining(tracker),
                        Policy::FixedPercentOverride(percent) => {
                            Gate::Pool(
                                *pool.get_or_insert_with(|| override_share(tracker, percent)),
                            )
                        }
                    };
                    let copied = adapters::copy_compressed(
                        &entry.source,
                        &categories.compressed,
                        dest,
                        gate,
                    )?;
                    if let Some(left) = pool.as_mut()
                        && matches!(policy, Policy::FixedPercentOverride(_))
                    {
                        *left = left.saturating_sub(copied.bytes);
                    }
                    Some(copied)
                }
            };

            debug!(
                allocation = ?entry.target,
                policy = ?entry.policy,
                source = %entry.source,
                files = copied.map(|c| c.files),
                bytes = copied.map(|c| c.bytes),
                "Allocation applied"
            );
            outcomes.push(AllocationOutcome {
                target: entry.target,
                copied,
            });
        }
        Ok(outcomes)
    }
}

fn override_share(tracker: &BudgetTracker, percent: u8) -> u64 {
    tracker
        .limit()
        .map_or(u64::MAX, |limit| limit.percent(percent).bytes())
}
