//! Budgeted support-bundle collection.
//!
//! A [`Collector`] stages the diagnostic categories of one node in a fixed
//! priority order:
//!
//! 1. the service configuration file
//! 2. the installed-package manifest
//! 3. service logs cut to a time window
//! 4. service logs cut to the size limit (see [`Plan`])
//! 5. trace files and diagnostic (addb) dumps, newest first
//! 6. a stack trace of the running service, on request
//! 7. crash dumps, on request
//!
//! Every budget decision asks the [`BudgetTracker`], which rescans the
//! [`StagingArea`] each time. The staged tree is then written as
//! `<target>/<component>/<component>_<bundle-id>.tar.gz` by [`archive()`].

mod adapters;
pub mod archive;
pub mod budget;
pub mod category;
pub mod collector;
pub mod plan;
pub mod report;
pub mod request;
pub mod selection;
pub mod staging;
pub mod tools;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use adapters::Copied;
pub use archive::{archive, archive_path};
pub use budget::{BudgetTracker, remaining};
pub use category::{CategoryKind, CategorySet, LogCategory, LogRole};
pub use collector::{BundleOutcome, Collector, Sources};
pub use plan::{Allocation, AllocationOutcome, Plan, Policy, Target};
pub use report::{CategoryReport, CategoryStatus, CollectionReport};
pub use request::{BundleRequest, BundleRequestBuilder};
pub use selection::{Candidate, latest_n, prefix_within};
pub use staging::StagingArea;
pub use tools::{
    FixedProcessLookup, OnDegraded, ProcessLookup, Rendered, Rendering, SystemProcessLookup,
    ToolOutcome, Tools, render,
};
