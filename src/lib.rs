//! gwbundle - budgeted support bundles for storage-gateway nodes
//!
//! Collects configuration, service logs, trace files and crash artifacts of
//! the `s3` component into a single `.tar.gz`, keeping the staged data within a
//! size limit and optionally within a time window.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Last 5 days of logs, at most 500MB, written under /var/log/cortx/support_bundle
//! gwbundle -b SB0001
//!
//! # Last day, 100MB, with a stack trace and crash dumps
//! gwbundle -b SB0002 -d P1D --size_limit 100MB --stacktrace true --coredumps true
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use gwbundle::{BundleId, BundleRequest, ByteSize, ClusterConfig, Collector, Period, Settings};
//!
//! # fn main() -> Result<(), gwbundle::GwBundleError> {
//! let request = BundleRequest::builder(BundleId::parse("SB0001")?, "/var/log/cortx/support_bundle")
//!     .duration(Some(Period::from_days(1)))
//!     .size_limit(Some(ByteSize::from_mib(100)))
//!     .build();
//! let store = ClusterConfig::load("yaml:///etc/cortx/cluster.conf")?;
//! let outcome = Collector::new(request, Settings::default(), Box::new(store)).run()?;
//! println!("{}", outcome.archive);
//! # Ok(())
//! # }
//! ```
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | bundle written |
//! | 1 | interrupted |
//! | 2 | bad argument or configuration |
//! | 9 | another bundle is in progress |
//! | 74 | I/O failure |

pub mod cli;

pub use gwbundle_collect::{
    BundleOutcome, BundleRequest, CategoryKind, CategoryStatus, CollectionReport, Collector,
};
pub use gwbundle_config::{ClusterConfig, ConfigStore, Settings, StaticConfigStore};
pub use gwbundle_utils::{BundleId, ByteSize, ExitCode, GwBundleError, Period, UserFriendlyError};
