//! Foundation utilities shared by every gwbundle crate.
//!
//! - [`error`]: the aggregated [`GwBundleError`](error::GwBundleError) and
//!   user-facing rendering
//! - [`exit_codes`]: process exit codes
//! - [`logging`]: `tracing` subscriber setup
//! - [`units`]: [`ByteSize`](units::ByteSize) and [`Period`](units::Period)
//! - [`bundle_id`]: bundle identifier validation
//! - [`paths`]: directory helpers used by staging and budgeting

pub mod bundle_id;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;
pub mod units;

pub use bundle_id::BundleId;
pub use error::{GwBundleError, UserFriendlyError};
pub use exit_codes::ExitCode;
pub use units::{ByteSize, Period};
