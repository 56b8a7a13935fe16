//! Configuration for gwbundle.
//!
//! Two layers:
//!
//! - [`ClusterConfig`]: the node's cluster configuration, read through a URI
//!   such as `yaml:///etc/cortx/cluster.conf` and queried with `>`-separated
//!   key paths. Only two keys matter here ([`keys::LOG_PATH`] and
//!   [`keys::CONFIG_PATH`]).
//! - [`Settings`]: collection tunables (patterns, latest-N counts, tool names,
//!   staging location) with built-in defaults and an optional TOML override.

pub mod settings;
pub mod store;

pub use settings::{LimitSettings, PathSettings, PatternSettings, Settings, ToolSettings};
pub use store::{ClusterConfig, ConfigFormat, ConfigStore, StaticConfigStore, keys};
