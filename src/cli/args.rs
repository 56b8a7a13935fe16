//! CLI argument definitions

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use gwbundle_utils::{ByteSize, Period};

/// gwbundle - support bundle generator for the s3 storage gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "gwbundle")]
#[command(about = "Collect a size-bounded support bundle for the s3 storage gateway")]
#[command(long_about = r#"
gwbundle gathers the s3 configuration, installed-package manifest, service
logs, trace files, diagnostic dumps and (optionally) a stack trace and crash
dumps into <target>/s3/s3_<bundle-id>.tar.gz.

The staged data is kept within --size_limit. When the service logs alone do not
fit, the primary s3server logs are granted 95% of the limit and the remaining
patterns share what is left.

EXAMPLES:
  # Defaults: last 5 days, 500MB
  gwbundle -b SB0001

  # One day of logs, no size limit
  gwbundle -b SB0002 -d P1D --size_limit 0

  # Everything, including a stack trace and crash dumps
  gwbundle -b SB0003 --all true

The archive path is printed on stdout; progress goes to stderr.
"#)]
#[command(version)]
pub struct Cli {
    /// Bundle identifier; becomes part of the archive name
    #[arg(short = 'b', long = "bundle-id", alias = "bundle_id")]
    pub bundle_id: String,

    /// Directory the archive is written under
    #[arg(short = 't', long, default_value = "/var/log/cortx/support_bundle")]
    pub target: Utf8PathBuf,

    /// Cluster configuration URI
    #[arg(short = 'c', long, default_value = "yaml:///etc/cortx/cluster.conf")]
    pub config: String,

    /// Services to collect for (recorded only)
    #[arg(short = 's', long)]
    pub services: Option<String>,

    /// Time window as an ISO-8601 period; P0D disables it
    #[arg(short = 'd', long, default_value = "P5D", value_parser = parse_period)]
    pub duration: Period,

    /// Size limit such as 500MB or 1.5GB; 0 means unbounded
    #[arg(
        long = "size_limit",
        alias = "size-limit",
        default_value = "500MB",
        value_parser = parse_size
    )]
    pub size_limit: ByteSize,

    /// Include binary logs (recorded only)
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    pub binlogs: bool,

    /// Include crash dumps
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    pub coredumps: bool,

    /// Include a stack trace of the running service
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    pub stacktrace: bool,

    /// Modules to collect for (recorded only)
    #[arg(long)]
    pub modules: Option<String>,

    /// Turn on --binlogs, --coredumps and --stacktrace
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    pub all: bool,

    /// TOML file overriding collection settings
    #[arg(long)]
    pub settings: Option<Utf8PathBuf>,

    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn parse_period(s: &str) -> Result<Period, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_size(s: &str) -> Result<ByteSize, String> {
    s.parse().map_err(|e| format!("{e}"))
}
