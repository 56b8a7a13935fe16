//! CLI entry point
//!
//! `run()` parses arguments, sets up logging and the interrupt handler, runs
//! the collector and owns all error output. main.rs only maps the returned
//! [`ExitCode`] to the process exit status.

use clap::Parser;
use gwbundle_collect::{BundleOutcome, BundleRequest, Collector};
use gwbundle_config::{ClusterConfig, Settings};
use gwbundle_utils::logging::init_tracing;
use gwbundle_utils::{BundleId, ExitCode, GwBundleError};
use tracing::warn;

use super::args::Cli;
use super::interrupt;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
    if let Err(e) = interrupt::install() {
        warn!(error = %e, "Could not install interrupt handler");
    }

    match execute(&cli) {
        Ok(outcome) => {
            println!("{}", outcome.archive);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.display_for_user());
            Err(err.to_exit_code())
        }
    }
}

/// Validate the arguments, load configuration and run one bundle.
pub fn execute(cli: &Cli) -> Result<BundleOutcome, GwBundleError> {
    let request = build_request(cli)?;
    let settings = Settings::load(cli.settings.as_deref())?;
    let store = ClusterConfig::load(request.config_uri())?;

    Collector::new(request, settings, Box::new(store)).run()
}

/// Turn parsed arguments into a [`BundleRequest`].
///
/// A zero size limit and a zero duration both mean "not requested".
pub fn build_request(cli: &Cli) -> Result<BundleRequest, GwBundleError> {
    let bundle_id = BundleId::parse(&cli.bundle_id)?;

    let mut builder = BundleRequest::builder(bundle_id, cli.target.clone())
        .config_uri(cli.config.clone())
        .duration(Some(cli.duration).filter(|d| d.as_secs() > 0))
        .size_limit(Some(cli.size_limit))
        .coredumps(cli.coredumps)
        .stacktrace(cli.stacktrace)
        .binlogs(cli.binlogs)
        .services(cli.services.clone())
        .modules(cli.modules.clone());
    if cli.all {
        builder = builder.all();
    }
    Ok(builder.build())
}
