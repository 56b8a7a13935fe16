//! Command-line interface for gwbundle
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, request building and error output
//! - `interrupt`: SIGINT handling

pub mod args;
mod interrupt;
mod run;

pub use args::Cli;
pub use run::{build_request, execute, run};
