//! Process execution for the external diagnostic tools a bundle run shells out to
//! (`rpm`, `gdb`, `m0addb2dump`).
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements rather than shell strings, so file
//! names found on disk can never be interpreted by a shell.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::{NativeRunner, resolve_program};
pub use process::{ProcessOutput, ProcessRunner};
