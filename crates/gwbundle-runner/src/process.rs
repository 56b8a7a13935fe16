use crate::error::RunnerError;
use std::time::Duration;

use super::CommandSpec;

/// Captured result of a finished tool process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output from the process
    pub stdout: Vec<u8>,
    /// Standard error from the process
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation).
/// The collector only ever talks to this trait, which lets tests substitute a
/// scripted runner for `rpm`, `gdb` and `m0addb2dump`.
///
/// # Example
///
/// ```rust
/// use gwbundle_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
/// use std::time::Duration;
///
/// struct CannedRunner;
///
/// impl ProcessRunner for CannedRunner {
///     fn run(&self, _cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
///         Ok(ProcessOutput::new(b"bash-5.1\n".to_vec(), Vec::new(), Some(0)))
///     }
/// }
///
/// let out = CannedRunner
///     .run(&CommandSpec::new("rpm").arg("-qa"), Duration::from_secs(5))
///     .unwrap();
/// assert!(out.success());
/// ```
pub trait ProcessRunner {
    /// Execute a command with the given timeout.
    ///
    /// * `Ok(ProcessOutput)` - The process completed (possibly with non-zero exit code)
    /// * `Err(RunnerError::Timeout)` - The process timed out and was killed
    /// * `Err(RunnerError::*)` - The program could not be resolved or spawned
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}
