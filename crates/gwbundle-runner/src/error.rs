//! Error types for runner module

use thiserror::Error;

/// Failures while launching or waiting on an external tool
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Program '{program}' not found on PATH")]
    ProgramNotFound { program: String },

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Native execution failed: {reason}")]
    NativeExecutionFailed { reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}
