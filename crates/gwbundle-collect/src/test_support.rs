//! Test doubles for the collector's external seams.

use gwbundle_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// [`ProcessRunner`] that answers from a table keyed by program name.
///
/// Unscripted programs fail with [`RunnerError::ProgramNotFound`]. Clones share
/// the call log, so a test can keep one handle and box the other.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, ProcessOutput>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `program` with `output`.
    #[must_use]
    pub fn respond(mut self, program: &str, output: ProcessOutput) -> Self {
        self.responses.insert(program.to_string(), output);
        self
    }

    /// Answer every call to `program` with exit code 0 and `stdout`.
    #[must_use]
    pub fn succeed(self, program: &str, stdout: impl Into<Vec<u8>>) -> Self {
        self.respond(program, ProcessOutput::new(stdout.into(), Vec::new(), Some(0)))
    }

    /// Every command run so far, rendered as in log lines.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.to_string());
        }
        let program = cmd.program.to_string_lossy();
        let name = Path::new(program.as_ref())
            .file_name()
            .map_or_else(|| program.to_string(), |n| n.to_string_lossy().into_owned());
        self.responses
            .get(&name)
            .cloned()
            .ok_or(RunnerError::ProgramNotFound { program: name })
    }
}
