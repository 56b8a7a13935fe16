use crate::error::RunnerError;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// Resolve a tool name against `PATH`.
///
/// Names that already contain a path separator are returned unchanged so
/// callers can pin an absolute binary.
pub fn resolve_program(program: &OsStr) -> Result<PathBuf, RunnerError> {
    let as_path = std::path::Path::new(program);
    if as_path.components().count() > 1 {
        return Ok(as_path.to_path_buf());
    }
    which::which(program).map_err(|_| RunnerError::ProgramNotFound {
        program: program.to_string_lossy().into_owned(),
    })
}

/// Native process runner using `std::process::Command`.
///
/// Resolves the program on `PATH` first, so a missing tool surfaces as
/// [`RunnerError::ProgramNotFound`] rather than an opaque spawn error. The
/// timeout is enforced from a waiter thread; on expiry the child gets SIGKILL.
///
/// ```rust,no_run
/// use gwbundle_runner::{CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let output = NativeRunner::new()
///     .run(&CommandSpec::new("rpm").arg("-qa"), Duration::from_secs(120))
///     .unwrap();
/// println!("{}", output.stdout_string());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        use std::sync::mpsc;
        use std::thread;

        let resolved = resolve_program(&cmd.program)?;
        let cmd = cmd.clone().with_program(resolved);
        debug!(command = %cmd, timeout_secs = timeout.as_secs(), "Spawning tool");

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: cmd.program.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })?;

        let (tx, rx) = mpsc::channel();
        let child_id = child.id();

        let handle = thread::spawn(move || {
            let output = child.wait_with_output();
            let _ = tx.send(output);
        });

        match rx.recv_timeout(timeout) {
            Ok(output_result) => {
                let _ = handle.join();

                let output = output_result.map_err(|e| RunnerError::NativeExecutionFailed {
                    reason: format!("Failed to wait for process: {e}"),
                })?;

                Ok(ProcessOutput::new(
                    output.stdout,
                    output.stderr,
                    output.status.code(),
                ))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Self::terminate_process(child_id);
                // The waiter returns once the killed child is reaped.
                let _ = handle.join();

                Err(RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunnerError::NativeExecutionFailed {
                reason: "Process monitoring thread terminated unexpectedly".to_string(),
            }),
        }
    }
}

impl NativeRunner {
    fn terminate_process(pid: u32) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            if let Ok(raw) = i32::try_from(pid) {
                let _ = kill(Pid::from_raw(raw), Signal::SIGKILL);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
        }
    }
}
