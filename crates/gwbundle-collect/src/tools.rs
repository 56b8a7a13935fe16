//! Wrappers around the external diagnostic tools.
//!
//! Every wrapper returns a [`ToolOutcome`]; a failed or missing tool never
//! aborts a run. How a degraded outcome shows up in the bundle is decided per
//! category through [`OnDegraded`].

use camino::Utf8Path;
use gwbundle_config::ToolSettings;
use gwbundle_runner::{CommandSpec, ProcessOutput, ProcessRunner};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::time::Duration;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tracing::{debug, warn};

/// Result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Exit code 0; carries the captured output
    Success(ProcessOutput),
    /// Missing tool, spawn failure, timeout or non-zero exit
    Degraded(String),
}

/// What to leave in the bundle when a tool degrades
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDegraded {
    /// Write nothing
    Skip,
    /// Write the failure reason in place of the output
    WriteNote,
}

/// What [`render`] put on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Output(u64),
    Note(u64),
    Skipped(String),
}

/// What an outcome would put on disk, held in memory until it is written.
///
/// Lets a caller check the exact byte count against a budget first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering<'o> {
    Output(&'o [u8]),
    Note(String),
    Skipped(String),
}

impl<'o> Rendering<'o> {
    /// Decide what `outcome` renders to under `on_degraded`.
    ///
    /// With [`OnDegraded::WriteNote`] the result is never empty: a successful
    /// run with no output becomes a note. With [`OnDegraded::Skip`] it is
    /// skipped like a failure.
    pub fn of(outcome: &'o ToolOutcome, on_degraded: OnDegraded, tool: &str) -> Self {
        match (outcome, on_degraded) {
            (ToolOutcome::Success(out), OnDegraded::WriteNote) if out.stdout.is_empty() => {
                Self::Note(format!("{tool} produced no output\n"))
            }
            (ToolOutcome::Success(out), OnDegraded::Skip) if out.stdout.is_empty() => {
                Self::Skipped("no output".to_string())
            }
            (ToolOutcome::Success(out), _) => Self::Output(&out.stdout),
            (ToolOutcome::Degraded(reason), OnDegraded::Skip) => Self::Skipped(reason.clone()),
            (ToolOutcome::Degraded(reason), OnDegraded::WriteNote) => {
                Self::Note(format!("{tool} failed: {reason}\n"))
            }
        }
    }

    /// Bytes [`Rendering::write`] would stage.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Output(bytes) => bytes.len() as u64,
            Self::Note(note) => note.len() as u64,
            Self::Skipped(_) => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write(self, dest: &Utf8Path) -> io::Result<Rendered> {
        match self {
            Self::Output(bytes) => {
                write_file(dest, bytes)?;
                Ok(Rendered::Output(bytes.len() as u64))
            }
            Self::Note(note) => {
                write_file(dest, note.as_bytes())?;
                Ok(Rendered::Note(note.len() as u64))
            }
            Self::Skipped(reason) => Ok(Rendered::Skipped(reason)),
        }
    }
}

/// Write `outcome` to `dest` according to `on_degraded`.
pub fn render(
    outcome: &ToolOutcome,
    dest: &Utf8Path,
    on_degraded: OnDegraded,
    tool: &str,
) -> io::Result<Rendered> {
    Rendering::of(outcome, on_degraded, tool).write(dest)
}

fn write_file(dest: &Utf8Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        gwbundle_utils::paths::ensure_dir_all(parent)?;
    }
    fs::write(dest, content)
}

/// The tool invocations a bundle run makes.
pub struct Tools<'a> {
    runner: &'a dyn ProcessRunner,
    programs: &'a ToolSettings,
    timeout: Duration,
}

impl<'a> Tools<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        programs: &'a ToolSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            programs,
            timeout,
        }
    }

    /// Installed-package manifest: `rpm -qa`.
    pub fn rpm_manifest(&self) -> ToolOutcome {
        self.invoke(CommandSpec::new(&self.programs.rpm).arg("-qa"))
    }

    /// All-thread backtrace of a running process.
    pub fn stack_trace(&self, pid: u32) -> ToolOutcome {
        self.invoke(CommandSpec::new(&self.programs.gdb).args([
            "-p".to_string(),
            pid.to_string(),
            "-batch".to_string(),
            "-ex".to_string(),
            "thread apply all bt".to_string(),
        ]))
    }

    /// Text rendering of one addb diagnostic record file.
    pub fn addb_dump(&self, file: &Utf8Path) -> ToolOutcome {
        self.invoke(
            CommandSpec::new(&self.programs.addb_dump)
                .args(["-f", "--"])
                .arg(file.as_str()),
        )
    }

    fn invoke(&self, cmd: CommandSpec) -> ToolOutcome {
        debug!(command = %cmd, "Running tool");
        match self.runner.run(&cmd, self.timeout) {
            Ok(output) if output.success() => ToolOutcome::Success(output),
            Ok(output) => {
                let stderr = output.stderr_string();
                let reason = format!(
                    "'{cmd}' exited with {}: {}",
                    output
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    stderr.trim()
                );
                warn!(command = %cmd, reason = %reason, "Tool failed");
                ToolOutcome::Degraded(reason)
            }
            Err(e) => {
                warn!(command = %cmd, error = %e, "Tool could not be run");
                ToolOutcome::Degraded(e.to_string())
            }
        }
    }
}

/// Finds the PID of a running service by process name.
pub trait ProcessLookup {
    fn pid_of(&self, name: &str) -> Option<u32>;
}

/// [`ProcessLookup`] over the live process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessLookup;

impl ProcessLookup for SystemProcessLookup {
    fn pid_of(&self, name: &str) -> Option<u32> {
        let mut system = System::new_with_specifics(
            RefreshKind::nothing().with_processes(ProcessRefreshKind::nothing()),
        );
        system.refresh_processes(ProcessesToUpdate::All, true);
        let mut pids: Vec<u32> = system
            .processes_by_exact_name(OsStr::new(name))
            .map(|p| p.pid().as_u32())
            .collect();
        // Lowest PID is the long-lived parent when the service forks.
        pids.sort_unstable();
        pids.first().copied()
    }
}

/// [`ProcessLookup`] with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProcessLookup(pub Option<u32>);

impl ProcessLookup for FixedProcessLookup {
    fn pid_of(&self, _name: &str) -> Option<u32> {
        self.0
    }
}
