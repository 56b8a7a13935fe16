use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// Specification for an external tool invocation.
///
/// Arguments are kept as discrete `OsString` elements and handed to
/// `Command::args`, never joined into a shell string.
///
/// # Example
///
/// ```rust
/// use gwbundle_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("gdb")
///     .args(["-p", "4242", "-batch", "-ex", "thread apply all bt"]);
///
/// assert_eq!(cmd.program, OsString::from("gdb"));
/// assert_eq!(cmd.args.len(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<BTreeMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Add a single argument to the command.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace the program, keeping arguments.
    ///
    /// Used after PATH resolution so the spawned binary is the resolved one.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Build the `std::process::Command` for this spec.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}

impl fmt::Display for CommandSpec {
    /// Human-readable rendering for log lines; arguments containing spaces are quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_new() {
        let cmd = CommandSpec::new("rpm");
        assert_eq!(cmd.program, OsString::from("rpm"));
        assert!(cmd.args.is_empty());
        assert!(cmd.cwd.is_none());
        assert!(cmd.env.is_none());
    }

    #[test]
    fn test_command_spec_args_stay_discrete() {
        let cmd = CommandSpec::new("gdb").args(["-ex", "thread apply all bt"]);
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[1], OsString::from("thread apply all bt"));
    }

    #[test]
    fn test_command_spec_env_and_cwd() {
        let cmd = CommandSpec::new("m0addb2dump")
            .env("LC_ALL", "C")
            .cwd("/tmp");
        let env = cmd.env.as_ref().unwrap();
        assert_eq!(env.get(&OsString::from("LC_ALL")), Some(&OsString::from("C")));
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_with_program_keeps_args() {
        let cmd = CommandSpec::new("rpm")
            .arg("-qa")
            .with_program("/usr/bin/rpm");
        assert_eq!(cmd.program, OsString::from("/usr/bin/rpm"));
        assert_eq!(cmd.args, vec![OsString::from("-qa")]);
    }

    #[test]
    fn test_display_quotes_spaced_args() {
        let cmd = CommandSpec::new("gdb").args(["-batch", "-ex", "thread apply all bt"]);
        assert_eq!(cmd.to_string(), "gdb -batch -ex \"thread apply all bt\"");
    }

    #[test]
    fn test_to_command_program() {
        let cmd = CommandSpec::new("rpm").arg("-qa");
        let command = cmd.to_command();
        assert_eq!(command.get_program(), "rpm");
        assert_eq!(command.get_args().count(), 1);
    }
}
