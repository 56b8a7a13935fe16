//! Exit codes for the `gwbundle` binary.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Bundle written |
//! | 1 | `INTERRUPTED` | Operator interrupted the run |
//! | 2 | `CLI_ARGS` | Invalid arguments or configuration |
//! | 9 | `LOCK_HELD` | Another bundle is in progress on this node |
//! | 74 | `IO_FAILURE` | Staging, copy or archive I/O failed |

/// Process exit code.
///
/// ```rust
/// use gwbundle_utils::ExitCode;
///
/// assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
/// assert_eq!(ExitCode::from_i32(0), ExitCode::SUCCESS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - bundle archive written
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Interrupted - SIGINT received mid-run
    pub const INTERRUPTED: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Lock held - another bundle holds the staging area
    pub const LOCK_HELD: ExitCode = ExitCode(9);

    /// I/O failure (EX_IOERR)
    pub const IO_FAILURE: ExitCode = ExitCode(74);

    /// Get the numeric exit code value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERRUPTED.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
        assert_eq!(ExitCode::IO_FAILURE.as_i32(), 74);
    }

    #[test]
    fn test_exit_code_conversions() {
        let raw: i32 = ExitCode::LOCK_HELD.into();
        assert_eq!(raw, 9);
        assert_eq!(ExitCode::from(74), ExitCode::IO_FAILURE);
    }
}
