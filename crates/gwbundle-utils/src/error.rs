use std::fmt;
use std::io;
use thiserror::Error;

pub use gwbundle_lock::LockError;
pub use gwbundle_runner::RunnerError;

use crate::units::UnitParseError;

/// Library-level error type with rich context and user-friendly reporting.
///
/// Every fallible operation that can end a bundle run surfaces one of these.
/// Per-category degradations (a missing tool, an absent log directory) are
/// *not* errors: the collector logs and records them instead.
///
/// # Exit Code Mapping
///
/// | Variant | Exit code |
/// |---------|-----------|
/// | `Config`, `BundleId` | 2 |
/// | `Lock(BundleInProgress)` | 9 |
/// | `Interrupted` | 1 |
/// | everything else | 74 |
#[derive(Error, Debug)]
pub enum GwBundleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid bundle id: {0}")]
    BundleId(#[from] BundleIdError),

    #[error("Staging lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Tool execution error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Staging area {path}: {reason}")]
    Staging { path: String, reason: String },

    #[error("Log filter failed for {pattern}: {reason}")]
    Filter { pattern: String, reason: String },

    #[error("Failed to write archive {path}: {reason}")]
    ArchiveFailed { path: String, reason: String },

    #[error("Interrupted by user")]
    Interrupted,
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    FileSystem,
    ExternalTool,
    Concurrency,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::FileSystem => write!(f, "File System"),
            Self::ExternalTool => write!(f, "External Tool"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Unsupported configuration URI '{uri}'")]
    UnsupportedScheme { uri: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl ConfigError {
    /// Wrap a unit parse failure as an invalid value for `key`.
    #[must_use]
    pub fn from_unit(key: &str, err: UnitParseError) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: err.to_string(),
        }
    }
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("Configuration file could not be parsed: {msg}"),
            Self::MissingRequired(key) => {
                format!("Required configuration value '{key}' is not set")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration value for '{key}' is invalid: {value}")
            }
            Self::NotFound { path } => format!("Configuration file does not exist: {path}"),
            Self::UnsupportedScheme { uri } => {
                format!("Cluster configuration URI '{uri}' uses an unsupported scheme")
            }
            Self::ValidationFailed { errors, .. } => {
                format!("Settings failed validation: {}", errors.join("; "))
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::MissingRequired(_) => Some(
                "The log and configuration base paths are read from the cluster configuration store before any files are collected.".to_string(),
            ),
            Self::UnsupportedScheme { .. } => Some(
                "Cluster configuration is addressed as <format>://<path>, for example yaml:///etc/cortx/cluster.conf.".to_string(),
            ),
            Self::ValidationFailed { .. } => Some(
                "Settings come from built-in defaults, optionally overridden by the file passed with --settings.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the file for syntax errors".to_string(),
                "Make sure the scheme in the URI matches the file format".to_string(),
            ],
            Self::MissingRequired(key) => vec![
                format!("Add '{key}' to the cluster configuration"),
                "Point --config at the node's cluster.conf".to_string(),
            ],
            Self::InvalidValue { key, .. } => vec![format!("Correct the value passed for '{key}'")],
            Self::NotFound { .. } => vec![
                "Verify the path passed with --config or --settings".to_string(),
            ],
            Self::UnsupportedScheme { .. } => vec![
                "Use one of yaml://, json:// or toml://".to_string(),
            ],
            Self::ValidationFailed { .. } => vec![
                "Fix the listed settings or remove them to fall back to defaults".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Error type for bundle id validation failures
#[derive(Debug, Error)]
pub enum BundleIdError {
    #[error("Bundle id is empty")]
    Empty,

    #[error("Bundle id contains invalid character '{ch}'")]
    InvalidCharacter { ch: char },

    #[error("Bundle id '{id}' contains a relative path component")]
    Traversal { id: String },
}

impl UserFriendlyError for BundleIdError {
    fn user_message(&self) -> String {
        match self {
            Self::Empty => "The bundle id is empty".to_string(),
            Self::InvalidCharacter { ch } => {
                format!("The bundle id contains the character '{ch}', which is not allowed")
            }
            Self::Traversal { id } => {
                format!("The bundle id '{id}' would escape the output directory")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some("The bundle id is used in the archive file name. Only ASCII alphanumerics, dots (.), dashes (-) and underscores (_) are allowed.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Pass an id such as SB-20260101 or node1_bundle".to_string(),
            "Avoid slashes, spaces and '..'".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

impl UserFriendlyError for LockError {
    fn user_message(&self) -> String {
        match self {
            Self::BundleInProgress {
                bundle_id,
                pid,
                created_ago,
            } => format!(
                "Another support bundle ('{bundle_id}', PID {pid}, started {created_ago} ago) is being generated on this node"
            ),
            Self::AcquisitionFailed { path, reason } => {
                format!("Could not take the staging lock at {path}: {reason}")
            }
            Self::Io(e) => format!("File system error during lock operation: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::BundleInProgress { .. } => Some(
                "Only one bundle can use the staging area at a time.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::BundleInProgress { .. } => vec![
                "Wait for the running bundle to finish and retry".to_string(),
            ],
            _ => vec!["Check permissions on the staging directory's parent".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::BundleInProgress { .. } => ErrorCategory::Concurrency,
            _ => ErrorCategory::FileSystem,
        }
    }
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProgramNotFound { program } => {
                vec![format!("Install '{program}' or add it to PATH")]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::ExternalTool
    }
}

impl UserFriendlyError for GwBundleError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::BundleId(e) => e.user_message(),
            Self::Lock(e) => e.user_message(),
            Self::Runner(e) => e.user_message(),
            Self::Io(e) => format!("File system error: {e}"),
            Self::Staging { path, reason } => {
                format!("Could not prepare the staging area {path}: {reason}")
            }
            Self::Filter { pattern, reason } => {
                format!("Could not filter logs matching '{pattern}': {reason}")
            }
            Self::ArchiveFailed { path, reason } => {
                format!("Could not write the bundle archive {path}: {reason}")
            }
            Self::Interrupted => {
                "Interrupted; the bundle was not completed and partial output may remain".to_string()
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::BundleId(e) => e.context(),
            Self::Lock(e) => e.context(),
            Self::Runner(e) => e.context(),
            Self::ArchiveFailed { .. } => Some(
                "The archive is written to <target>/<component>/<component>_<bundle-id>.tar.gz.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::BundleId(e) => e.suggestions(),
            Self::Lock(e) => e.suggestions(),
            Self::Runner(e) => e.suggestions(),
            Self::Io(_) | Self::Staging { .. } | Self::ArchiveFailed { .. } => vec![
                "Check free space and permissions on the target and staging directories"
                    .to_string(),
            ],
            Self::Filter { .. } => vec!["Check that the log files are readable".to_string()],
            Self::Interrupted => {
                vec!["Re-run the command to generate a complete bundle".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::BundleId(e) => e.category(),
            Self::Lock(e) => e.category(),
            Self::Runner(e) => e.category(),
            Self::Interrupted => ErrorCategory::Concurrency,
            _ => ErrorCategory::FileSystem,
        }
    }
}

impl GwBundleError {
    /// Render the error, its context and suggestions for the terminal.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the process exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            GwBundleError::Config(_) | GwBundleError::BundleId(_) => ExitCode::CLI_ARGS,
            GwBundleError::Lock(LockError::BundleInProgress { .. }) => ExitCode::LOCK_HELD,
            GwBundleError::Interrupted => ExitCode::INTERRUPTED,
            GwBundleError::Lock(_)
            | GwBundleError::Runner(_)
            | GwBundleError::Io(_)
            | GwBundleError::Staging { .. }
            | GwBundleError::Filter { .. }
            | GwBundleError::ArchiveFailed { .. } => ExitCode::IO_FAILURE,
        }
    }
}
