use camino::Utf8PathBuf;
use gwbundle_utils::GwBundleError;
use std::io;
use thiserror::Error;

/// Log filter failures
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid timestamp format: {reason}")]
    InvalidFormat { reason: String },
}

impl FilterError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FilterError> for GwBundleError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Io { path, source } => GwBundleError::Filter {
                pattern: path.to_string(),
                reason: source.to_string(),
            },
            FilterError::InvalidPattern { pattern, reason } => {
                GwBundleError::Filter { pattern, reason }
            }
            FilterError::InvalidFormat { reason } => GwBundleError::Filter {
                pattern: "<timestamp>".to_string(),
                reason,
            },
        }
    }
}
