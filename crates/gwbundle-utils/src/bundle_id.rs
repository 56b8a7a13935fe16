//! Bundle identifier validation.
//!
//! The bundle id becomes part of the archive file name
//! (`<component>_<id>.tar.gz`), so it is restricted to characters that are
//! safe in a single path component.

use crate::error::BundleIdError;
use std::fmt;
use std::str::FromStr;

/// A validated bundle identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleId(String);

impl BundleId {
    /// Validate `raw` as a bundle id.
    ///
    /// Accepts ASCII alphanumerics, `.`, `-` and `_`. Rejects empty ids and any
    /// id containing `..`.
    pub fn parse(raw: &str) -> Result<Self, BundleIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BundleIdError::Empty);
        }
        if let Some(ch) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(BundleIdError::InvalidCharacter { ch });
        }
        if trimmed.contains("..") || trimmed == "." {
            return Err(BundleIdError::Traversal {
                id: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BundleId {
    type Err = BundleIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BundleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
