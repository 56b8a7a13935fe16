use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::fs;
use std::io;

use crate::FilterError;

/// Glob selection of regular files below a directory.
///
/// A pattern without `/` (e.g. `s3server.*`) matches file names directly in
/// the directory. A pattern with `/` (e.g. `**/addb_*/o/*`) is matched against
/// the path relative to the directory and the walk recurses. Results come back
/// in filesystem enumeration order.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    pattern: String,
    matcher: GlobMatcher,
    recursive: bool,
    exclude: Option<GlobSet>,
}

impl FileMatcher {
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
            recursive: pattern.contains('/'),
            exclude: None,
        })
    }

    /// Skip files whose name matches any of `patterns`.
    pub fn excluding<'a>(
        mut self,
        patterns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, FilterError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| FilterError::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: e.to_string(),
        })?;
        self.exclude = Some(set);
        Ok(self)
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when `relative` (a path below the search root) is selected.
    #[must_use]
    pub fn is_match(&self, relative: &Utf8Path) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(relative.file_name().unwrap_or_default()) {
                return false;
            }
        }
        self.matcher.is_match(relative.as_str())
    }

    /// Matching files below `root`. A missing root yields no files.
    pub fn find(&self, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, FilterError> {
        let mut found = Vec::new();
        self.walk(root, Utf8Path::new(""), &mut found)?;
        Ok(found)
    }

    fn walk(
        &self,
        root: &Utf8Path,
        relative_dir: &Utf8Path,
        found: &mut Vec<Utf8PathBuf>,
    ) -> Result<(), FilterError> {
        let dir = root.join(relative_dir);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FilterError::io(dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| FilterError::io(dir.clone(), e))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let relative = relative_dir.join(&name);
            let file_type = entry
                .file_type()
                .map_err(|e| FilterError::io(dir.join(&name), e))?;

            if file_type.is_dir() {
                if self.recursive {
                    self.walk(root, &relative, found)?;
                }
            } else if file_type.is_file() && self.is_match(&relative) {
                found.push(root.join(&relative));
            }
        }
        Ok(())
    }
}
