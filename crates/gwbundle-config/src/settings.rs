use camino::{Utf8Path, Utf8PathBuf};
use globset::Glob;
use gwbundle_utils::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

/// Default timeout for external tool invocations in seconds
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

/// Default share of the size limit granted to primary logs on overflow
pub const DEFAULT_OVERRIDE_PERCENT: u8 = 95;

/// Collection tunables.
///
/// Every field has a built-in default matching a standard storage-gateway
/// node; a TOML file passed with `--settings` overrides individual fields.
///
/// ```toml
/// staging_dir = "/var/tmp/s3_support_bundle"
///
/// [limits]
/// trace_files = 3
///
/// [tools]
/// gdb = "/opt/gdb/bin/gdb"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Component name: archive sub-directory and file-name prefix
    pub component: String,
    /// Process name used to find the PID for stack traces
    pub service_process: String,
    /// Staging directory owned by one run at a time
    pub staging_dir: Utf8PathBuf,
    /// Timeout applied to every external tool invocation
    pub tool_timeout_secs: u64,
    /// Percent of the size limit granted to primary logs when the working set overflows
    pub override_percent: u8,
    pub limits: LimitSettings,
    pub tools: ToolSettings,
    pub patterns: PatternSettings,
    pub paths: PathSettings,
}

/// Latest-N counts per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitSettings {
    pub trace_files: usize,
    pub addb_dumps: usize,
    pub crash_dumps: usize,
}

/// External tool programs, resolved on `PATH` unless absolute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub rpm: String,
    pub gdb: String,
    pub addb_dump: String,
}

/// File-selection globs per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternSettings {
    pub primary_logs: String,
    pub underscore_logs: String,
    pub gateway_logs: String,
    pub compressed_logs: String,
    pub trace_files: String,
    pub addb_dumps: String,
    pub crash_dumps: String,
    /// Timestamp date regex for service logs
    pub date_regex: String,
    /// Timestamp time regex for service logs
    pub time_regex: String,
}

/// Filesystem locations, relative ones resolved against the cluster's base paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Service config file, relative to the cluster config base path
    pub config_file: Utf8PathBuf,
    /// Service log directory, relative to the cluster log base path
    pub log_subdir: Utf8PathBuf,
    /// Trace and addb directory, relative to the cluster log base path
    pub trace_subdir: Utf8PathBuf,
    /// Crash dump directory (absolute)
    pub crash_dir: Utf8PathBuf,
    /// File holding the node's machine id
    pub machine_id_file: Utf8PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            component: "s3".to_string(),
            service_process: "s3server".to_string(),
            staging_dir: Utf8PathBuf::from("/tmp/s3_support_bundle"),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            override_percent: DEFAULT_OVERRIDE_PERCENT,
            limits: LimitSettings::default(),
            tools: ToolSettings::default(),
            patterns: PatternSettings::default(),
            paths: PathSettings::default(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            trace_files: 5,
            addb_dumps: 5,
            crash_dumps: 2,
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            rpm: "rpm".to_string(),
            gdb: "gdb".to_string(),
            addb_dump: "m0addb2dump".to_string(),
        }
    }
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            primary_logs: "s3server.*".to_string(),
            underscore_logs: "s3server_*".to_string(),
            gateway_logs: "haproxy*.log*".to_string(),
            compressed_logs: "s3server*.gz".to_string(),
            trace_files: "**/m0trace.*".to_string(),
            addb_dumps: "**/addb_*/o/*".to_string(),
            crash_dumps: "core-s3server.*".to_string(),
            date_regex: r"\d{4}-\d{2}-\d{2}".to_string(),
            time_regex: r"\d{2}:\d{2}:\d{2}".to_string(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            config_file: Utf8PathBuf::from("s3/conf/s3config.yaml"),
            log_subdir: Utf8PathBuf::from("s3"),
            trace_subdir: Utf8PathBuf::from("motr"),
            crash_dir: Utf8PathBuf::from("/var/log/crash"),
            machine_id_file: Utf8PathBuf::from("/etc/machine-id"),
        }
    }
}

impl Settings {
    /// Built-in defaults, overridden by `path` when given, then validated.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => ConfigError::NotFound {
                        path: path.to_string(),
                    },
                    _ => ConfigError::InvalidFile(format!("{path}: {e}")),
                })?;
                let parsed = Self::from_toml(&content)
                    .map_err(|e| ConfigError::InvalidFile(format!("{path}: {e}")))?;
                debug!(settings = %path, "Loaded settings override");
                parsed
            }
            None => Self::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML override without validating it.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check patterns compile and numeric limits are in range.
    ///
    /// All problems are collected so one run reports every bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.component.trim().is_empty() {
            errors.push("component must not be empty".to_string());
        }
        if self.service_process.trim().is_empty() {
            errors.push("service_process must not be empty".to_string());
        }
        if self.staging_dir.as_str().is_empty() || self.staging_dir.parent().is_none() {
            errors.push(format!(
                "staging_dir '{}' must be a directory below some parent",
                self.staging_dir
            ));
        }
        if self.tool_timeout_secs == 0 {
            errors.push("tool_timeout_secs must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.override_percent) {
            errors.push(format!(
                "override_percent must be between 1 and 100, got {}",
                self.override_percent
            ));
        }

        for (key, n) in [
            ("limits.trace_files", self.limits.trace_files),
            ("limits.addb_dumps", self.limits.addb_dumps),
            ("limits.crash_dumps", self.limits.crash_dumps),
        ] {
            if n == 0 {
                errors.push(format!("{key} must be at least 1"));
            }
        }

        for (key, tool) in [
            ("tools.rpm", &self.tools.rpm),
            ("tools.gdb", &self.tools.gdb),
            ("tools.addb_dump", &self.tools.addb_dump),
        ] {
            if tool.trim().is_empty() {
                errors.push(format!("{key} must not be empty"));
            }
        }

        let p = &self.patterns;
        for (key, pattern) in [
            ("patterns.primary_logs", &p.primary_logs),
            ("patterns.underscore_logs", &p.underscore_logs),
            ("patterns.gateway_logs", &p.gateway_logs),
            ("patterns.compressed_logs", &p.compressed_logs),
            ("patterns.trace_files", &p.trace_files),
            ("patterns.addb_dumps", &p.addb_dumps),
            ("patterns.crash_dumps", &p.crash_dumps),
        ] {
            if let Err(e) = Glob::new(pattern) {
                errors.push(format!("{key} '{pattern}' is not a valid glob: {e}"));
            }
        }
        for (key, pattern) in [
            ("patterns.date_regex", &p.date_regex),
            ("patterns.time_regex", &p.time_regex),
        ] {
            if let Err(e) = Regex::new(pattern) {
                errors.push(format!("{key} is not a valid regex: {e}"));
            }
        }

        if self.paths.crash_dir.is_relative() {
            errors.push(format!(
                "paths.crash_dir '{}' must be absolute",
                self.paths.crash_dir
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                error_count: errors.len(),
                errors,
            })
        }
    }

    #[must_use]
    pub fn tool_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tool_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.component, "s3");
        assert_eq!(settings.limits.trace_files, 5);
        assert_eq!(settings.limits.addb_dumps, 5);
        assert_eq!(settings.limits.crash_dumps, 2);
        assert_eq!(settings.override_percent, 95);
        assert_eq!(settings.tool_timeout().as_secs(), 120);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let settings = Settings::from_toml(
            r#"
staging_dir = "/var/tmp/bundle"

[limits]
trace_files = 3

[tools]
gdb = "/opt/gdb/bin/gdb"
"#,
        )
        .unwrap();

        assert_eq!(settings.staging_dir, Utf8PathBuf::from("/var/tmp/bundle"));
        assert_eq!(settings.limits.trace_files, 3);
        assert_eq!(settings.limits.crash_dumps, 2);
        assert_eq!(settings.tools.gdb, "/opt/gdb/bin/gdb");
        assert_eq!(settings.tools.rpm, "rpm");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(Settings::from_toml("stagin_dir = \"/tmp/x\"").is_err());
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut settings = Settings::default();
        settings.override_percent = 0;
        settings.limits.crash_dumps = 0;
        settings.patterns.trace_files = "**/m0trace.[".to_string();

        match settings.validate().unwrap_err() {
            ConfigError::ValidationFailed {
                errors,
                error_count,
            } => {
                assert_eq!(error_count, 3);
                assert!(errors.iter().any(|e| e.contains("override_percent")));
                assert!(errors.iter().any(|e| e.contains("limits.crash_dumps")));
                assert!(errors.iter().any(|e| e.contains("patterns.trace_files")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_percent_over_100_rejected() {
        let mut settings = Settings::default();
        settings.override_percent = 101;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("gwbundle.toml")).unwrap();
        fs::write(&path, "override_percent = 90\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.override_percent, 90);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Some(Utf8Path::new("/no/such/gwbundle.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("gwbundle.toml")).unwrap();
        fs::write(&path, "override_percent = \"lots\"\n").unwrap();

        assert!(matches!(
            Settings::load(Some(&path)).unwrap_err(),
            ConfigError::InvalidFile(_)
        ));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }
}
