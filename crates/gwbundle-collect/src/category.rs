use gwbundle_config::Settings;
use gwbundle_logfilter::{Delimiter, FileMatcher, FilterError, TimestampFormat, TimestampParser};
use std::fmt;

/// File categories in collection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryKind {
    Config,
    RpmManifest,
    LogsByTime,
    LogsBySize,
    TraceDumps,
    DiagnosticDumps,
    StackTrace,
    CrashDumps,
}

impl CategoryKind {
    /// Every category, highest priority first.
    pub const ALL: [CategoryKind; 8] = [
        Self::Config,
        Self::RpmManifest,
        Self::LogsByTime,
        Self::LogsBySize,
        Self::TraceDumps,
        Self::DiagnosticDumps,
        Self::StackTrace,
        Self::CrashDumps,
    ];

    /// Position in the priority order, 0 first.
    #[must_use]
    pub fn rank(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::RpmManifest => "rpm-manifest",
            Self::LogsByTime => "service-logs-by-time",
            Self::LogsBySize => "service-logs-by-size",
            Self::TraceDumps => "trace-dumps",
            Self::DiagnosticDumps => "diagnostic-dumps",
            Self::StackTrace => "stack-trace",
            Self::CrashDumps => "crash-dumps",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the three service-log patterns a [`LogCategory`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogRole {
    /// `s3server.*`: granted the override share on overflow
    Primary,
    /// `s3server_*`
    Underscore,
    /// `haproxy*.log*`
    Gateway,
}

impl LogRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Underscore => "underscore",
            Self::Gateway => "gateway",
        }
    }
}

/// A service-log pattern with its timestamp format.
#[derive(Debug, Clone)]
pub struct LogCategory {
    pub role: LogRole,
    pub matcher: FileMatcher,
    pub format: TimestampFormat,
    pub parser: TimestampParser,
}

impl LogCategory {
    fn new(
        role: LogRole,
        matcher: FileMatcher,
        format: TimestampFormat,
    ) -> Result<Self, FilterError> {
        let parser = format.compile()?;
        Ok(Self {
            role,
            matcher,
            format,
            parser,
        })
    }
}

/// Every file-selection unit of a run, compiled once from [`Settings`].
#[derive(Debug, Clone)]
pub struct CategorySet {
    pub primary: LogCategory,
    pub underscore: LogCategory,
    pub gateway: LogCategory,
    pub compressed: FileMatcher,
    pub trace: FileMatcher,
    pub addb: FileMatcher,
    pub crash: FileMatcher,
}

impl CategorySet {
    pub fn from_settings(settings: &Settings) -> Result<Self, FilterError> {
        let p = &settings.patterns;
        let service_ts = TimestampFormat::new(&p.date_regex, &p.time_regex, Delimiter::Space);
        let gateway_ts = TimestampFormat::new(&p.date_regex, &p.time_regex, Delimiter::T);

        // Compressed service logs belong to their own category.
        let primary = FileMatcher::new(&p.primary_logs)?.excluding(["*.gz"])?;
        let underscore = FileMatcher::new(&p.underscore_logs)?.excluding(["*.gz"])?;

        Ok(Self {
            primary: LogCategory::new(LogRole::Primary, primary, service_ts.clone())?,
            underscore: LogCategory::new(LogRole::Underscore, underscore, service_ts)?,
            gateway: LogCategory::new(
                LogRole::Gateway,
                FileMatcher::new(&p.gateway_logs)?,
                gateway_ts,
            )?,
            compressed: FileMatcher::new(&p.compressed_logs)?,
            trace: FileMatcher::new(&p.trace_files)?,
            addb: FileMatcher::new(&p.addb_dumps)?,
            crash: FileMatcher::new(&p.crash_dumps)?,
        })
    }

    /// The three log patterns, primary first.
    #[must_use]
    pub fn logs(&self) -> [&LogCategory; 3] {
        [&self.primary, &self.underscore, &self.gateway]
    }

    #[must_use]
    pub fn log(&self, role: LogRole) -> &LogCategory {
        match role {
            LogRole::Primary => &self.primary,
            LogRole::Underscore => &self.underscore,
            LogRole::Gateway => &self.gateway,
        }
    }
}
