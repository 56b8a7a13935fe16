//! The bundle orchestrator.
//!
//! [`Collector::run`] stages every category in priority order against a
//! [`BudgetTracker`], archives the staging area and tears it down. Missing
//! sources and failing tools are logged and recorded in the
//! [`CollectionReport`]; only a missing log path or an I/O failure on the
//! staging area or archive ends the run with an error.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, NaiveDateTime};
use gwbundle_config::{ConfigStore, Settings, keys};
use gwbundle_runner::{NativeRunner, ProcessRunner};
use gwbundle_utils::error::ConfigError;
use gwbundle_utils::logging::{bundle_span, category_span};
use gwbundle_utils::paths::{copy_dir_all, copy_into};
use gwbundle_utils::{ByteSize, GwBundleError};
use std::fs;
use tracing::{debug, info, warn};

use crate::adapters::{self, Copied};
use crate::archive::archive;
use crate::budget::BudgetTracker;
use crate::category::{CategoryKind, CategorySet};
use crate::plan::{Plan, Target};
use crate::report::CollectionReport;
use crate::request::BundleRequest;
use crate::selection::{latest_n, prefix_within};
use crate::staging::StagingArea;
use crate::tools::{
    OnDegraded, ProcessLookup, Rendered, Rendering, SystemProcessLookup, ToolOutcome, Tools,
    render,
};

/// Where a run reads from, resolved from the cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    /// Service log directory
    pub log_dir: Utf8PathBuf,
    /// Trace and addb directory
    pub trace_dir: Utf8PathBuf,
    /// Service configuration file, when the config path is known
    pub config_file: Option<Utf8PathBuf>,
}

/// A finished bundle.
#[derive(Debug, Clone)]
pub struct BundleOutcome {
    pub archive: Utf8PathBuf,
    pub report: CollectionReport,
}

pub struct Collector {
    request: BundleRequest,
    settings: Settings,
    store: Box<dyn ConfigStore>,
    runner: Box<dyn ProcessRunner>,
    lookup: Box<dyn ProcessLookup>,
    now: Option<NaiveDateTime>,
}

impl Collector {
    pub fn new(request: BundleRequest, settings: Settings, store: Box<dyn ConfigStore>) -> Self {
        Self {
            request,
            settings,
            store,
            runner: Box::new(NativeRunner),
            lookup: Box::new(SystemProcessLookup),
            now: None,
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_process_lookup(mut self, lookup: Box<dyn ProcessLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Pin "now" for the time window (local wall-clock time by default).
    #[must_use]
    pub fn with_clock(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Resolve source locations from the cluster configuration.
    ///
    /// The log path is required. Logs live under `<log>/s3/<machine-id>` on
    /// nodes that have such a directory, else under `<log>/s3`.
    pub fn resolve_sources(&self) -> Result<Sources, GwBundleError> {
        let paths = &self.settings.paths;
        let log_base = self
            .store
            .get(keys::LOG_PATH)
            .map(Utf8PathBuf::from)
            .ok_or_else(|| ConfigError::MissingRequired(keys::LOG_PATH.to_string()))?;

        let service_logs = log_base.join(&paths.log_subdir);
        let log_dir = fs::read_to_string(&paths.machine_id_file)
            .ok()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(|id| service_logs.join(id))
            .filter(|dir| dir.is_dir())
            .unwrap_or(service_logs);

        let config_file = match self.store.get(keys::CONFIG_PATH) {
            Some(base) => Some(Utf8PathBuf::from(base).join(&paths.config_file)),
            None => {
                warn!(
                    key = keys::CONFIG_PATH,
                    "Config path not set; configuration file will be skipped"
                );
                None
            }
        };

        Ok(Sources {
            trace_dir: log_base.join(&paths.trace_subdir),
            log_dir,
            config_file,
        })
    }

    /// Collect, archive and clean up. Returns the archive path and a summary.
    pub fn run(&self) -> Result<BundleOutcome, GwBundleError> {
        let component = self.settings.component.as_str();
        let bundle_id = self.request.bundle_id().as_str();
        let _span = bundle_span(bundle_id, component).entered();

        let categories = CategorySet::from_settings(&self.settings)?;
        let sources = self.resolve_sources()?;
        self.check_staging_dir(&sources)?;
        self.log_request(&sources);

        let mut staging = StagingArea::prepare(&self.settings.staging_dir, bundle_id)?;
        let tracker = BudgetTracker::new(staging.path(), self.request.size_limit());
        let mut report = CollectionReport {
            limit: tracker.limit().map(ByteSize::bytes),
            ..CollectionReport::default()
        };

        let run = Run {
            collector: self,
            staging: &staging,
            tracker: &tracker,
            categories: &categories,
            sources: &sources,
        };
        run.collect(&mut report)?;

        report.staged_bytes = tracker.used()?.bytes();
        let archive_path = archive(
            staging.path(),
            component,
            bundle_id,
            self.request.target(),
        )?;
        report.log();

        if let Err(e) = staging.teardown() {
            warn!(staging = %staging.path(), error = %e, "Failed to remove staging area");
        }

        Ok(BundleOutcome {
            archive: archive_path,
            report,
        })
    }

    /// `prepare` clears the staging directory, so it must not contain any
    /// source directory.
    fn check_staging_dir(&self, sources: &Sources) -> Result<(), GwBundleError> {
        let staging = &self.settings.staging_dir;
        for source in [&sources.log_dir, &sources.trace_dir] {
            if source.starts_with(staging) {
                return Err(ConfigError::InvalidValue {
                    key: "staging_dir".to_string(),
                    value: format!("{staging} contains source directory {source}"),
                }
                .into());
            }
        }
        Ok(())
    }

    fn log_request(&self, sources: &Sources) {
        let req = &self.request;
        info!(
            output_dir = %req.target(),
            duration = ?req.duration().map(|d| d.to_string()),
            size_limit = ?req.size_limit().map(|s| s.to_string()),
            coredumps = req.include_coredumps(),
            stacktrace = req.include_stacktrace(),
            log_dir = %sources.log_dir,
            "Starting bundle collection"
        );
        // Accepted for compatibility; they do not change what is collected.
        if req.include_binlogs() || req.services().is_some() || req.modules().is_some() {
            debug!(
                binlogs = req.include_binlogs(),
                services = ?req.services(),
                modules = ?req.modules(),
                "Informational options recorded"
            );
        }
    }

    fn file_names(&self) -> (String, String) {
        let process = &self.settings.service_process;
        let config = self
            .settings
            .paths
            .config_file
            .file_name()
            .unwrap_or("config.yaml")
            .to_string();
        (config, format!("{process}_rpm_manifest.txt"))
    }
}

/// State shared by the steps of one run.
struct Run<'a> {
    collector: &'a Collector,
    staging: &'a StagingArea,
    tracker: &'a BudgetTracker,
    categories: &'a CategorySet,
    sources: &'a Sources,
}

impl Run<'_> {
    fn collect(&self, report: &mut CollectionReport) -> Result<(), GwBundleError> {
        let settings = &self.collector.settings;
        let tools = Tools::new(
            self.collector.runner.as_ref(),
            &settings.tools,
            settings.tool_timeout(),
        );

        self.config_file(report)?;
        self.rpm_manifest(&tools, report)?;
        self.logs_by_time(report)?;
        self.logs_by_size(report)?;
        self.trace_dumps(report)?;
        self.diagnostic_dumps(&tools, report)?;
        self.stack_trace(&tools, report)?;
        self.crash_dumps(report)?;
        Ok(())
    }

    fn dest(&self) -> &Utf8Path {
        self.staging.path()
    }

    fn config_file(&self, report: &mut CollectionReport) -> Result<(), GwBundleError> {
        let _span = category_span(CategoryKind::Config.as_str()).entered();
        let Some(file) = self.sources.config_file.as_ref() else {
            report.skipped(CategoryKind::Config, "config path not set");
            return Ok(());
        };
        if !file.is_file() {
            warn!(file = %file, "Configuration file not found; skipping");
            report.skipped(CategoryKind::Config, format!("{file} not found"));
            return Ok(());
        }
        let size = fs::metadata(file)?.len();
        copy_into(file, self.dest())?;
        report.included(CategoryKind::Config, 1, size);
        Ok(())
    }

    fn rpm_manifest(
        &self,
        tools: &Tools<'_>,
        report: &mut CollectionReport,
    ) -> Result<(), GwBundleError> {
        let _span = category_span(CategoryKind::RpmManifest.as_str()).entered();
        let (_, manifest) = self.collector.file_names();
        match render(
            &tools.rpm_manifest(),
            &self.dest().join(manifest),
            OnDegraded::Skip,
            "rpm",
        )? {
            Rendered::Output(bytes) => report.included(CategoryKind::RpmManifest, 1, bytes),
            Rendered::Note(bytes) => report.degraded(CategoryKind::RpmManifest, "no output", bytes),
            Rendered::Skipped(reason) => report.degraded(CategoryKind::RpmManifest, reason, 0),
        }
        Ok(())
    }

    fn logs_by_time(&self, report: &mut CollectionReport) -> Result<(), GwBundleError> {
        let Some(period) = self.collector.request.duration() else {
            report.skipped(CategoryKind::LogsByTime, "no duration requested");
            return Ok(());
        };
        let _span = category_span(CategoryKind::LogsByTime.as_str()).entered();
        if !self.sources.log_dir.is_dir() {
            warn!(dir = %self.sources.log_dir, "Log directory not found; skipping logs");
            report.skipped(CategoryKind::LogsByTime, "log directory not found");
            return Ok(());
        }

        let now = self
            .collector
            .now
            .unwrap_or_else(|| Local::now().naive_local());
        let results = adapters::time_window(
            self.dest(),
            &self.sources.log_dir,
            self.categories.logs(),
            period,
            now,
        )?;
        for (_, copied) in results {
            report.included(CategoryKind::LogsByTime, copied.files, copied.bytes);
        }
        Ok(())
    }

    fn logs_by_size(&self, report: &mut CollectionReport) -> Result<(), GwBundleError> {
        let request = &self.collector.request;
        let outcomes = match (self.tracker.limit(), request.duration()) {
            (Some(limit), duration) => {
                let _span = category_span(CategoryKind::LogsBySize.as_str()).entered();
                // The working set must outlive the plan that reads from it.
                let work = tempfile::Builder::new().prefix("gwbundle-work").tempdir()?;
                let working_set = if duration.is_some() {
                    let dir = gwbundle_utils::paths::utf8(work.path().to_path_buf())?;
                    let (config, manifest) = self.collector.file_names();
                    self.staging
                        .relocate_except(&[config.as_str(), manifest.as_str()], &dir)?;
                    dir
                } else {
                    self.sources.log_dir.clone()
                };

                let needed = self.working_set_size(&working_set)?;
                let remaining = self.tracker.remaining()?.unwrap_or(limit);
                let fits = needed <= remaining.bytes();
                info!(
                    working_set = %working_set,
                    needed = %ByteSize::from_bytes(needed),
                    remaining = %remaining,
                    fits,
                    "Allocating log budget"
                );
                let plan = Plan::size_limited(
                    fits,
                    &working_set,
                    &self.sources.log_dir,
                    self.collector.settings.override_percent,
                );
                let outcomes = plan.execute(self.categories, self.tracker, self.dest())?;
                drop(work);
                outcomes
            }
            (None, None) => {
                let _span = category_span(CategoryKind::LogsBySize.as_str()).entered();
                Plan::unbounded(&self.sources.log_dir).execute(
                    self.categories,
                    self.tracker,
                    self.dest(),
                )?
            }
            (None, Some(_)) => {
                report.skipped(CategoryKind::LogsBySize, "no size limit requested");
                return Ok(());
            }
        };

        for outcome in outcomes {
            match outcome.copied {
                Some(Copied { files, bytes }) => {
                    report.included(CategoryKind::LogsBySize, files, bytes);
                }
                None => {
                    let what = match outcome.target {
                        Target::Log(role) => role.as_str(),
                        Target::Compressed => "compressed",
                    };
                    report.skipped(
                        CategoryKind::LogsBySize,
                        format!("{what} logs: budget exhausted"),
                    );
                }
            }
        }
        Ok(())
    }

    /// Bytes the log patterns would need: matching logs in `working_set` plus
    /// compressed logs in the log directory.
    fn working_set_size(&self, working_set: &Utf8Path) -> Result<u64, GwBundleError> {
        let mut total = 0u64;
        for log in self.categories.logs() {
            for file in log.matcher.find(working_set)? {
                total = total.saturating_add(fs::metadata(&file)?.len());
            }
        }
        for file in self.categories.compressed.find(&self.sources.log_dir)? {
            total = total.saturating_add(fs::metadata(&file)?.len());
        }
        Ok(total)
    }

    fn trace_dumps(&self, report: &mut CollectionReport) -> Result<(), GwBundleError> {
        let _span = category_span(CategoryKind::TraceDumps.as_str()).entered();
        let root = &self.sources.trace_dir;
        if !root.is_dir() {
            warn!(dir = %root, "Trace directory not found; skipping trace files");
            report.skipped(CategoryKind::TraceDumps, "trace directory not found");
            return Ok(());
        }

        let files = self.categories.trace.find(root)?;
        let candidates = latest_n(&files, self.collector.settings.limits.trace_files);
        let dest = self.dest().join("m0trace");
        let copied = adapters::stage_latest_gated(&candidates, self.tracker, |c| {
            adapters::copy_relative(&c.path, root, &dest)
        })?;
        report.included(CategoryKind::TraceDumps, copied.files, copied.bytes);
        Ok(())
    }

    fn diagnostic_dumps(
        &self,
        tools: &Tools<'_>,
        report: &mut CollectionReport,
    ) -> Result<(), GwBundleError> {
        let _span = category_span(CategoryKind::DiagnosticDumps.as_str()).entered();
        let root = &self.sources.trace_dir;
        if !root.is_dir() {
            report.skipped(CategoryKind::DiagnosticDumps, "trace directory not found");
            return Ok(());
        }

        let files = self.categories.addb.find(root)?;
        let candidates = latest_n(&files, self.collector.settings.limits.addb_dumps);
        let dest = self.dest().join("addb");
        let tool = self.collector.settings.tools.addb_dump.as_str();
        let mut failures = 0usize;
        let mut copied = Copied::default();

        // Gate on the rendered text, which can be far larger than the record.
        for candidate in &candidates {
            let outcome = tools.addb_dump(&candidate.path);
            let rendering = Rendering::of(&outcome, OnDegraded::WriteNote, tool);
            if !self.tracker.fits(ByteSize::from_bytes(rendering.len()))? {
                info!(
                    file = %candidate.path,
                    rendered = rendering.len(),
                    "Diagnostic dump does not fit remaining budget; stopping"
                );
                break;
            }
            if matches!(outcome, ToolOutcome::Degraded(_)) {
                failures += 1;
            }
            let rel = candidate
                .path
                .strip_prefix(root)
                .unwrap_or(candidate.path.as_path());
            let name = format!("{}.txt", rel.as_str().replace('/', "_"));
            if let Rendered::Output(bytes) | Rendered::Note(bytes) =
                rendering.write(&dest.join(name))?
            {
                copied.files += 1;
                copied.bytes += bytes;
            }
        }

        if failures == 0 {
            report.included(CategoryKind::DiagnosticDumps, copied.files, copied.bytes);
        } else {
            report.degraded(
                CategoryKind::DiagnosticDumps,
                format!("{failures} of {} conversions failed", copied.files),
                copied.bytes,
            );
        }
        Ok(())
    }

    fn stack_trace(
        &self,
        tools: &Tools<'_>,
        report: &mut CollectionReport,
    ) -> Result<(), GwBundleError> {
        if !self.collector.request.include_stacktrace() {
            report.skipped(CategoryKind::StackTrace, "not requested");
            return Ok(());
        }
        let _span = category_span(CategoryKind::StackTrace.as_str()).entered();
        let process = &self.collector.settings.service_process;

        let outcome = match self.collector.lookup.pid_of(process) {
            Some(pid) => {
                debug!(process = %process, pid, "Capturing stack trace");
                tools.stack_trace(pid)
            }
            None => {
                warn!(process = %process, "Service is not running; no stack trace");
                ToolOutcome::Degraded(format!("{process} is not running"))
            }
        };

        let dest = self.dest().join(format!("{process}_pstack.txt"));
        match render(&outcome, &dest, OnDegraded::WriteNote, "gdb")? {
            Rendered::Output(bytes) => report.included(CategoryKind::StackTrace, 1, bytes),
            Rendered::Note(bytes) => {
                let reason = match outcome {
                    ToolOutcome::Degraded(reason) => reason,
                    ToolOutcome::Success(_) => "no output".to_string(),
                };
                report.degraded(CategoryKind::StackTrace, reason, bytes);
            }
            Rendered::Skipped(reason) => report.degraded(CategoryKind::StackTrace, reason, 0),
        }
        Ok(())
    }

    fn crash_dumps(&self, report: &mut CollectionReport) -> Result<(), GwBundleError> {
        if !self.collector.request.include_coredumps() {
            report.skipped(CategoryKind::CrashDumps, "not requested");
            return Ok(());
        }
        let _span = category_span(CategoryKind::CrashDumps.as_str()).entered();
        let crash_dir = &self.collector.settings.paths.crash_dir;
        if !crash_dir.is_dir() {
            warn!(dir = %crash_dir, "Crash directory not found; skipping crash dumps");
            report.skipped(CategoryKind::CrashDumps, "crash directory not found");
            return Ok(());
        }
        let dest = self.dest().join("coredumps");

        if self.tracker.is_unbounded() {
            copy_dir_all(crash_dir, &dest)?;
            let bytes = gwbundle_utils::paths::dir_size(&dest)?;
            let files = count_files(&dest)?;
            report.included(CategoryKind::CrashDumps, files, bytes);
            return Ok(());
        }

        let files = self.categories.crash.find(crash_dir)?;
        let candidates = latest_n(&files, self.collector.settings.limits.crash_dumps);
        let available = self.tracker.remaining()?.map(ByteSize::bytes);
        let chosen = prefix_within(&candidates, available);
        if chosen.len() < candidates.len() {
            info!(
                considered = candidates.len(),
                included = chosen.len(),
                available = ?available,
                "Crash dumps trimmed to fit remaining budget"
            );
        }

        let mut copied = Copied::default();
        for candidate in chosen {
            copy_into(&candidate.path, &dest)?;
            copied.files += 1;
            copied.bytes += candidate.size;
        }
        report.included(CategoryKind::CrashDumps, copied.files, copied.bytes);
        Ok(())
    }
}

fn count_files(dir: &Utf8Path) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            count += count_files(&gwbundle_utils::paths::utf8(entry.path())?)?;
        } else if file_type.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
