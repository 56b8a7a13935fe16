use camino::Utf8PathBuf;
use gwbundle_utils::{BundleId, ByteSize, Period};

/// Everything a caller asks of one bundle run.
///
/// Built once through [`BundleRequest::builder`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    bundle_id: BundleId,
    target: Utf8PathBuf,
    config_uri: String,
    duration: Option<Period>,
    size_limit: Option<ByteSize>,
    include_coredumps: bool,
    include_stacktrace: bool,
    include_binlogs: bool,
    services: Option<String>,
    modules: Option<String>,
}

impl BundleRequest {
    #[must_use]
    pub fn builder(bundle_id: BundleId, target: impl Into<Utf8PathBuf>) -> BundleRequestBuilder {
        BundleRequestBuilder {
            request: Self {
                bundle_id,
                target: target.into(),
                config_uri: String::new(),
                duration: None,
                size_limit: None,
                include_coredumps: false,
                include_stacktrace: false,
                include_binlogs: false,
                services: None,
                modules: None,
            },
        }
    }

    #[must_use]
    pub const fn bundle_id(&self) -> &BundleId {
        &self.bundle_id
    }

    #[must_use]
    pub fn target(&self) -> &camino::Utf8Path {
        &self.target
    }

    #[must_use]
    pub fn config_uri(&self) -> &str {
        &self.config_uri
    }

    #[must_use]
    pub const fn duration(&self) -> Option<Period> {
        self.duration
    }

    /// `None` means unbounded; a zero limit is normalized to `None`.
    #[must_use]
    pub const fn size_limit(&self) -> Option<ByteSize> {
        self.size_limit
    }

    #[must_use]
    pub const fn include_coredumps(&self) -> bool {
        self.include_coredumps
    }

    #[must_use]
    pub const fn include_stacktrace(&self) -> bool {
        self.include_stacktrace
    }

    #[must_use]
    pub const fn include_binlogs(&self) -> bool {
        self.include_binlogs
    }

    #[must_use]
    pub fn services(&self) -> Option<&str> {
        self.services.as_deref()
    }

    #[must_use]
    pub fn modules(&self) -> Option<&str> {
        self.modules.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct BundleRequestBuilder {
    request: BundleRequest,
}

impl BundleRequestBuilder {
    #[must_use]
    pub fn config_uri(mut self, uri: impl Into<String>) -> Self {
        self.request.config_uri = uri.into();
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Option<Period>) -> Self {
        self.request.duration = duration;
        self
    }

    #[must_use]
    pub fn size_limit(mut self, limit: Option<ByteSize>) -> Self {
        self.request.size_limit = limit.filter(|l| !l.is_unbounded());
        self
    }

    #[must_use]
    pub fn coredumps(mut self, on: bool) -> Self {
        self.request.include_coredumps = on;
        self
    }

    #[must_use]
    pub fn stacktrace(mut self, on: bool) -> Self {
        self.request.include_stacktrace = on;
        self
    }

    #[must_use]
    pub fn binlogs(mut self, on: bool) -> Self {
        self.request.include_binlogs = on;
        self
    }

    /// Turn on coredumps, stack trace and binlogs together.
    #[must_use]
    pub fn all(self) -> Self {
        self.coredumps(true).stacktrace(true).binlogs(true)
    }

    #[must_use]
    pub fn services(mut self, services: Option<String>) -> Self {
        self.request.services = services;
        self
    }

    #[must_use]
    pub fn modules(mut self, modules: Option<String>) -> Self {
        self.request.modules = modules;
        self
    }

    #[must_use]
    pub fn build(self) -> BundleRequest {
        self.request
    }
}
