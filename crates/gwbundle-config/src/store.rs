use camino::{Utf8Path, Utf8PathBuf};
use gwbundle_utils::error::ConfigError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::str::FromStr;
use tracing::debug;

/// Key paths read from the cluster configuration.
pub mod keys {
    /// Base directory under which service logs live.
    pub const LOG_PATH: &str = "cortx>common>storage>log";
    /// Base directory under which service configuration lives.
    pub const CONFIG_PATH: &str = "cortx>common>storage>config";
}

/// String key to value lookups against the cluster configuration.
///
/// Keys are `>`-separated paths into a nested document; numeric segments index
/// into lists.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<String>;
}

/// Serialization format of a cluster configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_extension(path: &Utf8Path) -> Option<Self> {
        match path.extension()? {
            "yaml" | "yml" | "conf" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
            Self::Toml => write!(f, "toml"),
        }
    }
}

/// Cluster configuration loaded from a `<format>://<path>` URI.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    source: Utf8PathBuf,
    format: ConfigFormat,
    root: Value,
}

impl ClusterConfig {
    /// Split a URI into format and path.
    ///
    /// `yaml:///etc/cortx/cluster.conf` yields `(Yaml, /etc/cortx/cluster.conf)`.
    /// A bare path is accepted when its extension names a known format.
    pub fn parse_uri(uri: &str) -> Result<(ConfigFormat, Utf8PathBuf), ConfigError> {
        let unsupported = || ConfigError::UnsupportedScheme {
            uri: uri.to_string(),
        };

        match uri.split_once("://") {
            Some((scheme, path)) => {
                let format = scheme.parse::<ConfigFormat>().map_err(|()| unsupported())?;
                if path.is_empty() {
                    return Err(unsupported());
                }
                Ok((format, Utf8PathBuf::from(path)))
            }
            None => {
                let path = Utf8PathBuf::from(uri);
                let format = ConfigFormat::from_extension(&path).ok_or_else(unsupported)?;
                Ok((format, path))
            }
        }
    }

    /// Load the configuration document named by `uri`.
    pub fn load(uri: &str) -> Result<Self, ConfigError> {
        let (format, source) = Self::parse_uri(uri)?;
        let content = fs::read_to_string(&source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound {
                path: source.to_string(),
            },
            _ => ConfigError::InvalidFile(format!("{source}: {e}")),
        })?;

        let root = Self::parse_document(format, &content)
            .map_err(|reason| ConfigError::InvalidFile(format!("{source}: {reason}")))?;
        debug!(source = %source, format = %format, "Loaded cluster configuration");

        Ok(Self {
            source,
            format,
            root,
        })
    }

    /// Build from an in-memory document, mainly for embedding and tests.
    pub fn from_document(format: ConfigFormat, content: &str) -> Result<Self, ConfigError> {
        let root = Self::parse_document(format, content).map_err(ConfigError::InvalidFile)?;
        Ok(Self {
            source: Utf8PathBuf::from("<memory>"),
            format,
            root,
        })
    }

    fn parse_document(format: ConfigFormat, content: &str) -> Result<Value, String> {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    #[must_use]
    pub const fn format(&self) -> ConfigFormat {
        self.format
    }
}

impl ConfigStore for ClusterConfig {
    fn get(&self, key: &str) -> Option<String> {
        let mut node = &self.root;
        for segment in key.split('>').map(str::trim) {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match node {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Object(_) | Value::Array(_) => None,
        }
    }
}

/// Flat key/value store for callers that already hold the values.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigStore {
    values: BTreeMap<String, String>,
}

impl StaticConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigStore for StaticConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
