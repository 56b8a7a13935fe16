//! Shared fixtures for the integration tests: a fake node filesystem laid out
//! the way a storage-gateway node is, under one temporary directory.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use gwbundle::{BundleId, BundleRequest, Collector, Settings, StaticConfigStore};
use gwbundle_collect::FixedProcessLookup;
use gwbundle_collect::test_support::ScriptedRunner;
use gwbundle_config::keys;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use tempfile::TempDir;

pub const MIB: u64 = 1024 * 1024;

pub struct Node {
    _temp: TempDir,
    pub root: Utf8PathBuf,
}

impl Node {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("log/s3")).unwrap();
        Self { _temp: temp, root }
    }

    pub fn log_base(&self) -> Utf8PathBuf {
        self.root.join("log")
    }

    pub fn log_dir(&self) -> Utf8PathBuf {
        self.root.join("log/s3")
    }

    pub fn trace_dir(&self) -> Utf8PathBuf {
        self.root.join("log/motr")
    }

    pub fn config_base(&self) -> Utf8PathBuf {
        self.root.join("etc")
    }

    pub fn crash_dir(&self) -> Utf8PathBuf {
        self.root.join("crash")
    }

    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.root.join("staging/s3_support_bundle")
    }

    pub fn target(&self) -> Utf8PathBuf {
        self.root.join("out")
    }

    /// Settings pointing every node path into the fixture.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.staging_dir = self.staging_dir();
        settings.paths.crash_dir = self.crash_dir();
        settings.paths.machine_id_file = self.root.join("machine-id");
        settings
    }

    pub fn store(&self) -> StaticConfigStore {
        StaticConfigStore::new()
            .with(keys::LOG_PATH, self.log_base().as_str())
            .with(keys::CONFIG_PATH, self.config_base().as_str())
    }

    /// Write `s3config.yaml` of exactly `len` bytes.
    pub fn write_config(&self, len: u64) {
        write_sized(&self.config_base().join("s3/conf/s3config.yaml"), len);
    }

    /// A cluster config file naming this node's paths.
    pub fn write_cluster_conf(&self) -> Utf8PathBuf {
        let path = self.root.join("cluster.conf");
        fs::write(
            &path,
            format!(
                "cortx:\n  common:\n    storage:\n      log: {}\n      config: {}\n",
                self.log_base(),
                self.config_base()
            ),
        )
        .unwrap();
        path
    }

    /// Settings TOML for the CLI pointing at this fixture.
    pub fn write_settings_toml(&self) -> Utf8PathBuf {
        let path = self.root.join("settings.toml");
        fs::write(
            &path,
            format!(
                "staging_dir = \"{}\"\n\n[paths]\ncrash_dir = \"{}\"\nmachine_id_file = \"{}\"\n",
                self.staging_dir(),
                self.crash_dir(),
                self.root.join("machine-id")
            ),
        )
        .unwrap();
        path
    }

    pub fn collector(&self, request: BundleRequest, runner: ScriptedRunner) -> Collector {
        Collector::new(request, self.settings(), Box::new(self.store()))
            .with_runner(Box::new(runner))
            .with_process_lookup(Box::new(FixedProcessLookup(None)))
    }

    pub fn request(&self, id: &str) -> gwbundle_collect::BundleRequestBuilder {
        BundleRequest::builder(BundleId::parse(id).unwrap(), self.target())
    }
}

/// Write `len` bytes as 100-byte lines.
pub fn write_sized(path: &Utf8Path, len: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let line = format!("{}\n", "x".repeat(99));
    let mut content = line.repeat((len / 100) as usize);
    content.push_str(&"y".repeat((len % 100) as usize));
    fs::write(path, content).unwrap();
}

/// Entry name to uncompressed size for every regular file in `archive`.
pub fn archive_entries(archive: &Utf8Path) -> BTreeMap<String, u64> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
    let mut entries = BTreeMap::new();
    for entry in tar.entries().unwrap() {
        let entry = entry.unwrap();
        if entry.header().entry_type().is_file() {
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            entries.insert(name, entry.header().size().unwrap());
        }
    }
    entries
}

/// Contents of one archive entry as text.
pub fn archive_text(archive: &Utf8Path, name: &str) -> Option<String> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
    for entry in tar.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap().to_string_lossy() == name {
            let mut text = String::new();
            entry.read_to_string(&mut text).unwrap();
            return Some(text);
        }
    }
    None
}
