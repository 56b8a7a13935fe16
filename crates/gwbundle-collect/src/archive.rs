//! Packaging of the staging directory into the final `.tar.gz`.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use gwbundle_utils::GwBundleError;
use gwbundle_utils::paths::ensure_dir_all;
use tempfile::NamedTempFile;
use tracing::info;

/// Path of the archive for `bundle_id`: `<target>/<component>/<component>_<id>.tar.gz`.
#[must_use]
pub fn archive_path(target: &Utf8Path, component: &str, bundle_id: &str) -> Utf8PathBuf {
    target
        .join(component)
        .join(format!("{component}_{bundle_id}.tar.gz"))
}

/// Write the contents of `staging_dir` as a gzip-compressed tar under
/// `<target>/<component>/`, with every entry below a top-level `<component>/`.
///
/// The archive is written to a temporary file in the destination directory and
/// renamed into place, so a failed run never leaves a truncated archive.
pub fn archive(
    staging_dir: &Utf8Path,
    component: &str,
    bundle_id: &str,
    target: &Utf8Path,
) -> Result<Utf8PathBuf, GwBundleError> {
    let dest = archive_path(target, component, bundle_id);
    write_archive(staging_dir, component, &dest).map_err(|e| GwBundleError::ArchiveFailed {
        path: dest.to_string(),
        reason: format!("{e:#}"),
    })?;
    Ok(dest)
}

fn write_archive(staging_dir: &Utf8Path, component: &str, dest: &Utf8Path) -> Result<()> {
    let parent = dest
        .parent()
        .context("archive path has no parent directory")?;
    ensure_dir_all(parent).with_context(|| format!("failed to create {parent}"))?;

    let tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {parent}"))?;
    let encoder = GzEncoder::new(tmp.as_file(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(component, staging_dir)
        .with_context(|| format!("failed to add {staging_dir} to archive"))?;
    let encoder = builder.into_inner().context("failed to finish tar stream")?;
    encoder.finish().context("failed to finish gzip stream")?;
    tmp.as_file().sync_all().context("failed to sync archive")?;

    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to move archive into place at {dest}"))?;

    info!(archive = %dest, "Archive written");
    Ok(())
}
