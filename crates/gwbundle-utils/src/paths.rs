//! Directory helpers used by staging, budgeting and the category adapters.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> io::Result<()> {
    match fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// rm -rf; a missing path is not an error.
pub fn remove_dir_all_if_exists<P: AsRef<std::path::Path>>(p: P) -> io::Result<()> {
    match fs::remove_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Sum of the sizes of all regular files under `dir`, recursively.
///
/// Symlinks are not followed. A missing directory has size zero; entries that
/// vanish mid-walk are skipped.
pub fn dir_size(dir: &Utf8Path) -> io::Result<u64> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut total: u64 = 0;
    for entry in entries {
        let entry = entry?;
        let meta = match entry.path().symlink_metadata() {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if meta.is_dir() {
            let child = utf8(entry.path())?;
            total = total.saturating_add(dir_size(&child)?);
        } else if meta.is_file() {
            total = total.saturating_add(meta.len());
        }
    }
    Ok(total)
}

/// Copy `src` into `dest_dir`, keeping its file name. Returns the new path.
pub fn copy_into(src: &Utf8Path, dest_dir: &Utf8Path) -> io::Result<Utf8PathBuf> {
    let name = src.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{src} has no file name"))
    })?;
    ensure_dir_all(dest_dir)?;
    let dest = dest_dir.join(name);
    fs::copy(src, &dest)?;
    Ok(dest)
}

/// Recursively copy the directory `src` to `dest`.
pub fn copy_dir_all(src: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    ensure_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = utf8(entry.path())?;
        let target = dest.join(path.file_name().unwrap_or_default());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_all(&path, &target)?;
        } else if file_type.is_file() {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

/// Move `src` to `dest`, falling back to copy + delete across filesystems.
pub fn move_file(src: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir_all(parent)?;
    }
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(src, dest)?;
            fs::remove_file(src)
        }
    }
}

/// Convert a std path to a UTF-8 path, mapping failure to `InvalidData`.
pub fn utf8(path: std::path::PathBuf) -> io::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|p| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("non UTF-8 path: {}", p.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_dir_size_is_recursive() {
        let temp = TempDir::new().unwrap();
        let dir = root(&temp);
        fs::write(dir.join("a"), vec![0u8; 100]).unwrap();
        ensure_dir_all(dir.join("nested/deeper")).unwrap();
        fs::write(dir.join("nested/deeper/b"), vec![0u8; 23]).unwrap();

        assert_eq!(dir_size(&dir).unwrap(), 123);
    }

    #[test]
    fn test_dir_size_of_missing_dir_is_zero() {
        let temp = TempDir::new().unwrap();
        assert_eq!(dir_size(&root(&temp).join("absent")).unwrap(), 0);
    }

    #[test]
    fn test_remove_dir_all_if_exists_tolerates_missing() {
        let temp = TempDir::new().unwrap();
        let dir = root(&temp).join("gone");
        remove_dir_all_if_exists(&dir).unwrap();
        ensure_dir_all(&dir).unwrap();
        remove_dir_all_if_exists(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_copy_into_and_move() {
        let temp = TempDir::new().unwrap();
        let dir = root(&temp);
        fs::write(dir.join("src.log"), "line\n").unwrap();

        let copied = copy_into(&dir.join("src.log"), &dir.join("out")).unwrap();
        assert_eq!(copied, dir.join("out/src.log"));
        assert_eq!(fs::read_to_string(&copied).unwrap(), "line\n");

        move_file(&copied, &dir.join("moved/src.log")).unwrap();
        assert!(!copied.exists());
        assert!(dir.join("moved/src.log").exists());
    }

    #[test]
    fn test_copy_dir_all() {
        let temp = TempDir::new().unwrap();
        let dir = root(&temp);
        ensure_dir_all(dir.join("crash/sub")).unwrap();
        fs::write(dir.join("crash/core.1"), "x").unwrap();
        fs::write(dir.join("crash/sub/core.2"), "yy").unwrap();

        copy_dir_all(&dir.join("crash"), &dir.join("copy")).unwrap();
        assert_eq!(dir_size(&dir.join("copy")).unwrap(), 3);
    }
}
