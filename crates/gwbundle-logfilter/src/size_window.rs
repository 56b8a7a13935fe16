use camino::{Utf8Path, Utf8PathBuf};
use gwbundle_utils::ByteSize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Read, Write};
use std::time::SystemTime;
use tracing::debug;

use crate::reader::{logical_len, open_log, output_name};
use crate::{FileMatcher, FilterError, FilterStats};

/// Copy files matched under `src_dir` into `dest_dir`, newest first, until
/// `budget` bytes have been written.
///
/// Files that fit are copied whole. The first file that does not fit is cut
/// down to its newest complete lines within what is left, and the walk stops
/// there. Never writes more than `budget` bytes in total.
pub fn limit_size(
    src_dir: &Utf8Path,
    matcher: &FileMatcher,
    dest_dir: &Utf8Path,
    budget: ByteSize,
) -> Result<FilterStats, FilterError> {
    let mut candidates = newest_first(matcher.find(src_dir)?);
    let mut remaining = budget.bytes();
    let mut stats = FilterStats::default();

    for src in candidates.drain(..) {
        if remaining == 0 {
            break;
        }
        stats.files_seen += 1;

        let len = logical_len(&src).map_err(|e| FilterError::io(&src, e))?;
        let dest = dest_dir.join(output_name(&src));
        let written = if len <= remaining {
            copy_tail(&src, &dest, 0, len)?
        } else {
            copy_tail(&src, &dest, len - remaining, remaining)?
        };

        if written > 0 {
            stats.files_written += 1;
            stats.bytes_written += written;
        }
        if len > remaining {
            debug!(file = %src, kept = written, of = len, "Truncated to newest lines");
            remaining = 0;
        } else {
            remaining -= written;
        }
    }

    debug!(
        pattern = matcher.pattern(),
        src = %src_dir,
        budget = %budget,
        files_written = stats.files_written,
        bytes = stats.bytes_written,
        "Size window applied"
    );
    Ok(stats)
}

fn newest_first(mut files: Vec<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mtime = |p: &Utf8Path| {
        p.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    files.sort_by(|a, b| mtime(b).cmp(&mtime(a)).then_with(|| a.cmp(b)));
    files
}

/// Copy at most `max` bytes of `src` starting at `skip` (uncompressed offset).
///
/// With a non-zero `skip` the partial line at the cut is dropped so the copy
/// starts on a line boundary. Writes nothing (and creates no file) when no
/// complete line remains.
fn copy_tail(src: &Utf8Path, dest: &Utf8Path, skip: u64, max: u64) -> Result<u64, FilterError> {
    let mut reader = open_log(src).map_err(|e| FilterError::io(src, e))?;

    if skip > 0 {
        // Stop one byte short so a cut that lands exactly on a line start
        // only consumes the preceding newline.
        io::copy(&mut (&mut reader).take(skip - 1), &mut io::sink())
            .map_err(|e| FilterError::io(src, e))?;
        let mut partial = Vec::new();
        reader
            .read_until(b'\n', &mut partial)
            .map_err(|e| FilterError::io(src, e))?;
    }

    let at_end = reader
        .fill_buf()
        .map_err(|e| FilterError::io(src, e))?
        .is_empty();
    if at_end || max == 0 {
        return Ok(0);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FilterError::io(parent, e))?;
    }
    let mut writer = BufWriter::new(File::create(dest).map_err(|e| FilterError::io(dest, e))?);
    let written =
        io::copy(&mut reader.take(max), &mut writer).map_err(|e| FilterError::io(dest, e))?;
    writer.flush().map_err(|e| FilterError::io(dest, e))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, Utf8PathBuf, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let src = root.join("src");
        let dest = root.join("dest");
        fs::create_dir_all(&src).unwrap();
        (temp, src, dest)
    }

    fn write_aged(path: &Utf8Path, content: &[u8], age_secs: i64) {
        fs::write(path, content).unwrap();
        let now = FileTime::now().unix_seconds();
        set_file_mtime(path, FileTime::from_unix_time(now - age_secs, 0)).unwrap();
    }

    fn lines(count: usize, width: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for i in 0..count {
            let mut line = format!("{i:06}");
            line.push_str(&"x".repeat(width - line.len() - 1));
            line.push('\n');
            out.extend_from_slice(line.as_bytes());
        }
        out
    }

    #[test]
    fn test_everything_fits() {
        let (_temp, src, dest) = dirs();
        write_aged(&src.join("s3server.INFO"), &lines(10, 10), 10);
        write_aged(&src.join("s3server.WARNING"), &lines(5, 10), 20);

        let stats = limit_size(
            &src,
            &FileMatcher::new("s3server.*").unwrap(),
            &dest,
            ByteSize::from_bytes(1_000),
        )
        .unwrap();

        assert_eq!(stats.files_written, 2);
        assert_eq!(stats.bytes_written, 150);
    }

    #[test]
    fn test_newest_file_first_and_tail_truncation() {
        let (_temp, src, dest) = dirs();
        write_aged(&src.join("s3server.old"), &lines(10, 10), 500);
        write_aged(&src.join("s3server.new"), &lines(10, 10), 5);

        // The newest file fits (100B); 55B remain for the older one.
        let stats = limit_size(
            &src,
            &FileMatcher::new("s3server.*").unwrap(),
            &dest,
            ByteSize::from_bytes(155),
        )
        .unwrap();

        assert_eq!(fs::read(dest.join("s3server.new")).unwrap(), lines(10, 10));
        let tail = fs::read_to_string(dest.join("s3server.old")).unwrap();
        // Cut at byte 45 lands mid-line, so only the last five lines survive.
        assert_eq!(tail.lines().count(), 5);
        assert!(tail.starts_with("000005"));
        assert!(tail.ends_with("000009xxx\n"));
        assert_eq!(stats.bytes_written, 150);
    }

    #[test]
    fn test_zero_budget_writes_nothing() {
        let (_temp, src, dest) = dirs();
        write_aged(&src.join("s3server.INFO"), &lines(3, 10), 1);

        let stats = limit_size(
            &src,
            &FileMatcher::new("s3server.*").unwrap(),
            &dest,
            ByteSize::ZERO,
        )
        .unwrap();
        assert_eq!(stats, FilterStats::default());
        assert!(!dest.exists());
    }

    #[test]
    fn test_budget_smaller_than_one_line() {
        let (_temp, src, dest) = dirs();
        write_aged(&src.join("s3server.INFO"), &lines(3, 10), 1);

        let stats = limit_size(
            &src,
            &FileMatcher::new("s3server.*").unwrap(),
            &dest,
            ByteSize::from_bytes(4),
        )
        .unwrap();
        assert_eq!(stats.bytes_written, 0);
        assert!(!dest.join("s3server.INFO").exists());
    }

    #[test]
    fn test_large_file_streams_exact_tail() {
        let (_temp, src, dest) = dirs();
        // 4 MiB of 64-byte lines; keep the newest 3 MiB.
        let content = lines(65_536, 64);
        write_aged(&src.join("s3server.log"), &content, 1);
        let budget = 3 * 1024 * 1024;

        let stats = limit_size(
            &src,
            &FileMatcher::new("s3server.log").unwrap(),
            &dest,
            ByteSize::from_bytes(budget),
        )
        .unwrap();

        assert_eq!(stats.bytes_written, budget);
        let copied = fs::read(dest.join("s3server.log")).unwrap();
        assert_eq!(copied.as_slice(), &content[content.len() - budget as usize..]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_never_exceeds_budget(
            sizes in proptest::collection::vec(1usize..40, 1..5),
            budget in 0u64..2_000,
        ) {
            let (_temp, src, dest) = dirs();
            for (i, count) in sizes.iter().enumerate() {
                write_aged(&src.join(format!("s3server.{i}")), &lines(*count, 12), i as i64 * 10);
            }

            let stats = limit_size(
                &src,
                &FileMatcher::new("s3server.*").unwrap(),
                &dest,
                ByteSize::from_bytes(budget),
            )
            .unwrap();

            prop_assert!(stats.bytes_written <= budget);
            let on_disk = gwbundle_utils::paths::dir_size(&dest).unwrap();
            prop_assert_eq!(on_disk, stats.bytes_written);
        }
    }
}
