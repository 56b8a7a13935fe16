//! End-to-end bundle runs against a fake node filesystem.
//!
//! External tools are scripted and the PID lookup is fixed, so these runs are
//! hermetic apart from the filesystem under a temporary directory.

mod common;

use chrono::NaiveDate;
use common::{MIB, Node, archive_entries, archive_text, write_sized};
use filetime::{FileTime, set_file_mtime};
use gwbundle::{ByteSize, CategoryKind, CategoryStatus, Period};
use gwbundle_collect::FixedProcessLookup;
use gwbundle_collect::test_support::ScriptedRunner;
use std::fs;

/// `prefix` padded with `x` to a 100-byte line.
fn padded_line(prefix: &str) -> String {
    format!("{prefix}{}\n", "x".repeat(99 - prefix.len()))
}

fn noon(day: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn test_primary_logs_get_override_share_when_logs_overflow() {
    let node = Node::new();
    node.write_config(2 * MIB);
    write_sized(&node.log_dir().join("s3server.log"), 20 * MIB);
    write_sized(&node.log_dir().join("s3server_audit.log"), MIB);
    let runner = ScriptedRunner::new().succeed("rpm", vec![b'p'; (3 * MIB) as usize]);

    let limit = ByteSize::from_mib(10);
    let request = node.request("SB-override").size_limit(Some(limit)).build();
    let outcome = node.collector(request, runner).run().unwrap();

    let entries = archive_entries(&outcome.archive);
    assert_eq!(entries["s3/s3config.yaml"], 2 * MIB);
    assert_eq!(entries["s3/s3server_rpm_manifest.txt"], 3 * MIB);

    // 95% of the original limit, not of what was left after config + manifest.
    let share = limit.percent(95).bytes();
    let primary = entries["s3/s3server.log"];
    assert!(primary <= share, "primary {primary} exceeds share {share}");
    assert!(primary > share - 100, "primary {primary} far below share {share}");

    // The override over-commits the limit; secondaries find nothing left.
    assert!(outcome.report.staged_bytes > limit.bytes());
    assert!(!entries.contains_key("s3/s3server_audit.log"));
    assert!(
        outcome
            .report
            .skipped_categories()
            .all(|c| c.kind != CategoryKind::Config)
    );
}

#[test]
fn test_time_window_without_size_limit_keeps_recent_entries() {
    let node = Node::new();
    fs::write(
        node.log_dir().join("s3server.log"),
        "2024-05-08 12:00:00 old request\n  old continuation\n\
         2024-05-10 06:00:00 recent request\n  recent continuation\n",
    )
    .unwrap();
    fs::write(
        node.log_dir().join("haproxy.log"),
        "2024-05-08T12:00:00 GET /old\n2024-05-10T06:00:00 GET /new\n",
    )
    .unwrap();
    fs::write(node.log_dir().join("s3server_noise.log"), "no timestamps here\n").unwrap();

    let request = node
        .request("SB-time")
        .duration(Some(Period::from_days(1)))
        .build();
    let outcome = node
        .collector(request, ScriptedRunner::new())
        .with_clock(noon(10))
        .run()
        .unwrap();

    assert_eq!(
        archive_text(&outcome.archive, "s3/s3server.log").unwrap(),
        "2024-05-10 06:00:00 recent request\n  recent continuation\n"
    );
    assert_eq!(
        archive_text(&outcome.archive, "s3/haproxy.log").unwrap(),
        "2024-05-10T06:00:00 GET /new\n"
    );
    assert!(archive_text(&outcome.archive, "s3/s3server_noise.log").is_none());
    assert!(matches!(
        outcome.report.get(CategoryKind::LogsBySize).unwrap().status,
        CategoryStatus::Skipped(_)
    ));
}

#[test]
fn test_time_window_then_size_limit_restages_filtered_logs() {
    let node = Node::new();
    node.write_config(100);
    fs::write(
        node.log_dir().join("s3server.log"),
        "2024-05-01 12:00:00 ancient\n2024-05-10 11:00:00 fresh\n",
    )
    .unwrap();

    let request = node
        .request("SB-both")
        .duration(Some(Period::from_days(1)))
        .size_limit(Some(ByteSize::from_mib(100)))
        .build();
    let outcome = node
        .collector(request, ScriptedRunner::new().succeed("rpm", "pkg-1\n"))
        .with_clock(noon(10))
        .run()
        .unwrap();

    assert_eq!(
        archive_text(&outcome.archive, "s3/s3server.log").unwrap(),
        "2024-05-10 11:00:00 fresh\n"
    );
    assert_eq!(
        archive_text(&outcome.archive, "s3/s3server_rpm_manifest.txt").unwrap(),
        "pkg-1\n"
    );
    assert!(archive_entries(&outcome.archive).contains_key("s3/s3config.yaml"));
}

#[test]
fn test_time_window_then_size_limit_overflow_takes_override_share() {
    let node = Node::new();
    node.write_config(2_000);

    let mut primary = String::new();
    for i in 0..20 {
        primary.push_str(&padded_line(&format!("2024-05-08 12:00:00 stale {i:04} ")));
    }
    for i in 0..200 {
        primary.push_str(&padded_line(&format!("2024-05-10 06:00:00 recent {i:04} ")));
    }
    fs::write(node.log_dir().join("s3server.log"), primary).unwrap();
    fs::write(
        node.log_dir().join("s3server_audit.log"),
        padded_line("2024-05-10 07:00:00 audit ").repeat(5),
    )
    .unwrap();
    fs::write(node.log_dir().join("haproxy.log"), "2024-05-10T06:00:00 GET /new\n").unwrap();
    // Compressed rotations are copied as-is from the log directory.
    fs::write(node.log_dir().join("s3server.1.gz"), vec![b'z'; 40]).unwrap();

    // 95% of 10050 is 9547: the 9500-byte in-window tail plus the 40-byte
    // rotation both fit the shared share.
    let limit = ByteSize::from_bytes(10_050);
    let request = node
        .request("SB-window-overflow")
        .duration(Some(Period::from_days(1)))
        .size_limit(Some(limit))
        .build();
    let outcome = node
        .collector(request, ScriptedRunner::new())
        .with_clock(noon(10))
        .run()
        .unwrap();

    let entries = archive_entries(&outcome.archive);
    let share = limit.percent(95).bytes();
    let tail = archive_text(&outcome.archive, "s3/s3server.log").unwrap();
    assert!(tail.len() as u64 <= share);
    assert_eq!(tail.len(), 9_500);
    assert!(tail.lines().all(|l| l.starts_with("2024-05-10 06:00:00 recent")));
    assert!(tail.ends_with(&padded_line("2024-05-10 06:00:00 recent 0199 ")));
    assert_eq!(entries.get("s3/s3server.1.gz"), Some(&40));

    // Secondary patterns find the budget spent by the override.
    assert!(!entries.contains_key("s3/s3server_audit.log"));
    assert!(!entries.contains_key("s3/haproxy.log"));
    let logs = outcome.report.get(CategoryKind::LogsBySize).unwrap();
    assert_eq!(logs.files, 2);
    assert_eq!(logs.bytes, 9_540);
    assert!(outcome.report.staged_bytes > limit.bytes());
}

#[test]
fn test_diagnostic_dumps_gated_on_rendered_size() {
    let node = Node::new();
    node.write_config(1_000);
    write_sized(&node.trace_dir().join("addb_1/o/1"), 100);
    let runner = ScriptedRunner::new().succeed("m0addb2dump", vec![b'a'; 50 * 1024]);

    let limit = ByteSize::from_bytes(4_096);
    let request = node.request("SB-addb-big").size_limit(Some(limit)).build();
    let outcome = node.collector(request, runner).run().unwrap();

    let entries = archive_entries(&outcome.archive);
    assert!(!entries.keys().any(|k| k.starts_with("s3/addb/")), "{entries:?}");
    assert!(outcome.report.staged_bytes <= limit.bytes());
    let addb = outcome.report.get(CategoryKind::DiagnosticDumps).unwrap();
    assert_eq!((addb.files, addb.bytes), (0, 0));
}

#[test]
fn test_crash_dumps_only_newest_when_both_do_not_fit() {
    let node = Node::new();
    let older = node.crash_dir().join("core-s3server.100");
    let newer = node.crash_dir().join("core-s3server.200");
    write_sized(&older, 5 * MIB);
    write_sized(&newer, 6 * MIB);
    set_file_mtime(&older, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
    set_file_mtime(&newer, FileTime::from_unix_time(1_700_100_000, 0)).unwrap();

    let request = node
        .request("SB-crash")
        .size_limit(Some(ByteSize::from_mib(8)))
        .coredumps(true)
        .build();
    let outcome = node.collector(request, ScriptedRunner::new()).run().unwrap();

    let entries = archive_entries(&outcome.archive);
    assert_eq!(entries.get("s3/coredumps/core-s3server.200"), Some(&(6 * MIB)));
    assert!(!entries.contains_key("s3/coredumps/core-s3server.100"));
    assert!(outcome.report.staged_bytes <= 8 * MIB);

    // rpm was not available: degraded, nothing written.
    assert!(
        outcome
            .report
            .degradations()
            .any(|c| c.kind == CategoryKind::RpmManifest)
    );
    assert!(!entries.contains_key("s3/s3server_rpm_manifest.txt"));
}

#[test]
fn test_unbounded_run_collects_every_category() {
    let node = Node::new();
    node.write_config(64);
    for name in ["s3server.log", "s3server_audit.log", "haproxy.log", "s3server.1.gz"] {
        write_sized(&node.log_dir().join(name), 300);
    }
    for i in 0..8 {
        let file = node.trace_dir().join(format!("m0d-{i}/m0trace.{i}"));
        write_sized(&file, 50);
        set_file_mtime(&file, FileTime::from_unix_time(1_700_000_000 + i, 0)).unwrap();
    }
    write_sized(&node.trace_dir().join("m0d-0/addb_1/o/100"), 10);
    write_sized(&node.crash_dir().join("core-s3server.1"), 40);
    write_sized(&node.crash_dir().join("nested/core-s3server.2"), 40);

    let runner = ScriptedRunner::new()
        .succeed("rpm", "pkg-1\n")
        .succeed("gdb", "Thread 1 (LWP 4242):\n#0 main ()\n")
        .succeed("m0addb2dump", "* addb record\n");
    let calls = runner.clone();

    let request = node.request("SB-all").all().build();
    let outcome = node
        .collector(request, runner)
        .with_process_lookup(Box::new(FixedProcessLookup(Some(4242))))
        .run()
        .unwrap();

    let entries = archive_entries(&outcome.archive);
    assert_eq!(outcome.archive, node.target().join("s3/s3_SB-all.tar.gz"));
    for name in [
        "s3/s3config.yaml",
        "s3/s3server_rpm_manifest.txt",
        "s3/s3server.log",
        "s3/s3server_audit.log",
        "s3/haproxy.log",
        "s3/s3server.1.gz",
        "s3/addb/m0d-0_addb_1_o_100.txt",
        "s3/s3server_pstack.txt",
        "s3/coredumps/core-s3server.1",
        "s3/coredumps/nested/core-s3server.2",
    ] {
        assert!(entries.contains_key(name), "{name} missing from {entries:?}");
    }

    let traces: Vec<_> = entries.keys().filter(|k| k.contains("/m0trace/")).collect();
    assert_eq!(traces.len(), 5);
    for i in 3..8 {
        assert!(entries.contains_key(&format!("s3/m0trace/m0d-{i}/m0trace.{i}")));
    }

    assert!(
        calls
            .calls()
            .contains(&"gdb -p 4242 -batch -ex \"thread apply all bt\"".to_string())
    );
    assert_eq!(
        archive_text(&outcome.archive, "s3/addb/m0d-0_addb_1_o_100.txt").unwrap(),
        "* addb record\n"
    );
    assert_eq!(outcome.report.degradations().count(), 0);
}

#[test]
fn test_stack_trace_note_when_service_not_running() {
    let node = Node::new();
    let request = node.request("SB-pstack").stacktrace(true).build();
    let outcome = node.collector(request, ScriptedRunner::new()).run().unwrap();

    let note = archive_text(&outcome.archive, "s3/s3server_pstack.txt").unwrap();
    assert!(note.contains("s3server is not running"), "{note}");
    let stack = outcome.report.get(CategoryKind::StackTrace).unwrap();
    assert!(matches!(stack.status, CategoryStatus::Degraded(_)));
}

#[test]
fn test_failed_addb_conversion_leaves_note() {
    let node = Node::new();
    write_sized(&node.trace_dir().join("addb_7/o/1"), 10);

    let request = node.request("SB-addb").build();
    let outcome = node.collector(request, ScriptedRunner::new()).run().unwrap();

    let note = archive_text(&outcome.archive, "s3/addb/addb_7_o_1.txt").unwrap();
    assert!(note.starts_with("m0addb2dump failed:"), "{note}");
    assert!(matches!(
        outcome.report.get(CategoryKind::DiagnosticDumps).unwrap().status,
        CategoryStatus::Degraded(_)
    ));
}

#[test]
fn test_staging_area_removed_after_run() {
    let node = Node::new();
    write_sized(&node.log_dir().join("s3server.log"), 100);
    let request = node.request("SB-clean").build();
    node.collector(request, ScriptedRunner::new()).run().unwrap();

    assert!(!node.staging_dir().exists());
    assert!(!node.root.join("staging/s3_support_bundle.lock").exists());
}
