//! Integration tests for the logroll-handler crate.
//!
//! These exercise the public writer surface end to end: byte preservation
//! across rotations, serialization of concurrent writers, and use of a writer
//! as the sink of a tracing subscriber.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use logroll_handler::{
    ManualClock, RotateError, RotatingFile, RotatingFileConfig, RotatingWriter, RotationPolicy,
    RotationUnit, SizeRotatingFile, TimedRotatingFile,
};
use serial_test::serial;
use tempfile::TempDir;

fn local_ts(day: u32, hour: u32, min: u32) -> i64 {
    Local
        .with_ymd_and_hms(2024, 6, day, hour, min, 0)
        .single()
        .unwrap()
        .timestamp()
}

/// Concatenate `{path}.n … {path}.1` followed by the active file.
fn read_ladder(path: &Path) -> String {
    let mut backups = Vec::new();
    for n in 1.. {
        let backup = path.with_file_name(format!(
            "{}.{n}",
            path.file_name().unwrap().to_string_lossy()
        ));
        if !backup.exists() {
            break;
        }
        backups.push(fs::read_to_string(backup).unwrap());
    }
    backups.reverse();
    backups.push(fs::read_to_string(path).unwrap_or_default());
    backups.concat()
}

// ============================================================================
// SIZE ROTATION
// ============================================================================

mod size_rotation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_bytes_lost_across_rotations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let writer = SizeRotatingFile::new(&path, 64, 0).unwrap();

        let mut expected = String::new();
        for i in 0..100 {
            let line = format!("record {i:04} {}\n", "x".repeat(i % 13));
            writer.write_str(&line).unwrap();
            expected.push_str(&line);
        }
        writer.close().unwrap();

        assert!(path.with_file_name("app.log.1").exists());
        assert_eq!(read_ladder(&path), expected);
    }

    #[test]
    fn test_every_file_respects_limit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let writer = SizeRotatingFile::new(&path, 50, 0).unwrap();

        for i in 0..40 {
            writer.write_str(&format!("line {i:02} ........\n")).unwrap();
        }
        writer.close().unwrap();

        for entry in fs::read_dir(temp_dir.path()).unwrap() {
            let len = entry.unwrap().metadata().unwrap().len();
            assert!(len <= 50, "file of {len} bytes exceeds the limit");
        }
    }

    #[test]
    fn test_concurrent_writers_serialize_lines() {
        const THREADS: usize = 8;
        const LINES: usize = 200;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let writer = SizeRotatingFile::new(&path, 1024, 0).unwrap();

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let writer = &writer;
                scope.spawn(move || {
                    for i in 0..LINES {
                        writer.write_str(&format!("t{t:02} n{i:04}\n")).unwrap();
                    }
                });
            }
        });
        writer.close().unwrap();

        let content = read_ladder(&path);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), THREADS * LINES);
        assert_eq!(content.len(), THREADS * LINES * "t00 n0000\n".len());

        let unique: HashSet<&str> = lines.iter().copied().collect();
        assert_eq!(unique.len(), THREADS * LINES);
        for t in 0..THREADS {
            for i in 0..LINES {
                assert!(unique.contains(format!("t{t:02} n{i:04}").as_str()));
            }
        }
    }

    #[test]
    fn test_bounded_retention_keeps_newest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let writer = SizeRotatingFile::new(&path, 4, 3).unwrap();

        for chunk in ["aaaa", "bbbb", "cccc", "dddd", "eeee", "ffff"] {
            writer.write_str(chunk).unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "ffff");
        assert_eq!(read_ladder(&path), "ccccddddeeeeffff");
        assert!(!path.with_file_name("app.log.4").exists());
    }
}

// ============================================================================
// TIME ROTATION
// ============================================================================

mod timed_rotation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_concurrent_writers_across_midnight() {
        const THREADS: usize = 4;
        const LINES: usize = 100;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let clock = ManualClock::new(local_ts(1, 23, 0));
        let writer = TimedRotatingFile::builder(&path)
            .clock(clock.clone())
            .open()
            .unwrap();

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let writer = &writer;
                scope.spawn(move || {
                    for i in 0..LINES {
                        writer.write_str(&format!("t{t} n{i:03}\n")).unwrap();
                    }
                });
            }
        });

        clock.set(local_ts(2, 0, 5));
        writer.write_str("after midnight\n").unwrap();

        let backup = fs::read_to_string(path.with_file_name("app.log.2024-06-01")).unwrap();
        assert_eq!(backup.lines().count(), THREADS * LINES);
        assert_eq!(fs::read_to_string(&path).unwrap(), "after midnight\n");
    }

    #[test]
    fn test_week_of_daily_rotation_with_retention() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let clock = ManualClock::new(local_ts(1, 12, 0));
        let writer = TimedRotatingFile::builder(&path)
            .backup_count(3)
            .clock(clock.clone())
            .open()
            .unwrap();

        for day in 1..=7 {
            clock.set(local_ts(day, 12, 0));
            writer.write_str(&format!("day {day}\n")).unwrap();
        }

        let mut names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "app.log",
                "app.log.2024-06-04",
                "app.log.2024-06-05",
                "app.log.2024-06-06",
            ]
        );
        assert_eq!(
            fs::read_to_string(path.with_file_name("app.log.2024-06-06")).unwrap(),
            "day 6\n"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "day 7\n");
    }

    #[test]
    fn test_closed_writer_reports_not_open() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TimedRotatingFile::new(temp_dir.path().join("app.log")).unwrap();

        writer.close().unwrap();
        assert!(matches!(writer.write(b"late"), Err(RotateError::NotOpen)));

        let err = std::io::Error::from(RotateError::NotOpen);
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}

// ============================================================================
// FRONT ENDS
// ============================================================================

mod front_ends {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tracing_subscriber_sink() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.log");
        let writer = Arc::new(SizeRotatingFile::new(&path, 1 << 20, 2).unwrap());

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Arc::clone(&writer))
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(request_id = 7, "handled request");
            tracing::debug!("filtered out");
        });
        writer.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("handled request"));
        assert!(content.contains("request_id=7"));
        assert!(!content.contains("filtered out"));
    }

    #[test]
    fn test_rotation_events_through_own_sink() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.log");
        let writer = Arc::new(SizeRotatingFile::new(&path, 512, 0).unwrap());

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Arc::clone(&writer))
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for i in 0..50 {
                tracing::info!(i, "tick");
            }
        });

        assert!(path.with_file_name("trace.log.1").exists());
        let content = read_ladder(&path);
        assert_eq!(content.lines().filter(|l| l.contains("tick")).count(), 50);
    }

    #[test]
    fn test_config_built_writer_as_io_write() {
        let temp_dir = TempDir::new().unwrap();
        let config = RotatingFileConfig::new(
            temp_dir.path().join("cfg.log"),
            RotationPolicy::Timed {
                unit: RotationUnit::Hour,
                interval: 2,
                date_format: None,
                backup_count: 4,
            },
        );

        let mut writer = config.open().unwrap();
        writeln!(writer, "first").unwrap();
        writeln!(&writer, "second").unwrap();
        writer.flush().unwrap();

        let RotatingFile::Timed(timed) = &writer else {
            panic!("expected a timed writer");
        };
        assert_eq!(timed.interval(), 2 * 60 * 60);
        assert_eq!(timed.date_format(), "%Y-%m-%d_%H");
        assert_eq!(
            fs::read_to_string(writer.path()).unwrap(),
            "first\nsecond\n"
        );
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

#[cfg(unix)]
mod permissions {
    use super::*;
    use pretty_assertions::assert_eq;
    use logroll_handler::{default_file_mode, reset_default_file_mode, set_default_file_mode};
    use std::os::unix::fs::PermissionsExt;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    #[serial(file_mode)]
    fn test_process_default_mode_applies_to_rotated_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("private.log");

        set_default_file_mode(0o600);
        let writer = SizeRotatingFile::new(&path, 4, 2);
        reset_default_file_mode();
        let writer = writer.unwrap();

        writer.write_str("aaaa").unwrap();
        writer.write_str("bbbb").unwrap();

        assert_eq!(mode_of(&path), 0o600);
        assert_eq!(mode_of(&path.with_file_name("private.log.1")), 0o600);
        assert_eq!(default_file_mode(), 0o644);
    }

    #[test]
    #[serial(file_mode)]
    fn test_writer_mode_overrides_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.log");

        let writer = TimedRotatingFile::builder(&path)
            .mode(0o640)
            .open()
            .unwrap();
        writer.write_str("hello\n").unwrap();

        assert_eq!(mode_of(&path), 0o640);
    }
}
