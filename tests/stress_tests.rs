//! Stress tests for shared sinks and rotation under load
//!
//! These tests verify:
//! - Lines from many threads and cores sharing a sink never interleave
//! - No line is lost when the file is rotated mid-stream
//! - Runtime level changes under concurrent logging

use rust_log_writer::core::{Field, LogLevel, LoggerConfig, Manager};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

#[test]
fn test_concurrent_writers_produce_intact_lines() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("concurrent.log");
    let path = log_file.display().to_string();

    // Two cores with different layouts share the same file.
    let manager = Arc::new(
        Manager::new(&[
            LoggerConfig::new("").with_destination(&path),
            LoggerConfig::new("").with_destination(&path).with_encoding("mixed"),
        ])
        .expect("Failed to build manager"),
    );
    assert_eq!(manager.sink_count(), 1);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let logger = manager.default_logger().with(&[Field::new("thread", t as u64)]);
                for i in 0..PER_THREAD {
                    logger
                        .info(format!("message {} from {}", i, t), &[Field::new("seq", i as u64)])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    manager.close().unwrap();

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD * 2);

    let mut json_seen = HashSet::new();
    let mut mixed_count = 0;
    for line in lines {
        if line.starts_with('{') {
            let value: serde_json::Value =
                serde_json::from_str(line).unwrap_or_else(|e| panic!("broken line {:?}: {}", line, e));
            let key = (value["thread"].as_u64().unwrap(), value["seq"].as_u64().unwrap());
            assert!(json_seen.insert(key), "duplicate line {:?}", key);
        } else {
            assert!(line.starts_with('['), "broken line {:?}", line);
            assert!(line.ends_with('}'), "broken line {:?}", line);
            mixed_count += 1;
        }
    }
    assert_eq!(json_seen.len(), THREADS * PER_THREAD);
    assert_eq!(mixed_count, THREADS * PER_THREAD);
}

#[test]
#[cfg(unix)]
fn test_rotation_mid_stream_loses_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("rotating.log");
    let rotated = temp_dir.path().join("rotating.log.1");

    let manager = Arc::new(
        Manager::new(&[LoggerConfig::new("").with_destination(log_file.display().to_string())])
            .expect("Failed to build manager"),
    );

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let manager = Arc::clone(&manager);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let logger = manager.default_logger();
            let mut written = 0usize;
            while !done.load(Ordering::Acquire) || written < 2000 {
                logger.info("tick", &[Field::new("n", written as u64)]).unwrap();
                written += 1;
                if written % 100 == 0 {
                    thread::sleep(Duration::from_millis(5));
                }
            }
            written
        })
    };

    thread::sleep(Duration::from_millis(150));
    fs::rename(&log_file, &rotated).unwrap();
    thread::sleep(Duration::from_millis(300));
    done.store(true, Ordering::Release);

    let written = writer.join().expect("Writer panicked");
    manager.close().unwrap();

    let old = fs::read_to_string(&rotated).unwrap();
    let new = fs::read_to_string(&log_file).unwrap();
    assert!(!old.is_empty());
    assert!(!new.is_empty(), "writes after the check interval go to the new file");
    assert_eq!(old.lines().count() + new.lines().count(), written);

    let sink = manager.sink(&format!("file://{}", log_file.display())).unwrap();
    assert_eq!(sink.name(), log_file.display().to_string());
}

#[test]
fn test_level_changes_while_logging() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("levels.log");

    let manager = Arc::new(
        Manager::new(&[LoggerConfig::new("")
            .with_destination(log_file.display().to_string())
            .with_level("error")])
        .unwrap(),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let writers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let logger = manager.default_logger();
                while !stop.load(Ordering::Acquire) {
                    logger.debug("noise", &[]).unwrap();
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    manager.default_logger().cores()[0].level().set_level(LogLevel::Debug);
    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::Release);
    for handle in writers {
        handle.join().unwrap();
    }
    manager.sync().unwrap();

    let metrics = manager.default_logger().metrics();
    let lines = fs::read_to_string(&log_file).unwrap().lines().count() as u64;
    assert_eq!(lines, metrics.total_logged());
    assert!(metrics.filtered() > 0);
}
