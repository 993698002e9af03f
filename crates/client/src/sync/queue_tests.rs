// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the offline queue module.

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::record;
use fieldsync_core::TelemetryRecord;
use tempfile::tempdir;

fn latitudes(records: &[TelemetryRecord]) -> Vec<u32> {
    records
        .iter()
        .map(|r| {
            let lat = r.position.unwrap().latitude;
            ((-23.0 - lat) * 1000.0).round() as u32
        })
        .collect()
}

#[test]
fn test_queue_empty_file() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("empty.jsonl");
    std::fs::write(&queue_path, "").unwrap();

    let queue = OfflineQueue::open(&queue_path).unwrap();
    assert!(queue.is_empty().unwrap());
    assert_eq!(queue.len().unwrap(), 0);
}

#[test]
fn test_open_creates_parent_dirs() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("state/fieldsync/queue.jsonl");
    let queue = OfflineQueue::open(&queue_path).unwrap();
    assert!(queue_path.exists());
    assert_eq!(queue.path(), queue_path.as_path());
}

#[test]
fn test_queue_file_with_blank_lines() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("blanks.jsonl");
    let mut queue = OfflineQueue::open(&queue_path).unwrap();
    queue.enqueue(&record(1)).unwrap();

    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&queue_path)
        .unwrap();
    writeln!(file).unwrap();
    writeln!(file, "   ").unwrap();

    queue.enqueue(&record(2)).unwrap();
    assert_eq!(latitudes(&queue.peek_all().unwrap()), vec![1, 2]);
}

#[test]
fn test_enqueue_preserves_order_and_content() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.jsonl")).unwrap();

    let first = record(1);
    queue.enqueue(&first).unwrap();
    queue.enqueue(&record(2)).unwrap();
    queue.enqueue(&record(3)).unwrap();

    let records = queue.peek_all().unwrap();
    assert_eq!(latitudes(&records), vec![1, 2, 3]);
    assert_eq!(records[0], first);
    assert_eq!(queue.len().unwrap(), 3);
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("queue.jsonl");
    {
        let mut queue = OfflineQueue::open(&queue_path).unwrap();
        queue.enqueue(&record(1)).unwrap();
        queue.enqueue(&record(2)).unwrap();
    }
    let queue = OfflineQueue::open(&queue_path).unwrap();
    assert_eq!(latitudes(&queue.peek_all().unwrap()), vec![1, 2]);
}

#[test]
fn test_second_open_is_locked() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("queue.jsonl");
    let _first = OfflineQueue::open(&queue_path).unwrap();
    let err = OfflineQueue::open(&queue_path).unwrap_err();
    assert!(matches!(err, QueueError::Locked(_)));
}

#[test]
fn test_take_all_snapshots_and_clears() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.jsonl")).unwrap();
    for n in 1..=3 {
        queue.enqueue(&record(n)).unwrap();
    }

    let taken = queue.take_all().unwrap();
    assert_eq!(latitudes(&taken), vec![1, 2, 3]);
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_requeue_front_goes_before_newer_records() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.jsonl")).unwrap();
    for n in 1..=3 {
        queue.enqueue(&record(n)).unwrap();
    }
    let taken = queue.take_all().unwrap();

    // Produced while the flush was running
    queue.enqueue(&record(4)).unwrap();

    queue.requeue_front(&taken[1..]).unwrap();
    assert_eq!(latitudes(&queue.peek_all().unwrap()), vec![2, 3, 4]);
}

#[test]
fn test_requeue_nothing_is_noop() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.jsonl")).unwrap();
    queue.enqueue(&record(7)).unwrap();
    queue.requeue_front(&[]).unwrap();
    assert_eq!(latitudes(&queue.peek_all().unwrap()), vec![7]);
}

#[test]
fn test_remove_first() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.jsonl")).unwrap();
    for n in 1..=4 {
        queue.enqueue(&record(n)).unwrap();
    }

    queue.remove_first(2).unwrap();
    assert_eq!(latitudes(&queue.peek_all().unwrap()), vec![3, 4]);

    queue.remove_first(10).unwrap();
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_corrupt_line_is_an_error() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("queue.jsonl");
    let queue = OfflineQueue::open(&queue_path).unwrap();
    std::fs::write(&queue_path, "{not json}\n").unwrap();
    assert!(matches!(
        queue.peek_all().unwrap_err(),
        QueueError::Serialization(_)
    ));
}
