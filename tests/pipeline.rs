//! End-to-end pipeline tests: ingest -> score -> classify -> workflow.

use std::sync::{Arc, Barrier};

use logtriage::classify::Severity;
use logtriage::detect::AnalysisEngine;
use logtriage::ingest;
use logtriage::notify::testing::CapturingSink;
use logtriage::storage::{self, Pool};
use logtriage::workflow::{IncidentManager, Stage, WorkflowError};

fn open_test_pool() -> (tempfile::TempDir, Pool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.db");
    let pool = storage::open_pool(path.to_str().unwrap()).unwrap();
    (dir, pool)
}

fn ingest_body(pool: &Pool, body: &str) -> usize {
    let parsed = ingest::parse_body(body);
    storage::insert_lines(pool, &parsed).unwrap()
}

#[test]
fn test_full_pipeline_creates_and_advances_incident() {
    let (_dir, pool) = open_test_pool();

    // A mostly-normal corpus with one hostile line.
    let mut body: String = (0..40)
        .map(|i| format!("2025-08-20 10:{:02}:00 INFO request served ok\n", i % 60))
        .collect();
    body.push_str("2025-08-20 11:00:00 ERROR SQL injection ATTACK from 203.0.113.9\n");
    assert_eq!(ingest_body(&pool, &body), 41);

    let sink = Arc::new(CapturingSink::default());
    let engine = AnalysisEngine::new(pool.clone(), sink.clone());
    let report = engine.analyze().unwrap();

    assert_eq!(report.total, 41);
    assert!(report.incidents_created >= 1);
    assert!(report.anomalies[0].message.contains("SQL injection"));
    assert!(!sink.sent.lock().unwrap().is_empty());

    // Severity stats reflect the persisted scores.
    let counts = storage::severity_counts(&pool).unwrap();
    assert!(counts.high >= 1);
    assert_eq!(counts.pending, 0);

    // Walk the hottest incident through the whole lifecycle.
    let manager = IncidentManager::new(pool.clone());
    let incident = manager.list(None, 1).unwrap().remove(0);
    assert_eq!(incident.current_stage, Stage::Detection);

    manager.advance(incident.id, Stage::Analysis).unwrap();
    manager.advance(incident.id, Stage::Containment).unwrap();
    manager.advance(incident.id, Stage::Recovery).unwrap();

    let summary = manager.summary().unwrap();
    assert_eq!(summary.recovery, 1);

    let timeline = manager.timeline(incident.id).unwrap();
    assert!(timeline.iter().all(|entry| entry.completed));
}

#[test]
fn test_concurrent_advance_exactly_one_wins() {
    let (_dir, pool) = open_test_pool();
    ingest_body(&pool, "seed line\n");

    let manager = IncidentManager::new(pool.clone());
    let id = manager.create(1, "failed_login", Severity::High).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let pool = pool.clone();
        let barrier = barrier.clone();
        handles.push(std::thread::spawn(move || {
            let manager = IncidentManager::new(pool);
            barrier.wait();
            manager.advance(id, Stage::Analysis)
        }));
    }

    let results: Vec<Result<(), WorkflowError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one concurrent advance must win");
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(WorkflowError::InvalidTransition { .. }))));

    // The loser did not duplicate the advance.
    assert_eq!(manager.get(id).unwrap().current_stage, Stage::Analysis);
}

#[test]
fn test_unscored_corpus_is_pending() {
    let (_dir, pool) = open_test_pool();
    ingest_body(&pool, "line one\nline two\n");

    let counts = storage::severity_counts(&pool).unwrap();
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.high + counts.medium + counts.low, 0);

    for record in storage::recent(&pool, 10).unwrap() {
        assert_eq!(Severity::from_score(record.anomaly_score), Severity::Pending);
    }
}

#[test]
fn test_clear_resets_logs_and_incidents() {
    let (_dir, pool) = open_test_pool();
    ingest_body(&pool, "one\ntwo\n");

    let manager = IncidentManager::new(pool.clone());
    manager.create(1, "port_scan", Severity::High).unwrap();

    storage::clear_all(&pool).unwrap();
    assert!(storage::recent(&pool, 10).unwrap().is_empty());
    assert_eq!(manager.summary().unwrap().total, 0);
}
