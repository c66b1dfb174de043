//! Periodic collection scheduler -- repeats collect -> train -> analyze on
//! a fixed interval and publishes the last cycle's outcome.
//!
//! One scheduler exists per process, constructed in `serve()` and shared
//! with the API through `AppState`. Only one cycle may be in flight at a
//! time; a tick that fires while the previous cycle is still running is
//! skipped. Cycle failures are committed as a degraded result and the
//! loop keeps ticking.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::detect::AnalysisEngine;
use crate::ingest::collect::LogSource;
use crate::storage::{self, Pool};

/// Intervals below this are clamped, never rejected.
pub const MIN_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MAX_ITEMS: usize = 1000;

/// Outcome of one collect -> train -> analyze cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleResult {
    pub collected: usize,
    pub trained: usize,
    pub total: usize,
    pub anomalies: usize,
    pub incidents_created: usize,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartReply {
    pub running: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub interval_secs: Option<u64>,
    pub last_result: Option<CycleResult>,
}

struct Job {
    shutdown: watch::Sender<bool>,
    interval_secs: u64,
}

struct Inner {
    job: Mutex<Option<Job>>,
    last_result: RwLock<Option<CycleResult>>,
    // Held for the duration of a cycle; try-locked by each tick.
    cycle_gate: tokio::sync::Mutex<()>,
}

pub struct CollectionScheduler {
    pool: Pool,
    engine: Arc<AnalysisEngine>,
    source: Arc<dyn LogSource>,
    inner: Arc<Inner>,
}

impl Clone for CollectionScheduler {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            engine: self.engine.clone(),
            source: self.source.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl CollectionScheduler {
    pub fn new(pool: Pool, engine: Arc<AnalysisEngine>, source: Arc<dyn LogSource>) -> Self {
        Self {
            pool,
            engine,
            source,
            inner: Arc::new(Inner {
                job: Mutex::new(None),
                last_result: RwLock::new(None),
                cycle_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Start the repeating cycle; the first cycle runs immediately.
    /// Idempotent: when already running the existing job is kept and its
    /// configuration reported.
    pub fn start(&self, interval_secs: u64, max_items: usize) -> StartReply {
        let effective = interval_secs.max(MIN_INTERVAL_SECS);

        let mut job = self.inner.job.lock().unwrap();
        if let Some(existing) = job.as_ref() {
            return StartReply { running: true, interval_secs: existing.interval_secs };
        }

        let (shutdown, mut stopped) = watch::channel(false);
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(effective));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The shutdown signal is only observed between ticks, so a
                // cycle that already started always runs to completion and
                // commits its result.
                tokio::select! {
                    _ = ticker.tick() => this.run_tick(max_items).await,
                    _ = stopped.changed() => break,
                }
            }
        });

        info!(interval_secs = effective, max_items, "Collection schedule started");
        *job = Some(Job { shutdown, interval_secs: effective });
        StartReply { running: true, interval_secs: effective }
    }

    /// Cancel future ticks. Harmless no-op when idle; a cycle already in
    /// flight runs to completion and its result is still committed.
    pub fn stop(&self) -> bool {
        let mut job = self.inner.job.lock().unwrap();
        match job.take() {
            Some(j) => {
                let _ = j.shutdown.send(true);
                info!("Collection schedule stopped");
                true
            }
            None => false,
        }
    }

    /// Non-blocking snapshot of the schedule state. Returns the most
    /// recent committed result, never a partial one.
    pub fn status(&self) -> StatusSnapshot {
        let job = self.inner.job.lock().unwrap();
        StatusSnapshot {
            running: job.is_some(),
            interval_secs: job.as_ref().map(|j| j.interval_secs),
            last_result: self.inner.last_result.read().unwrap().clone(),
        }
    }

    async fn run_tick(&self, max_items: usize) {
        let Ok(_guard) = self.inner.cycle_gate.try_lock() else {
            warn!("Previous cycle still running; tick skipped");
            return;
        };
        let result = self.run_cycle(max_items).await;
        *self.inner.last_result.write().unwrap() = Some(result);
    }

    /// Run one full cycle. Failures are caught and returned as a degraded
    /// result, never propagated.
    pub async fn run_cycle(&self, max_items: usize) -> CycleResult {
        let started = std::time::Instant::now();
        let mut result = match self.try_cycle(max_items).await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "Collection cycle failed");
                CycleResult { error: Some(e.to_string()), ..Default::default() }
            }
        };
        result.elapsed_secs = started.elapsed().as_secs_f64();
        result
    }

    async fn try_cycle(&self, max_items: usize) -> Result<CycleResult> {
        let lines = self.source.collect(max_items).await?;

        let pool = self.pool.clone();
        let collected =
            tokio::task::spawn_blocking(move || storage::insert_lines(&pool, &lines)).await??;

        let engine = self.engine.clone();
        let (trained, report) = tokio::task::spawn_blocking(move || -> Result<_> {
            let trained = engine.train()?;
            let report = engine.analyze()?;
            Ok((trained, report))
        })
        .await??;

        Ok(CycleResult {
            collected,
            trained,
            total: report.total,
            anomalies: report.anomalies.len(),
            incidents_created: report.incidents_created,
            elapsed_secs: 0.0,
            error: None,
        })
    }
}
