//! Follow-mode file tailing: watch a log file and ingest lines as they
//! are appended.
//!
//! `TailSource` is an incremental `LogSource`: the first poll seeks to the
//! end of the file, later polls return only the complete lines appended
//! since. A shrunken file is treated as rotated and read from the top.
//! `LogTailer` owns the polling loop and writes collected lines straight
//! into the log store.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::storage::{self, Pool};

use super::collect::LogSource;
use super::{parse_line, ParsedLine};

pub const DEFAULT_TAIL_PATH: &str = "/var/log/syslog";

const TAIL_POLL: Duration = Duration::from_millis(500);
const TAIL_BATCH: usize = 500;

pub struct TailSource {
    path: PathBuf,
    // Byte offset of the next unread line; None until the first poll.
    offset: Mutex<Option<u64>>,
}

impl TailSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), offset: Mutex::new(None) }
    }
}

#[async_trait]
impl LogSource for TailSource {
    /// Return complete lines appended since the previous call, up to
    /// `max_items`. A trailing partial line stays unconsumed until its
    /// newline arrives.
    async fn collect(&self, max_items: usize) -> Result<Vec<ParsedLine>> {
        let mut offset = self.offset.lock().await;

        let mut file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        let start = match *offset {
            None => {
                *offset = Some(len);
                return Ok(Vec::new());
            }
            // File shrank: rotated or truncated, start over from the top.
            Some(o) if o > len => 0,
            Some(o) => o,
        };
        if start == len {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(start)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let mut lines = Vec::new();
        let mut consumed = 0usize;
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            if chunk.last() != Some(&b'\n') {
                break;
            }
            if lines.len() == max_items {
                break;
            }
            consumed += chunk.len();
            let text = String::from_utf8_lossy(&chunk[..chunk.len() - 1]);
            let trimmed = text.trim_end_matches('\r');
            if !trimmed.trim().is_empty() {
                lines.push(parse_line(trimmed));
            }
        }

        *offset = Some(start + consumed as u64);
        Ok(lines)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TailStatus {
    pub running: bool,
    pub path: Option<String>,
}

struct TailJob {
    shutdown: watch::Sender<bool>,
    path: String,
}

/// Owns the follow loop: polls a `TailSource` and inserts whatever it
/// yields. One tailer per process, shared with the API via `AppState`.
pub struct LogTailer {
    pool: Pool,
    job: StdMutex<Option<TailJob>>,
}

impl LogTailer {
    pub fn new(pool: Pool) -> Self {
        Self { pool, job: StdMutex::new(None) }
    }

    /// Begin following `path`. Idempotent: when already tailing, the
    /// existing job is kept and reported.
    pub fn start(&self, path: &str) -> TailStatus {
        let mut job = self.job.lock().unwrap();
        if let Some(existing) = job.as_ref() {
            return TailStatus { running: true, path: Some(existing.path.clone()) };
        }

        let (shutdown, mut stopped) = watch::channel(false);
        let source = TailSource::new(path);
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TAIL_POLL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => match source.collect(TAIL_BATCH).await {
                        Ok(lines) if !lines.is_empty() => {
                            let pool = pool.clone();
                            let inserted = tokio::task::spawn_blocking(move || {
                                storage::insert_lines(&pool, &lines)
                            })
                            .await;
                            match inserted {
                                Ok(Ok(count)) => info!(count, "Tailed lines ingested"),
                                Ok(Err(e)) => warn!(error = %e, "Tail insert failed"),
                                Err(e) => warn!(error = %e, "Tail insert task failed"),
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Tail read failed"),
                    },
                    _ = stopped.changed() => break,
                }
            }
        });

        info!(path, "Tail started");
        *job = Some(TailJob { shutdown, path: path.to_string() });
        TailStatus { running: true, path: Some(path.to_string()) }
    }

    /// Stop following. Harmless no-op when idle.
    pub fn stop(&self) -> bool {
        let mut job = self.job.lock().unwrap();
        match job.take() {
            Some(j) => {
                let _ = j.shutdown.send(true);
                info!("Tail stopped");
                true
            }
            None => false,
        }
    }

    pub fn status(&self) -> TailStatus {
        let job = self.job.lock().unwrap();
        TailStatus {
            running: job.is_some(),
            path: job.as_ref().map(|j| j.path.clone()),
        }
    }
}
