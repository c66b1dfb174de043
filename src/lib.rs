//! logtriage -- log anomaly triage and incident-response workflow engine.
//!
//! This crate ingests operational log lines, scores them for
//! anomalousness, classifies them into explanations and suggested
//! containment actions, and drives detected security events through the
//! Detection -> Analysis -> Containment -> Recovery lifecycle.

pub mod api;
pub mod classify;
pub mod detect;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod scheduler;
pub mod storage;
pub mod workflow;

use std::sync::Arc;

use anyhow::Result;

use crate::api::state::AppState;
use crate::detect::AnalysisEngine;
use crate::ingest::collect::JournalSource;
use crate::ingest::tail::LogTailer;
use crate::notify::{SharedSink, TracingNotifier};
use crate::scheduler::CollectionScheduler;
use crate::workflow::IncidentManager;

/// Start the logtriage daemon: API server plus collection scheduler.
pub async fn serve(bind: &str, db_path: &str) -> Result<()> {
    tracing::info!(%db_path, "Initializing database");
    let pool = storage::open_pool(db_path)?;

    let notifier: SharedSink = Arc::new(TracingNotifier);
    let engine = Arc::new(AnalysisEngine::new(pool.clone(), notifier.clone()));
    let incidents = Arc::new(IncidentManager::new(pool.clone()));
    let scheduler =
        CollectionScheduler::new(pool.clone(), engine.clone(), Arc::new(JournalSource));
    let tailer = Arc::new(LogTailer::new(pool.clone()));

    let state = AppState {
        pool,
        engine,
        incidents,
        scheduler,
        tailer,
        notifier,
    };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, "logtriage listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
