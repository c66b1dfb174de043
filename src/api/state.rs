use std::sync::Arc;

use crate::detect::AnalysisEngine;
use crate::ingest::tail::LogTailer;
use crate::notify::SharedSink;
use crate::scheduler::CollectionScheduler;
use crate::storage::Pool;
use crate::workflow::IncidentManager;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub engine: Arc<AnalysisEngine>,
    pub incidents: Arc<IncidentManager>,
    pub scheduler: CollectionScheduler,
    pub tailer: Arc<LogTailer>,
    pub notifier: SharedSink,
}
