//! Anomaly analysis: score stored records, select anomalies, and create
//! incidents for the ones that warrant tracking.

mod engine;

pub use engine::AnalysisEngine;

use serde::Serialize;

/// A record selected by a scoring run as exceeding the anomaly threshold.
/// Transient; derived per analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub id: i64,
    pub message: String,
    pub score: f64,
}

/// Outcome of one analysis pass.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub total: usize,
    pub anomalies: Vec<Anomaly>,
    pub incidents_created: usize,
}
