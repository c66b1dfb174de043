//! Scoring and incident-creation engine.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use tracing::{info, warn};

use crate::classify::{classify_event, Severity};
use crate::model::{Scorer, TokenFrequencyScorer};
use crate::notify::SharedSink;
use crate::storage::{self, Pool};
use crate::workflow::{warrants_incident, IncidentManager};

use super::{AnalysisReport, Anomaly};

pub struct AnalysisEngine {
    pool: Pool,
    scorer: Mutex<TokenFrequencyScorer>,
    incidents: IncidentManager,
    notifier: SharedSink,
}

impl AnalysisEngine {
    pub fn new(pool: Pool, notifier: SharedSink) -> Self {
        let incidents = IncidentManager::new(pool.clone());
        Self {
            pool,
            scorer: Mutex::new(TokenFrequencyScorer::new()),
            incidents,
            notifier,
        }
    }

    /// Fit the scorer to the full corpus. Returns the sample count.
    pub fn train(&self) -> Result<usize> {
        let records = storage::all_records(&self.pool)?;
        let trained = self.scorer.lock().unwrap().train(&records);
        info!(samples = trained, "Scorer trained");
        Ok(trained)
    }

    /// Score the corpus, persist scores, and create incidents for
    /// Medium/High anomalies. Trains first when the scorer is cold.
    pub fn analyze(&self) -> Result<AnalysisReport> {
        let records = storage::all_records(&self.pool)?;

        let scored = {
            let mut scorer = self.scorer.lock().unwrap();
            if !scorer.is_trained() {
                scorer.train(&records);
            }
            scorer.score(&records)
        };

        if scored.is_empty() {
            // Scoring unavailable: records stay unscored and classify as
            // Pending downstream.
            warn!("Scorer produced no scores; corpus may be empty");
            return Ok(AnalysisReport { total: 0, anomalies: Vec::new(), incidents_created: 0 });
        }

        storage::apply_scores(&self.pool, &scored)?;

        let by_id: HashMap<i64, &storage::LogRecord> =
            records.iter().map(|r| (r.id, r)).collect();

        let mut anomalies: Vec<Anomaly> = scored
            .iter()
            .filter(|s| s.is_anomaly)
            .filter_map(|s| {
                by_id.get(&s.id).map(|r| Anomaly {
                    id: s.id,
                    message: r.message.clone(),
                    score: s.score,
                })
            })
            .collect();
        anomalies.sort_by(|a, b| b.score.total_cmp(&a.score));

        let incidents_created = self.create_incidents(&anomalies, &by_id)?;

        Ok(AnalysisReport { total: scored.len(), anomalies, incidents_created })
    }

    fn create_incidents(
        &self,
        anomalies: &[Anomaly],
        by_id: &HashMap<i64, &storage::LogRecord>,
    ) -> Result<usize> {
        let mut created = 0;
        for anomaly in anomalies {
            let level = by_id.get(&anomaly.id).and_then(|r| r.level.as_deref());
            let (event_type, severity) =
                classify_event(&anomaly.message, level, Some(anomaly.score));

            if !warrants_incident(severity) {
                continue;
            }

            let incident_id = self.incidents.create(anomaly.id, event_type, severity)?;
            info!(incident_id, event_type, severity = %severity, "Incident created");
            created += 1;

            if severity == Severity::High {
                self.notifier.notify("High severity anomaly detected", &anomaly.message);
            }
        }
        Ok(created)
    }
}
