//! Incident persistence and stage transitions.

use chrono::Utc;
use serde::Serialize;

use crate::classify::{event_description, Severity};
use crate::storage::Pool;

use super::{Stage, WorkflowError};

/// A tracked security event progressing through the workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: i64,
    pub log_id: i64,
    pub event_type: String,
    pub event_description: String,
    pub severity: Severity,
    pub current_stage: Stage,
    pub detected_at: String,
    pub analyzed_at: Option<String>,
    pub contained_at: Option<String>,
    pub recovered_at: Option<String>,
    pub containment_proposed: Option<String>,
}

/// One row of an incident's stage timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub stage: Stage,
    pub timestamp: Option<String>,
    pub completed: bool,
}

/// Per-stage and per-severity incident counts for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub detection: i64,
    pub analysis: i64,
    pub containment: i64,
    pub recovery: i64,
    pub total: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

pub struct IncidentManager {
    pool: Pool,
}

const INCIDENT_COLS: &str = "id, log_id, event_type, severity, current_stage, detected_at, \
                             analyzed_at, contained_at, recovered_at, containment_proposed";

impl IncidentManager {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new incident at the Detection stage.
    pub fn create(
        &self,
        log_id: i64,
        event_type: &str,
        severity: Severity,
    ) -> Result<i64, WorkflowError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO incidents (log_id, event_type, severity, current_stage, detected_at)
             VALUES (?1, ?2, ?3, 'Detection', ?4)",
            rusqlite::params![log_id, event_type, severity.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Incident, WorkflowError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {INCIDENT_COLS} FROM incidents WHERE id = ?1"))?;
        let mut rows = stmt.query_map([id], incident_from_row)?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Err(WorkflowError::NotFound(id)),
        }
    }

    /// List incidents, newest first, optionally filtered by stage.
    pub fn list(&self, stage: Option<Stage>, limit: usize) -> Result<Vec<Incident>, WorkflowError> {
        let conn = self.pool.get()?;
        let incidents = match stage {
            Some(stage) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {INCIDENT_COLS} FROM incidents WHERE current_stage = ?1
                     ORDER BY id DESC LIMIT ?2"
                ))?;
                let rows =
                    stmt.query_map(rusqlite::params![stage.as_str(), limit], incident_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {INCIDENT_COLS} FROM incidents ORDER BY id DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map([limit], incident_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(incidents)
    }

    /// Advance an incident to `target`, which must be the immediate
    /// successor of its current stage.
    ///
    /// The update is a compare-and-set on `current_stage`: if another
    /// caller advanced the incident first, the set matches zero rows and
    /// the stale caller gets `InvalidTransition`.
    pub fn advance(&self, id: i64, target: Stage) -> Result<(), WorkflowError> {
        let current = self.get(id)?.current_stage;

        match current.successor() {
            Some(next) if next == target => {}
            _ => return Err(WorkflowError::InvalidTransition { from: current, to: target }),
        }

        let ts_field = match target {
            Stage::Analysis => "analyzed_at",
            Stage::Containment => "contained_at",
            Stage::Recovery => "recovered_at",
            // Nothing advances back into Detection.
            Stage::Detection => {
                return Err(WorkflowError::InvalidTransition { from: current, to: target })
            }
        };

        let conn = self.pool.get()?;
        let changed = conn.execute(
            &format!(
                "UPDATE incidents SET current_stage = ?1, {ts_field} = ?2
                 WHERE id = ?3 AND current_stage = ?4"
            ),
            rusqlite::params![target.as_str(), Utc::now().to_rfc3339(), id, current.as_str()],
        )?;

        if changed == 0 {
            // Lost the race: someone else moved the incident first.
            return Err(WorkflowError::InvalidTransition { from: current, to: target });
        }
        Ok(())
    }

    /// Record that a containment action was proposed (never applied).
    /// First write wins; returns whether this call recorded it, so callers
    /// can notify exactly once per incident.
    pub fn mark_containment_proposed(&self, id: i64, action: &str) -> Result<bool, WorkflowError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE incidents SET containment_proposed = ?1
             WHERE id = ?2 AND containment_proposed IS NULL",
            rusqlite::params![action, id],
        )?;
        Ok(changed > 0)
    }

    /// Stage timeline for one incident, in lifecycle order.
    pub fn timeline(&self, id: i64) -> Result<Vec<TimelineEntry>, WorkflowError> {
        let incident = self.get(id)?;
        let stamps = [
            Some(incident.detected_at.clone()),
            incident.analyzed_at.clone(),
            incident.contained_at.clone(),
            incident.recovered_at.clone(),
        ];
        Ok(Stage::ALL
            .iter()
            .zip(stamps)
            .map(|(stage, timestamp)| TimelineEntry {
                stage: *stage,
                completed: timestamp.is_some(),
                timestamp,
            })
            .collect())
    }

    /// Per-stage counts, recomputed on demand.
    pub fn summary(&self) -> Result<WorkflowSummary, WorkflowError> {
        let conn = self.pool.get()?;
        let stage_count = |stage: Stage| -> Result<i64, WorkflowError> {
            Ok(conn.query_row(
                "SELECT count(*) FROM incidents WHERE current_stage = ?1",
                [stage.as_str()],
                |row| row.get(0),
            )?)
        };
        let severity_count = |sev: Severity| -> Result<i64, WorkflowError> {
            Ok(conn.query_row(
                "SELECT count(*) FROM incidents WHERE severity = ?1",
                [sev.as_str()],
                |row| row.get(0),
            )?)
        };
        let total: i64 = conn.query_row("SELECT count(*) FROM incidents", [], |row| row.get(0))?;

        Ok(WorkflowSummary {
            detection: stage_count(Stage::Detection)?,
            analysis: stage_count(Stage::Analysis)?,
            containment: stage_count(Stage::Containment)?,
            recovery: stage_count(Stage::Recovery)?,
            total,
            high: severity_count(Severity::High)?,
            medium: severity_count(Severity::Medium)?,
            low: severity_count(Severity::Low)?,
        })
    }
}

fn incident_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Incident> {
    let event_type: String = row.get(2)?;
    let severity: String = row.get(3)?;
    let stage: String = row.get(4)?;
    Ok(Incident {
        id: row.get(0)?,
        log_id: row.get(1)?,
        event_description: event_description(&event_type),
        event_type,
        severity: severity.parse().unwrap_or(Severity::Low),
        current_stage: stage.parse().unwrap_or(Stage::Detection),
        detected_at: row.get(5)?,
        analyzed_at: row.get(6)?,
        contained_at: row.get(7)?,
        recovered_at: row.get(8)?,
        containment_proposed: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;

    fn manager() -> (tempfile::TempDir, IncidentManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.db");
        let pool = storage::open_pool(path.to_str().unwrap()).unwrap();
        // Seed log rows with ids 1 and 2 so incidents satisfy the
        // incidents.log_id -> logs.id foreign key.
        let lines: Vec<_> = ["seed one", "seed two"]
            .iter()
            .map(|m| crate::ingest::ParsedLine {
                raw: m.to_string(),
                ts: None,
                level: None,
                message: m.to_string(),
            })
            .collect();
        storage::insert_lines(&pool, &lines).unwrap();
        (dir, IncidentManager::new(pool))
    }

    #[test]
    fn test_create_starts_at_detection() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "failed_login", Severity::High).unwrap();
        let incident = mgr.get(id).unwrap();
        assert_eq!(incident.current_stage, Stage::Detection);
        assert_eq!(incident.event_description, "Failed Login Attempt");
        assert!(incident.analyzed_at.is_none());
    }

    #[test]
    fn test_advance_through_lifecycle() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "port_scan", Severity::High).unwrap();

        mgr.advance(id, Stage::Analysis).unwrap();
        mgr.advance(id, Stage::Containment).unwrap();
        mgr.advance(id, Stage::Recovery).unwrap();

        let incident = mgr.get(id).unwrap();
        assert_eq!(incident.current_stage, Stage::Recovery);
        assert!(incident.recovered_at.is_some());
    }

    #[test]
    fn test_skip_is_rejected() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "web_attack", Severity::High).unwrap();
        let err = mgr.advance(id, Stage::Containment).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition { from: Stage::Detection, to: Stage::Containment }
        ));
        // Stage unchanged after the rejection.
        assert_eq!(mgr.get(id).unwrap().current_stage, Stage::Detection);
    }

    #[test]
    fn test_backward_is_rejected() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "web_attack", Severity::High).unwrap();
        mgr.advance(id, Stage::Analysis).unwrap();
        assert!(mgr.advance(id, Stage::Detection).is_err());
    }

    #[test]
    fn test_terminal_stage_rejects_everything() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "malware_detection", Severity::High).unwrap();
        mgr.advance(id, Stage::Analysis).unwrap();
        mgr.advance(id, Stage::Containment).unwrap();
        mgr.advance(id, Stage::Recovery).unwrap();

        for target in Stage::ALL {
            assert!(mgr.advance(id, target).is_err());
        }
    }

    #[test]
    fn test_containment_proposal_is_recorded_once() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "failed_login", Severity::High).unwrap();

        assert!(mgr.mark_containment_proposed(id, "Block the source IP").unwrap());
        // Repeat reads must not overwrite or re-report the proposal.
        assert!(!mgr.mark_containment_proposed(id, "Different action").unwrap());
        assert_eq!(
            mgr.get(id).unwrap().containment_proposed.as_deref(),
            Some("Block the source IP")
        );
    }

    #[test]
    fn test_missing_incident() {
        let (_dir, mgr) = manager();
        assert!(matches!(mgr.advance(42, Stage::Analysis), Err(WorkflowError::NotFound(42))));
    }

    #[test]
    fn test_summary_counts() {
        let (_dir, mgr) = manager();
        let a = mgr.create(1, "failed_login", Severity::Medium).unwrap();
        mgr.create(2, "port_scan", Severity::High).unwrap();
        mgr.advance(a, Stage::Analysis).unwrap();

        let summary = mgr.summary().unwrap();
        assert_eq!(summary.detection, 1);
        assert_eq!(summary.analysis, 1);
        assert_eq!(summary.containment, 0);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
    }

    #[test]
    fn test_timeline_order() {
        let (_dir, mgr) = manager();
        let id = mgr.create(1, "failed_login", Severity::Medium).unwrap();
        mgr.advance(id, Stage::Analysis).unwrap();

        let timeline = mgr.timeline(id).unwrap();
        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline[0].stage, Stage::Detection);
        assert!(timeline[0].completed);
        assert!(timeline[1].completed);
        assert!(!timeline[2].completed);
        assert!(!timeline[3].completed);
    }
}
