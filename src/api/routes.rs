//! API route definitions and handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::classify::{explain, mitigate, Severity};
use crate::ingest;
use crate::normalize;
use crate::scheduler::{DEFAULT_INTERVAL_SECS, DEFAULT_MAX_ITEMS};
use crate::storage;
use crate::workflow::{Stage, WorkflowError};

use super::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/logs", get(list_logs).post(ingest_logs))
        .route("/logs/clear", post(clear_logs))
        .route("/stats/severity", get(severity_stats))
        .route("/analyze", post(analyze))
        .route("/incidents", get(list_incidents))
        .route("/incidents/{id}", get(incident_detail))
        .route("/incidents/{id}/advance", post(advance_incident))
        .route("/workflow/summary", get(workflow_summary))
        .route("/mitigation/recommend", post(recommend_mitigation))
        .route("/schedule/start", post(schedule_start))
        .route("/schedule/stop", post(schedule_stop))
        .route("/schedule/status", get(schedule_status))
        .route("/tail/start", post(tail_start))
        .route("/tail/stop", post(tail_stop))
        .route("/tail/status", get(tail_status))
}

type ApiError = (StatusCode, Json<Value>);

fn err(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    err(StatusCode::INTERNAL_SERVER_ERROR, e)
}

fn workflow_err(e: WorkflowError) -> ApiError {
    let status = match e {
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
        WorkflowError::UnknownStage(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Pool(_) | WorkflowError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    err(status, e)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
    stage: Option<String>,
}

/// Display projection: each record carries its recomputed structured view,
/// severity band, and insight.
async fn list_logs(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Value>, ApiError> {
    let records = storage::recent(&state.pool, q.limit.unwrap_or(500)).map_err(internal)?;
    let items: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "ts": r.ts,
                "level": r.level,
                "message": r.message,
                "added_at": r.added_at,
                "score": r.anomaly_score,
                "is_anomaly": r.is_anomaly,
                "severity": Severity::from_score(r.anomaly_score).as_str(),
                "structured": normalize::structure(&r.message),
                "insight": explain(&r.message),
            })
        })
        .collect();
    Ok(Json(json!({ "total": items.len(), "logs": items })))
}

/// Plain-text body of raw log lines.
async fn ingest_logs(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let parsed = ingest::parse_body(&body);
    let inserted = storage::insert_lines(&state.pool, &parsed).map_err(internal)?;
    Ok(Json(json!({ "inserted": inserted })))
}

async fn clear_logs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    storage::clear_all(&state.pool).map_err(internal)?;
    Ok(Json(json!({ "status": "cleared" })))
}

async fn severity_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let counts = storage::severity_counts(&state.pool).map_err(internal)?;
    Ok(Json(json!({
        "High": counts.high,
        "Medium": counts.medium,
        "Low": counts.low,
        "Pending": counts.pending,
    })))
}

/// Score the corpus and auto-create incidents. Training and scoring run on
/// the blocking pool so requests are not held up by them.
async fn analyze(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let engine = state.engine.clone();
    let report = tokio::task::spawn_blocking(move || engine.analyze())
        .await
        .map_err(internal)?
        .map_err(internal)?;
    Ok(Json(json!(report)))
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Value>, ApiError> {
    let stage = match q.stage.as_deref() {
        Some(s) => Some(s.parse::<Stage>().map_err(workflow_err)?),
        None => None,
    };
    let incidents = state
        .incidents
        .list(stage, q.limit.unwrap_or(100))
        .map_err(workflow_err)?;
    Ok(Json(json!({ "total": incidents.len(), "incidents": incidents })))
}

/// Incident detail: source log, stage timeline, and the proposed
/// mitigation. The first read marks containment as proposed (never
/// applied) and notifies the sink; repeat reads are side-effect free.
async fn incident_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let incident = state.incidents.get(id).map_err(workflow_err)?;
    let log = storage::get_record(&state.pool, incident.log_id).map_err(internal)?;
    let timeline = state.incidents.timeline(id).map_err(workflow_err)?;

    let mitigation = log.as_ref().and_then(|l| mitigate(&l.message));
    if let Some(m) = &mitigation {
        let newly_proposed = state
            .incidents
            .mark_containment_proposed(id, &m.action)
            .map_err(workflow_err)?;
        if newly_proposed {
            state.notifier.notify("Containment proposed", &m.action);
        }
    }

    Ok(Json(json!({
        "incident": incident,
        "log": log,
        "timeline": timeline,
        "mitigation": mitigation,
    })))
}

#[derive(Deserialize)]
struct AdvanceRequest {
    stage: String,
}

async fn advance_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<Value>, ApiError> {
    let target: Stage = req.stage.parse().map_err(workflow_err)?;
    state.incidents.advance(id, target).map_err(workflow_err)?;
    Ok(Json(json!({ "status": "advanced", "stage": target.as_str() })))
}

async fn workflow_summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let summary = state.incidents.summary().map_err(workflow_err)?;
    Ok(Json(json!(summary)))
}

#[derive(Deserialize)]
struct RecommendRequest {
    message: String,
}

async fn recommend_mitigation(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<Value>, ApiError> {
    let mitigation = mitigate(&req.message);
    if let Some(m) = &mitigation {
        state.notifier.notify("Containment proposed", &m.action);
    }
    Ok(Json(json!({
        "explanation": explain(&req.message),
        "mitigation": mitigation,
    })))
}

#[derive(Deserialize, Default)]
struct ScheduleStartRequest {
    interval_secs: Option<u64>,
    max_items: Option<usize>,
}

async fn schedule_start(
    State(state): State<AppState>,
    body: Option<Json<ScheduleStartRequest>>,
) -> Json<Value> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let reply = state.scheduler.start(
        req.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
        req.max_items.unwrap_or(DEFAULT_MAX_ITEMS),
    );
    Json(json!(reply))
}

async fn schedule_stop(State(state): State<AppState>) -> Json<Value> {
    state.scheduler.stop();
    Json(json!({ "stopped": true }))
}

async fn schedule_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.scheduler.status()))
}

#[derive(Deserialize, Default)]
struct TailStartRequest {
    path: Option<String>,
}

async fn tail_start(
    State(state): State<AppState>,
    body: Option<Json<TailStartRequest>>,
) -> Json<Value> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let status = state
        .tailer
        .start(req.path.as_deref().unwrap_or(ingest::tail::DEFAULT_TAIL_PATH));
    Json(json!(status))
}

async fn tail_stop(State(state): State<AppState>) -> Json<Value> {
    state.tailer.stop();
    Json(json!({ "stopped": true }))
}

async fn tail_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.tailer.status()))
}
