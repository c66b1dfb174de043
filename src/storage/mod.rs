//! SQLite storage layer -- schema, log store queries, migrations.

pub mod schema;

use anyhow::Result;
use chrono::Utc;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::Serialize;

use crate::ingest::ParsedLine;
use crate::model::ScoredRecord;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// A stored log record. Owned by this store; the engines only read it.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub id: i64,
    pub ts: Option<String>,
    pub level: Option<String>,
    pub message: String,
    pub raw: String,
    pub added_at: String,
    pub anomaly_score: Option<f64>,
    pub is_anomaly: bool,
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogRecord> {
    Ok(LogRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        level: row.get(2)?,
        message: row.get(3)?,
        raw: row.get(4)?,
        added_at: row.get(5)?,
        anomaly_score: row.get(6)?,
        is_anomaly: row.get::<_, i64>(7)? != 0,
    })
}

const RECORD_COLS: &str = "id, ts, level, message, raw, added_at, anomaly_score, is_anomaly";

/// Bulk-insert parsed lines. Returns the number inserted.
pub fn insert_lines(pool: &Pool, lines: &[ParsedLine]) -> Result<usize> {
    if lines.is_empty() {
        return Ok(0);
    }
    let mut conn = pool.get()?;
    let added_at = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO logs (ts, level, message, raw, added_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for line in lines {
            stmt.execute(rusqlite::params![
                line.ts,
                line.level,
                line.message,
                line.raw,
                added_at
            ])?;
        }
    }
    tx.commit()?;
    Ok(lines.len())
}

/// Fetch the most recent records, newest first.
pub fn recent(pool: &Pool, limit: usize) -> Result<Vec<LogRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLS} FROM logs ORDER BY id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map([limit], record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fetch every record, oldest first. Used for scorer training.
pub fn all_records(pool: &Pool) -> Result<Vec<LogRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLS} FROM logs ORDER BY id ASC"))?;
    let rows = stmt.query_map([], record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fetch one record by id.
pub fn get_record(pool: &Pool, id: i64) -> Result<Option<LogRecord>> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare(&format!("SELECT {RECORD_COLS} FROM logs WHERE id = ?1"))?;
    let mut rows = stmt.query_map([id], record_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Fetch records that have not been scored yet.
pub fn unscored(pool: &Pool) -> Result<Vec<LogRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLS} FROM logs WHERE anomaly_score IS NULL ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([], record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Write scores back onto their records.
pub fn apply_scores(pool: &Pool, scored: &[ScoredRecord]) -> Result<()> {
    if scored.is_empty() {
        return Ok(());
    }
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    {
        let mut stmt =
            tx.prepare("UPDATE logs SET anomaly_score = ?1, is_anomaly = ?2 WHERE id = ?3")?;
        for s in scored {
            stmt.execute(rusqlite::params![s.score, s.is_anomaly as i64, s.id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Severity counts over score bands. Boundary scores land in the lower band.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SeverityCounts {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub pending: i64,
}

pub fn severity_counts(pool: &Pool) -> Result<SeverityCounts> {
    let conn = pool.get()?;
    let count = |sql: &str| -> Result<i64> {
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    };
    Ok(SeverityCounts {
        high: count("SELECT count(*) FROM logs WHERE anomaly_score > 0.8")?,
        medium: count("SELECT count(*) FROM logs WHERE anomaly_score > 0.5 AND anomaly_score <= 0.8")?,
        low: count("SELECT count(*) FROM logs WHERE anomaly_score <= 0.5 AND anomaly_score IS NOT NULL")?,
        pending: count("SELECT count(*) FROM logs WHERE anomaly_score IS NULL")?,
    })
}

/// Delete everything: incidents first (FK), then logs, then reset sequences.
pub fn clear_all(pool: &Pool) -> Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(
        "DELETE FROM incidents;
         DELETE FROM logs;
         DELETE FROM sqlite_sequence WHERE name IN ('logs', 'incidents');",
    )?;
    Ok(())
}
