//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT,
            level TEXT,
            message TEXT NOT NULL,
            raw TEXT NOT NULL,
            added_at TEXT NOT NULL DEFAULT (datetime('now')),
            anomaly_score REAL,
            is_anomaly INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS incidents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            log_id INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            current_stage TEXT NOT NULL DEFAULT 'Detection',
            detected_at TEXT NOT NULL,
            analyzed_at TEXT,
            contained_at TEXT,
            recovered_at TEXT,
            containment_proposed TEXT,
            FOREIGN KEY (log_id) REFERENCES logs(id)
        );

        CREATE INDEX IF NOT EXISTS idx_logs_added ON logs(added_at);
        CREATE INDEX IF NOT EXISTS idx_logs_score ON logs(anomaly_score);
        CREATE INDEX IF NOT EXISTS idx_incidents_stage ON incidents(current_stage);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error
    }
}
