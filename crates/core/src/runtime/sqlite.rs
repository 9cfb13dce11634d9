use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::history::{HistoryEntry, HistoryError, HistoryEvent, HistoryStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS run_history (
        run_id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        recorded_at TEXT NOT NULL,
        event_type TEXT NOT NULL,
        data TEXT NOT NULL,
        PRIMARY KEY (run_id, seq)
    );

    CREATE INDEX IF NOT EXISTS idx_run_history_event_type ON run_history(event_type);
"#;

/// SQLite-backed history store. Histories survive worker restarts.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`.
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn event_type(event: &HistoryEvent) -> &'static str {
    match event {
        HistoryEvent::RunStarted { .. } => "run_started",
        HistoryEvent::TimeRecorded { .. } => "time_recorded",
        HistoryEvent::ActivityCompleted { .. } => "activity_completed",
        HistoryEvent::ActivityFailed { .. } => "activity_failed",
        HistoryEvent::TimerFired { .. } => "timer_fired",
        HistoryEvent::RunCompleted { .. } => "run_completed",
        HistoryEvent::RunRejected { .. } => "run_rejected",
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self, run_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT seq, recorded_at, data FROM run_history WHERE run_id = ? ORDER BY seq")
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                let seq: i64 = row.get(0)?;
                let recorded_at: String = row.get(1)?;
                let data: String = row.get(2)?;
                Ok((seq, recorded_at, data))
            })
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (seq, recorded_at, data) = row.map_err(|e| HistoryError::Database(e.to_string()))?;

            let recorded_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| HistoryError::Database(format!("Invalid timestamp: {}", e)))?
                .into();
            let event: HistoryEvent = serde_json::from_str(&data)
                .map_err(|e| HistoryError::Serialization(e.to_string()))?;

            entries.push(HistoryEntry {
                seq: seq as u64,
                recorded_at,
                event,
            });
        }

        Ok(entries)
    }

    fn append(
        &self,
        run_id: &str,
        recorded_at: DateTime<Utc>,
        event: &HistoryEvent,
    ) -> Result<u64, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let data =
            serde_json::to_string(event).map_err(|e| HistoryError::Serialization(e.to_string()))?;

        let seq: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM run_history WHERE run_id = ?",
                params![run_id],
                |row| row.get(0),
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO run_history (run_id, seq, recorded_at, event_type, data) VALUES (?, ?, ?, ?, ?)",
            params![
                run_id,
                seq,
                recorded_at.to_rfc3339(),
                event_type(event),
                data,
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(seq as u64)
    }
}
