//! Session persistence using SQLite

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::session::{ChatTurn, Session};
use crate::{Error, Result};

/// SQLite-based session store
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open (or create) a session store at the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        // WAL keeps readers from blocking the write path
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory session store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                language TEXT NOT NULL,
                role TEXT NOT NULL,
                journey_stage TEXT NOT NULL,
                answers TEXT NOT NULL,
                history TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_active_at TEXT NOT NULL
            )",
            [],
        )?;

        // The expiry sweep scans by last activity
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_last_active_at
             ON sessions(last_active_at)",
            [],
        )?;

        Ok(())
    }

    /// Save a session (insert or replace)
    pub fn save(&self, session: &Session) -> Result<()> {
        let answers_json = serde_json::to_string(&session.answers)?;
        let history_json = serde_json::to_string(&session.history)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions
             (id, language, role, journey_stage, answers, history,
              created_at, updated_at, last_active_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id,
                session.language,
                session.role.as_str(),
                session.journey_stage.as_str(),
                answers_json,
                history_json,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
                session.last_active_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load a session by ID
    pub fn load(&self, id: &str) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, language, role, journey_stage, answers, history,
                    created_at, updated_at, last_active_at
             FROM sessions WHERE id = ?1",
        )?;

        let result = stmt.query_row(params![id], row_to_session);

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Delete a session by ID. Returns true if a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Delete all sessions last active before `cutoff`. Returns the count.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM sessions WHERE last_active_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Count stored sessions
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Map a sessions row back to a `Session`
fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let role_str: String = row.get(2)?;
    let stage_str: String = row.get(3)?;
    let answers_json: String = row.get(4)?;
    let history_json: String = row.get(5)?;

    let role = role_str
        .parse()
        .map_err(|_| rusqlite::Error::InvalidQuery)?;
    let journey_stage = stage_str
        .parse()
        .map_err(|_| rusqlite::Error::InvalidQuery)?;
    let answers: serde_json::Value =
        serde_json::from_str(&answers_json).map_err(|_| rusqlite::Error::InvalidQuery)?;
    let history: Vec<ChatTurn> =
        serde_json::from_str(&history_json).map_err(|_| rusqlite::Error::InvalidQuery)?;

    Ok(Session {
        id: row.get(0)?,
        language: row.get(1)?,
        role,
        journey_stage,
        answers,
        history,
        created_at: parse_timestamp(row, 6)?,
        updated_at: parse_timestamp(row, 7)?,
        last_active_at: parse_timestamp(row, 8)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidQuery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ChatTurn, JourneyStage, Role};
    use chrono::Duration;

    #[test]
    fn test_save_and_load() {
        let store = SessionStore::in_memory().unwrap();
        let mut session = Session::new("en", Role::Patient, JourneyStage::ExploringOptions);
        session.push_turn(ChatTurn::user("What is home dialysis?"));
        session.answers = serde_json::json!({ "q1": "a" });

        store.save(&session).unwrap();
        let loaded = store.load(&session.id).unwrap().unwrap();

        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.language, "en");
        assert_eq!(loaded.role, Role::Patient);
        assert_eq!(loaded.journey_stage, JourneyStage::ExploringOptions);
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.answers["q1"], "a");
    }

    #[test]
    fn test_load_missing() {
        let store = SessionStore::in_memory().unwrap();
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let store = SessionStore::in_memory().unwrap();
        let session = Session::new("pl", Role::Family, JourneyStage::Preparing);

        store.save(&session).unwrap();
        assert!(store.delete(&session.id).unwrap());
        assert!(!store.delete(&session.id).unwrap());
        assert!(store.load(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_purge_older_than() {
        let store = SessionStore::in_memory().unwrap();

        let fresh = Session::new("en", Role::Patient, JourneyStage::Deciding);
        let mut stale = Session::new("en", Role::Patient, JourneyStage::Deciding);
        stale.last_active_at = Utc::now() - Duration::minutes(30);

        store.save(&fresh).unwrap();
        store.save(&stale).unwrap();

        let purged = store
            .purge_older_than(Utc::now() - Duration::minutes(15))
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.load(&fresh.id).unwrap().is_some());
    }

    #[test]
    fn test_file_store_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = SessionStore::new(path.to_str().unwrap()).unwrap();

        let mode: String = store
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
