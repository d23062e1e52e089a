use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use super::models::StoredSession;
use crate::common::types::User;

/// Pref key cho theme (giá trị "dark" hoặc "light").
pub const PREF_THEME: &str = "theme";

/// Persistent client-side state: phiên đăng nhập (một dòng duy nhất) và
/// UI preferences dạng key/value.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Initialize store at default location
    pub fn new() -> SqlResult<Self> {
        Self::with_path("data/client.db")
    }

    /// Initialize store at custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SqlResult<()> {
        // Session table (single row)
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                token TEXT NOT NULL,
                user_json TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;

        // Prefs table
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS prefs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    // ========== Session ==========

    /// Save session (replace if exists, keep original created_at)
    pub fn save_session(&self, token: &str, user: &User) -> SqlResult<()> {
        let user_json = serde_json::to_string(user).map_err(json_error)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, token, user_json, created_at)
             VALUES (1, ?1, ?2, COALESCE((SELECT created_at FROM session WHERE id = 1), strftime('%s', 'now')))",
            params![token, user_json],
        )?;
        Ok(())
    }

    pub fn load_session(&self) -> SqlResult<Option<StoredSession>> {
        let row = self
            .conn
            .prepare("SELECT token, user_json, created_at FROM session WHERE id = 1")?
            .query_row([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .optional()?;

        let Some((token, user_json, created_at)) = row else {
            return Ok(None);
        };
        let user = serde_json::from_str(&user_json).map_err(json_error)?;
        Ok(Some(StoredSession {
            token,
            user,
            created_at,
        }))
    }

    /// Destroy the stored session (logout)
    pub fn clear_session(&self) -> SqlResult<()> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }

    // ========== Prefs ==========

    pub fn set_pref(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO prefs (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_pref(&self, key: &str) -> SqlResult<Option<String>> {
        self.conn
            .prepare("SELECT value FROM prefs WHERE key = ?1")?
            .query_row(params![key], |row| row.get(0))
            .optional()
    }
}

fn json_error(err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn session_survives_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.db");

        {
            let store = SessionStore::with_path(&path).unwrap();
            store.save_session("t0k", &test_user()).unwrap();
        }

        let store = SessionStore::with_path(&path).unwrap();
        let session = store.load_session().unwrap().expect("session should persist");
        assert_eq!(session.token, "t0k");
        assert_eq!(session.user.id, "u1");
        assert_eq!(session.user.email, "ada@example.com");
    }

    #[test]
    fn empty_store_has_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::with_path(dir.path().join("client.db")).unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn save_session_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::with_path(dir.path().join("client.db")).unwrap();

        store.save_session("first", &test_user()).unwrap();
        let other = User {
            id: "u2".to_string(),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
        };
        store.save_session("second", &other).unwrap();

        let session = store.load_session().unwrap().unwrap();
        assert_eq!(session.token, "second");
        assert_eq!(session.user.id, "u2");
    }

    #[test]
    fn clear_session_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::with_path(dir.path().join("client.db")).unwrap();

        store.save_session("t0k", &test_user()).unwrap();
        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn prefs_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::with_path(dir.path().join("client.db")).unwrap();

        assert!(store.get_pref(PREF_THEME).unwrap().is_none());
        store.set_pref(PREF_THEME, "dark").unwrap();
        assert_eq!(store.get_pref(PREF_THEME).unwrap().as_deref(), Some("dark"));
        store.set_pref(PREF_THEME, "light").unwrap();
        assert_eq!(store.get_pref(PREF_THEME).unwrap().as_deref(), Some("light"));
    }
}
