//! SQLite-backed record store.
//!
//! One JSON document per user plus presence columns. The same type backs
//! both the shared store (`records.db`) and the local cache (`cache.db`).

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::record::{SessionRecord, UserId};
use super::store::RecordStore;
use crate::error::StoreError;
use crate::events::PresenceStatus;

/// SQLite database holding user records.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the shared record store at `<data_dir>/records.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_records() -> Result<Self, StoreError> {
        Self::open_in_data_dir("records.db")
    }

    /// Open the local cache at `<data_dir>/cache.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_cache() -> Result<Self, StoreError> {
        Self::open_in_data_dir("cache.db")
    }

    fn open_in_data_dir(file: &str) -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open(&dir.join(file))
    }

    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::QueryFailed("connection mutex poisoned".into()))
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS students (
                user_id     TEXT PRIMARY KEY,
                record      TEXT,
                last_update INTEGER NOT NULL DEFAULT 0,
                status      TEXT,
                last_seen   INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_students_last_update ON students(last_update);",
        )?;
        Ok(())
    }

    /// Last presence label written for `user`, with its timestamp.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn status(&self, user: &UserId) -> Result<Option<(String, u64)>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT status, last_seen FROM students WHERE user_id = ?1",
                params![user.as_str()],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()?;
        Ok(match row {
            Some((Some(status), Some(seen))) => Some((status, seen.max(0) as u64)),
            _ => None,
        })
    }
}

impl RecordStore for Database {
    fn load(&self, user: &UserId) -> Result<Option<SessionRecord>, StoreError> {
        let conn = self.conn()?;
        let json: Option<Option<String>> = conn
            .query_row(
                "SELECT record FROM students WHERE user_id = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match json.flatten() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, user: &UserId, record: &SessionRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        self.conn()?.execute(
            "INSERT INTO students (user_id, record, last_update) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET record = excluded.record,
                                                last_update = excluded.last_update",
            params![user.as_str(), json, record.last_update as i64],
        )?;
        Ok(())
    }

    fn set_status(&self, user: &UserId, status: PresenceStatus, at_ms: u64) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO students (user_id, status, last_seen) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET status = excluded.status,
                                                last_seen = excluded.last_seen",
            params![user.as_str(), status.label(), at_ms as i64],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::Progress;

    fn user() -> UserId {
        UserId::new("student-7").unwrap()
    }

    #[test]
    fn load_missing_user_is_none() {
        let db = Database::open_memory().unwrap();
        assert!(db.load(&user()).unwrap().is_none());
    }

    #[test]
    fn save_overwrites_record() {
        let db = Database::open_memory().unwrap();
        let mut progress = Progress::default();
        progress.score.award(30);
        db.save(&user(), &SessionRecord::new(progress.clone(), 100)).unwrap();

        progress.current_skin = "ninja.png".into();
        db.save(&user(), &SessionRecord::new(progress.clone(), 200)).unwrap();

        let loaded = db.load(&user()).unwrap().unwrap();
        assert_eq!(loaded.last_update, 200);
        assert_eq!(loaded.progress, progress);
    }

    #[test]
    fn status_only_row_has_no_record() {
        let db = Database::open_memory().unwrap();
        db.set_status(&user(), PresenceStatus::SwitchedAway, 55).unwrap();
        assert!(db.load(&user()).unwrap().is_none());
        assert_eq!(
            db.status(&user()).unwrap(),
            Some(("switched away".to_string(), 55))
        );
    }

    #[test]
    fn status_update_keeps_record() {
        let db = Database::open_memory().unwrap();
        db.save(&user(), &SessionRecord::new(Progress::default(), 9)).unwrap();
        db.set_status(&user(), PresenceStatus::Online, 10).unwrap();
        assert_eq!(db.load(&user()).unwrap().unwrap().last_update, 9);
    }

    #[test]
    fn reopen_on_disk_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let db = Database::open(&path).unwrap();
            db.save(&user(), &SessionRecord::new(Progress::default(), 77)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.load(&user()).unwrap().unwrap().last_update, 77);
    }
}
