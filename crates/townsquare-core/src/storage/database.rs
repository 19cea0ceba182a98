//! SQLite access to the learning-platform tables the feed reads.
//!
//! Provides:
//! - Feature-gate lookups against the `modules` registry
//! - Activity instance name lookups
//! - Activity completion state per user
//! - Insert helpers used to populate a store (imports, tests)

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::migrations;
use crate::error::{DatabaseError, Result};

/// A calendar row as stored, including its duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub name: String,
    pub courseid: i64,
    pub groupid: i64,
    pub userid: i64,
    pub modulename: String,
    pub instance: i64,
    pub eventtype: String,
    pub timestart: i64,
    pub timeduration: i64,
    pub timemodified: i64,
    pub visible: bool,
}

/// SQLite database holding the event, module and completion tables.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn).map_err(DatabaseError::MigrationFailed)?;
        Ok(())
    }

    /// Whether the module `name` is installed and enabled site-wide.
    pub fn module_enabled(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT id FROM modules WHERE name = ?1 AND visible = 1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Display name of an activity instance, looked up in the module's own
    /// table. Returns `None` when the row is missing, the module has no
    /// instance table, or `modulename` is not a plain table identifier.
    pub fn instance_name(&self, modulename: &str, instance: i64) -> Result<Option<String>> {
        if !is_plain_identifier(modulename) {
            tracing::warn!(modulename, "refusing instance lookup for non-identifier module name");
            return Ok(None);
        }
        let sql = format!("SELECT name FROM {modulename} WHERE id = ?1");
        match self
            .conn
            .query_row(&sql, params![instance], |row| row.get::<_, String>(0))
            .optional()
        {
            Ok(name) => Ok(name),
            Err(rusqlite::Error::SqliteFailure(_, Some(msg)))
                if msg.starts_with("no such table") =>
            {
                tracing::warn!(modulename, instance, "module has no instance table");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Course modules the user has completed (any positive completion state).
    pub fn completed_course_modules(&self, userid: i64) -> Result<HashSet<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT coursemoduleid FROM course_modules_completion
             WHERE userid = ?1 AND completionstate > 0",
        )?;
        let rows = stmt.query_map(params![userid], |row| row.get::<_, i64>(0))?;
        let mut completed = HashSet::new();
        for row in rows {
            completed.insert(row?);
        }
        Ok(completed)
    }

    /// Register a module type, returning its id.
    pub fn add_module(&self, name: &str, visible: bool) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO modules (name, visible) VALUES (?1, ?2)",
            params![name, visible as i64],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Enable or disable a module type site-wide.
    pub fn set_module_visible(&self, name: &str, visible: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE modules SET visible = ?2 WHERE name = ?1",
            params![name, visible as i64],
        )?;
        Ok(())
    }

    /// Insert a ratingallocate activity instance, returning its id.
    pub fn add_ratingallocate(&self, course: i64, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO ratingallocate (course, name) VALUES (?1, ?2)",
            params![course, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Place an activity instance in a course, returning the course-module id.
    pub fn add_course_module(
        &self,
        course: i64,
        module: i64,
        instance: i64,
        availability: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO course_modules (course, module, instance, availability)
             VALUES (?1, ?2, ?3, ?4)",
            params![course, module, instance, availability],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a calendar event, returning its id.
    pub fn add_event(&self, event: &EventRow) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO event (name, courseid, groupid, userid, modulename, instance,
                                eventtype, timestart, timeduration, timemodified, visible)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.name,
                event.courseid,
                event.groupid,
                event.userid,
                event.modulename,
                event.instance,
                event.eventtype,
                event.timestart,
                event.timeduration,
                event.timemodified,
                event.visible as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record a user's completion state for a course module.
    pub fn set_completion(&self, coursemoduleid: i64, userid: i64, state: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO course_modules_completion (coursemoduleid, userid, completionstate)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (coursemoduleid, userid) DO UPDATE SET completionstate = excluded.completionstate",
            params![coursemoduleid, userid, state],
        )?;
        Ok(())
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_gate_follows_visibility() {
        let db = Database::open_memory().unwrap();
        assert!(!db.module_enabled("ratingallocate").unwrap());

        db.add_module("ratingallocate", true).unwrap();
        assert!(db.module_enabled("ratingallocate").unwrap());

        db.set_module_visible("ratingallocate", false).unwrap();
        assert!(!db.module_enabled("ratingallocate").unwrap());
    }

    #[test]
    fn instance_name_lookup() {
        let db = Database::open_memory().unwrap();
        let id = db.add_ratingallocate(5, "Seminar choice").unwrap();
        assert_eq!(
            db.instance_name("ratingallocate", id).unwrap().as_deref(),
            Some("Seminar choice")
        );
        assert_eq!(db.instance_name("ratingallocate", id + 1).unwrap(), None);
    }

    #[test]
    fn instance_name_rejects_injected_table_names() {
        let db = Database::open_memory().unwrap();
        db.add_ratingallocate(5, "x").unwrap();
        assert_eq!(
            db.instance_name("ratingallocate; DROP TABLE event", 1).unwrap(),
            None
        );
        assert_eq!(db.instance_name("", 1).unwrap(), None);
    }

    #[test]
    fn instance_name_without_module_table_is_empty() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.instance_name("quiz", 1).unwrap(), None);
    }

    #[test]
    fn completion_upsert_keeps_latest_state() {
        let db = Database::open_memory().unwrap();
        db.set_completion(10, 3, 1).unwrap();
        db.set_completion(20, 3, 0).unwrap();
        db.set_completion(30, 4, 1).unwrap();
        assert_eq!(db.completed_course_modules(3).unwrap(), HashSet::from([10]));

        db.set_completion(10, 3, 0).unwrap();
        assert!(db.completed_course_modules(3).unwrap().is_empty());
    }

    #[test]
    fn identifier_check() {
        assert!(is_plain_identifier("ratingallocate"));
        assert!(is_plain_identifier("mod_2"));
        assert!(!is_plain_identifier("2mod"));
        assert!(!is_plain_identifier("Mod"));
        assert!(!is_plain_identifier("a b"));
    }
}
