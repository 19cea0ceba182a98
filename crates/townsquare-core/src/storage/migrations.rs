//! Database schema migrations for the townsquare feed store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(tx: &Connection, version: i32) -> SqliteResult<()> {
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: module registry, course modules, calendar events and the
/// ratingallocate instance table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS modules (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            name    TEXT NOT NULL UNIQUE,
            visible INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS course_modules (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            course       INTEGER NOT NULL,
            module       INTEGER NOT NULL,
            instance     INTEGER NOT NULL,
            visible      INTEGER NOT NULL DEFAULT 1,
            availability TEXT
        );

        CREATE TABLE IF NOT EXISTS event (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            name         TEXT NOT NULL,
            courseid     INTEGER NOT NULL DEFAULT 0,
            groupid      INTEGER NOT NULL DEFAULT 0,
            userid       INTEGER NOT NULL DEFAULT 0,
            modulename   TEXT NOT NULL DEFAULT '',
            instance     INTEGER NOT NULL DEFAULT 0,
            eventtype    TEXT NOT NULL DEFAULT '',
            timestart    INTEGER NOT NULL,
            timeduration INTEGER NOT NULL DEFAULT 0,
            timemodified INTEGER NOT NULL DEFAULT 0,
            visible      INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS ratingallocate (
            id     INTEGER PRIMARY KEY AUTOINCREMENT,
            course INTEGER NOT NULL,
            name   TEXT NOT NULL
        );
    "})?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: activity completion records and lookup indexes.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS course_modules_completion (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            coursemoduleid  INTEGER NOT NULL,
            userid          INTEGER NOT NULL,
            completionstate INTEGER NOT NULL DEFAULT 0,
            UNIQUE (coursemoduleid, userid)
        );

        CREATE INDEX IF NOT EXISTS idx_event_module_time ON event(modulename, timestart);
        CREATE INDEX IF NOT EXISTS idx_event_course ON event(courseid);
        CREATE INDEX IF NOT EXISTS idx_course_modules_lookup ON course_modules(course, module, instance);
    "})?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
