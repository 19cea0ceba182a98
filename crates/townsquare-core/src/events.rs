//! Calendar events as handed to the townsquare dashboard.
//!
//! An [`Event`] is built fresh from the `event`/`course_modules` join on every
//! request and never cached. Timestamps are unix seconds.

use serde::{Deserialize, Serialize};

/// Event type tag for "expect completion by" reminders.
pub const EXPECT_COMPLETION_ON: &str = "expectcompletionon";

/// A calendar entry produced by an activity instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub courseid: i64,
    /// Id of the `course_modules` row that owns the activity instance.
    pub coursemoduleid: i64,
    /// Raw availability restriction tree of the course module (JSON).
    pub availability: Option<String>,
    pub groupid: i64,
    pub userid: i64,
    /// Module type name, e.g. `ratingallocate`.
    pub modulename: String,
    /// Id of the activity instance within the module's own table.
    pub instance: i64,
    pub eventtype: String,
    pub timestart: i64,
    pub timemodified: i64,
    pub visible: bool,
    /// Display name of the activity instance, filled in after filtering.
    #[serde(default)]
    pub instancename: Option<String>,
}

impl Event {
    pub(crate) fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            courseid: row.get("courseid")?,
            coursemoduleid: row.get("coursemoduleid")?,
            availability: row.get("availability")?,
            groupid: row.get::<_, Option<i64>>("groupid")?.unwrap_or(0),
            userid: row.get::<_, Option<i64>>("userid")?.unwrap_or(0),
            modulename: row.get("modulename")?,
            instance: row.get("instance")?,
            eventtype: row.get("eventtype")?,
            timestart: row.get("timestart")?,
            timemodified: row.get("timemodified")?,
            visible: row.get::<_, i64>("visible")? != 0,
            instancename: None,
        })
    }
}
