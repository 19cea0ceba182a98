//! Event provider for the townsquare dashboard.
//!
//! The dashboard calls [`EventSource::get_events`] on every registered source.
//! [`EventProvider`] is the source for one activity module (ratingallocate by
//! default): it checks the module is enabled, fetches candidate events for the
//! requested courses and time range in a single query, drops what the viewer
//! may not see, and attaches the activity instance name.

use std::collections::HashSet;

use rusqlite::types::{ToSql, Value};

use crate::error::Result;
use crate::events::{Event, EXPECT_COMPLETION_ON};
use crate::storage::{Database, FeedConfig};
use crate::viewer::ViewerFilter;
use crate::window::QueryWindow;

/// What the aggregating dashboard exposes to its event sources.
pub trait AggregatorContext {
    fn database(&self) -> &Database;
    fn courses(&self) -> Vec<i64>;
    fn time_start(&self) -> i64;
    fn time_end(&self) -> i64;
    fn viewer(&self) -> &dyn ViewerFilter;
}

/// A plugin that contributes events to the dashboard.
pub trait EventSource {
    /// Unique identifier, the module name for activity providers.
    fn name(&self) -> &str;

    /// Events the host's current viewer may see, newest start time first.
    fn get_events(&self, host: &dyn AggregatorContext) -> Result<Vec<Event>>;
}

/// Provides the calendar events of one activity module.
#[derive(Debug, Clone)]
pub struct EventProvider {
    module_name: String,
    completion_event_type: String,
}

impl Default for EventProvider {
    fn default() -> Self {
        Self::ratingallocate()
    }
}

impl EventProvider {
    pub fn new(module_name: impl Into<String>, completion_event_type: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            completion_event_type: completion_event_type.into(),
        }
    }

    /// Provider for `mod_ratingallocate` events.
    pub fn ratingallocate() -> Self {
        Self::new("ratingallocate", EXPECT_COMPLETION_ON)
    }

    pub fn from_config(feed: &FeedConfig) -> Self {
        Self::new(&feed.module_name, &feed.completion_event_type)
    }

    /// Events in `window` that `viewer` may see, enriched with instance names
    /// and ordered by start time, latest first.
    ///
    /// Returns an empty list when the module is not installed or disabled.
    ///
    /// # Errors
    /// Storage errors are propagated unchanged.
    pub fn list_visible_events(
        &self,
        db: &Database,
        window: &QueryWindow,
        viewer: &dyn ViewerFilter,
    ) -> Result<Vec<Event>> {
        if !self.enabled(db)? {
            return Ok(Vec::new());
        }
        self.visible_events(db, window, viewer)
    }

    fn enabled(&self, db: &Database) -> Result<bool> {
        let enabled = db.module_enabled(&self.module_name)?;
        if !enabled {
            tracing::debug!(
                module = %self.module_name,
                "module not installed or disabled, no events"
            );
        }
        Ok(enabled)
    }

    fn visible_events(
        &self,
        db: &Database,
        window: &QueryWindow,
        viewer: &dyn ViewerFilter,
    ) -> Result<Vec<Event>> {
        let candidates = self.fetch_candidates(db, window)?;
        let fetched = candidates.len();

        let mut events = Vec::with_capacity(fetched);
        for mut event in candidates {
            if viewer.filter_availability(&event)
                || (event.eventtype == self.completion_event_type
                    && viewer.filter_activity_completions(&event))
            {
                continue;
            }
            event.instancename = db.instance_name(&event.modulename, event.instance)?;
            events.push(event);
        }

        tracing::debug!(
            module = %self.module_name,
            fetched,
            visible = events.len(),
            "collected events"
        );
        Ok(events)
    }

    fn fetch_candidates(&self, db: &Database, window: &QueryWindow) -> Result<Vec<Event>> {
        let course_params: Vec<(String, Value)> = window
            .courses()
            .iter()
            .enumerate()
            .map(|(i, id)| (format!(":course{i}"), Value::Integer(*id)))
            .collect();
        let in_clause = course_params
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        // The '0' name/type check skips placeholder rows left by old calendar code.
        let sql = format!(
            "SELECT e.id, e.name, e.courseid, cm.id AS coursemoduleid, cm.availability AS availability,
                    e.groupid, e.userid, e.modulename, e.instance, e.eventtype, e.timestart,
                    e.timemodified, e.visible
             FROM event e
             JOIN modules m ON e.modulename = m.name
             JOIN course_modules cm ON (cm.course = e.courseid AND cm.module = m.id AND cm.instance = e.instance)
             WHERE (e.timestart >= :timestart OR e.timestart + e.timeduration > :timestart)
                   AND e.timestart <= :timeend
                   AND e.courseid IN ({in_clause})
                   AND e.modulename = :modulename
                   AND m.visible = 1
                   AND cm.visible = 1
                   AND (e.name NOT LIKE '0' AND e.eventtype NOT LIKE '0')
                   AND (e.instance <> 0 AND e.visible = 1)
             ORDER BY e.timestart DESC, e.id DESC, cm.id ASC"
        );

        let time_start = window.time_start();
        let time_end = window.time_end();
        let mut params: Vec<(&str, &dyn ToSql)> = vec![
            (":timestart", &time_start as &dyn ToSql),
            (":timeend", &time_end as &dyn ToSql),
            (":modulename", &self.module_name as &dyn ToSql),
        ];
        params.extend(
            course_params
                .iter()
                .map(|(name, value)| (name.as_str(), value as &dyn ToSql)),
        );

        let mut stmt = db.conn().prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), Event::from_row)?;
        // An instance placed twice in a course joins once per course module.
        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for row in rows {
            let event = row?;
            if seen.insert(event.id) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

impl EventSource for EventProvider {
    fn name(&self) -> &str {
        &self.module_name
    }

    fn get_events(&self, host: &dyn AggregatorContext) -> Result<Vec<Event>> {
        let db = host.database();
        // The gate comes first so a disabled module never rejects a bad window.
        if !self.enabled(db)? {
            return Ok(Vec::new());
        }
        let window = QueryWindow::new(host.courses(), host.time_start(), host.time_end())?;
        self.visible_events(db, &window, host.viewer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EventRow;
    use crate::viewer::ViewerContext;

    struct Fixture {
        db: Database,
        module: i64,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Database::open_memory().unwrap();
            let module = db.add_module("ratingallocate", true).unwrap();
            Self { db, module }
        }

        /// One ratingallocate activity in `course` with a single event.
        fn activity(&self, course: i64, timestart: i64, eventtype: &str) -> (i64, i64) {
            let instance = self
                .db
                .add_ratingallocate(course, &format!("Allocation in {course}"))
                .unwrap();
            let cm = self
                .db
                .add_course_module(course, self.module, instance, None)
                .unwrap();
            let event = self
                .db
                .add_event(&EventRow {
                    name: "Allocation opens".to_string(),
                    courseid: course,
                    groupid: 0,
                    userid: 0,
                    modulename: "ratingallocate".to_string(),
                    instance,
                    eventtype: eventtype.to_string(),
                    timestart,
                    timeduration: 0,
                    timemodified: timestart,
                    visible: true,
                })
                .unwrap();
            (event, cm)
        }
    }

    #[test]
    fn lists_enriched_events_in_window() {
        let fx = Fixture::new();
        let (id, _) = fx.activity(5, 1500, "due");
        let window = QueryWindow::new([5, 9], 1000, 2000).unwrap();

        let events = EventProvider::ratingallocate()
            .list_visible_events(&fx.db, &window, &ViewerContext::new(3, 0))
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].instancename.as_deref(), Some("Allocation in 5"));
    }

    #[test]
    fn disabled_module_yields_nothing() {
        let fx = Fixture::new();
        fx.activity(5, 1500, "due");
        fx.db.set_module_visible("ratingallocate", false).unwrap();
        let window = QueryWindow::new([5], 1000, 2000).unwrap();

        let events = EventProvider::ratingallocate()
            .list_visible_events(&fx.db, &window, &ViewerContext::new(3, 0))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn completion_reminders_hidden_once_completed() {
        let fx = Fixture::new();
        let (_, cm) = fx.activity(5, 1500, EXPECT_COMPLETION_ON);
        let (due, due_cm) = fx.activity(5, 1400, "due");
        let window = QueryWindow::new([5], 1000, 2000).unwrap();
        let viewer = ViewerContext::new(3, 0).with_completed([cm, due_cm]);

        let events = EventProvider::ratingallocate()
            .list_visible_events(&fx.db, &window, &viewer)
            .unwrap();

        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![due]);
    }

    #[test]
    fn custom_completion_event_type() {
        let fx = Fixture::new();
        let (_, cm) = fx.activity(5, 1500, "close");
        let window = QueryWindow::new([5], 1000, 2000).unwrap();
        let viewer = ViewerContext::new(3, 0).with_completed([cm]);

        let provider = EventProvider::new("ratingallocate", "close");
        assert!(provider
            .list_visible_events(&fx.db, &window, &viewer)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn module_without_instance_table_keeps_its_events() {
        let db = Database::open_memory().unwrap();
        let quiz = db.add_module("quiz", true).unwrap();
        db.add_course_module(5, quiz, 1, None).unwrap();
        let id = db
            .add_event(&EventRow {
                name: "Quiz closes".to_string(),
                courseid: 5,
                groupid: 0,
                userid: 0,
                modulename: "quiz".to_string(),
                instance: 1,
                eventtype: "close".to_string(),
                timestart: 1500,
                timeduration: 0,
                timemodified: 1500,
                visible: true,
            })
            .unwrap();
        let window = QueryWindow::new([5], 1000, 2000).unwrap();

        let events = EventProvider::new("quiz", EXPECT_COMPLETION_ON)
            .list_visible_events(&db, &window, &ViewerContext::new(3, 0))
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].instancename, None);
    }

    #[test]
    fn from_config_uses_feed_settings() {
        let feed = FeedConfig {
            module_name: "quiz".to_string(),
            ..FeedConfig::default()
        };
        let provider = EventProvider::from_config(&feed);
        assert_eq!(provider.name(), "quiz");
    }
}
