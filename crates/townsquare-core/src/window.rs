//! Course set and time range a dashboard asks events for.

use std::collections::BTreeSet;

use crate::error::ValidationError;

/// Course ids plus an inclusive `[time_start, time_end]` range in unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
    courses: BTreeSet<i64>,
    time_start: i64,
    time_end: i64,
}

impl QueryWindow {
    /// Build a validated window.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyCourseSet`] when no course is given and
    /// [`ValidationError::InvalidTimeRange`] when `time_end < time_start`.
    pub fn new(
        courses: impl IntoIterator<Item = i64>,
        time_start: i64,
        time_end: i64,
    ) -> Result<Self, ValidationError> {
        let courses: BTreeSet<i64> = courses.into_iter().collect();
        if courses.is_empty() {
            return Err(ValidationError::EmptyCourseSet);
        }
        if time_end < time_start {
            return Err(ValidationError::InvalidTimeRange {
                start: time_start,
                end: time_end,
            });
        }
        Ok(Self {
            courses,
            time_start,
            time_end,
        })
    }

    pub fn courses(&self) -> &BTreeSet<i64> {
        &self.courses
    }

    pub fn time_start(&self) -> i64 {
        self.time_start
    }

    pub fn time_end(&self) -> i64 {
        self.time_end
    }

    /// Whether an event starting at `timestart` and lasting `duration`
    /// seconds falls in this window. Mirrors the SQL predicate.
    pub fn intersects(&self, timestart: i64, duration: i64) -> bool {
        (timestart >= self.time_start || timestart.saturating_add(duration) > self.time_start)
            && timestart <= self.time_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_course_set() {
        let err = QueryWindow::new(Vec::new(), 0, 10).unwrap_err();
        assert_eq!(err, ValidationError::EmptyCourseSet);
    }

    #[test]
    fn rejects_inverted_range() {
        let err = QueryWindow::new([1], 20, 10).unwrap_err();
        assert_eq!(err, ValidationError::InvalidTimeRange { start: 20, end: 10 });
    }

    #[test]
    fn accepts_single_instant() {
        let window = QueryWindow::new([3, 3, 1], 100, 100).unwrap();
        assert_eq!(window.courses().iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn in_progress_events_intersect() {
        let window = QueryWindow::new([1], 1000, 2000).unwrap();
        assert!(window.intersects(1500, 0));
        assert!(window.intersects(900, 200));
        assert!(!window.intersects(900, 100));
        assert!(!window.intersects(2001, 0));
        assert!(window.intersects(2000, 0));
    }
}
