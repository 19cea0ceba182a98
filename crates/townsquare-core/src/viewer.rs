//! Per-viewer visibility predicates.
//!
//! The feed drops events the current user may not see. [`ViewerFilter`] is the
//! seam a host plugs its own access checks into; [`ViewerContext`] is the
//! built-in implementation backed by the store's completion records and the
//! course module's availability tree.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::Result;
use crate::events::Event;
use crate::storage::Database;

/// Visibility checks for one viewer. Both predicates return `true` when the
/// event must be hidden.
pub trait ViewerFilter {
    /// Availability restrictions of the owning course module block the viewer.
    fn filter_availability(&self, event: &Event) -> bool;

    /// The viewer has already completed the activity the event reminds about.
    fn filter_activity_completions(&self, event: &Event) -> bool;
}

/// Identity and completion state of the user viewing the dashboard.
#[derive(Debug, Clone, Default)]
pub struct ViewerContext {
    pub userid: i64,
    /// Evaluation time for date restrictions (unix seconds).
    pub now: i64,
    pub completed: HashSet<i64>,
}

impl ViewerContext {
    pub fn new(userid: i64, now: i64) -> Self {
        Self {
            userid,
            now,
            completed: HashSet::new(),
        }
    }

    /// Mark course modules as completed by this viewer.
    pub fn with_completed(mut self, coursemoduleids: impl IntoIterator<Item = i64>) -> Self {
        self.completed.extend(coursemoduleids);
        self
    }

    /// Build the context for `userid` from stored completion records.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn load(db: &Database, userid: i64, now: i64) -> Result<Self> {
        Ok(Self {
            userid,
            now,
            completed: db.completed_course_modules(userid)?,
        })
    }

    fn evaluate(&self, node: &Node) -> bool {
        match node {
            Node::Tree(tree) => self.evaluate_tree(tree),
            Node::Condition(condition) => self.evaluate_condition(condition),
        }
    }

    fn evaluate_tree(&self, tree: &Tree) -> bool {
        if tree.c.is_empty() {
            return true;
        }
        let (negate, all) = match tree.op.as_str() {
            "&" => (false, true),
            "|" => (false, false),
            "!&" => (true, false),
            "!|" => (true, true),
            other => {
                tracing::warn!(
                    op = other,
                    "unknown availability operator, treating as unrestricted"
                );
                return true;
            }
        };
        let mut results = tree.c.iter().map(|child| self.evaluate(child) != negate);
        if all {
            results.all(|ok| ok)
        } else {
            results.any(|ok| ok)
        }
    }

    fn evaluate_condition(&self, condition: &Condition) -> bool {
        match condition {
            Condition::Date { d, t } => match d.as_str() {
                ">=" => self.now >= *t,
                "<" => self.now < *t,
                _ => true,
            },
            // e = 0 requires the activity to be incomplete; other states require completion.
            Condition::Completion { cm, e } => {
                let done = self.completed.contains(cm);
                if *e == 0 {
                    !done
                } else {
                    done
                }
            }
            Condition::Unknown => true,
        }
    }
}

impl ViewerFilter for ViewerContext {
    fn filter_availability(&self, event: &Event) -> bool {
        let Some(raw) = event.availability.as_deref() else {
            return false;
        };
        let raw = raw.trim();
        if raw.is_empty() || raw == "null" {
            return false;
        }
        match serde_json::from_str::<Node>(raw) {
            Ok(tree) => !self.evaluate(&tree),
            Err(e) => {
                tracing::warn!(
                    event_id = event.id,
                    coursemoduleid = event.coursemoduleid,
                    "malformed availability data: {e}"
                );
                false
            }
        }
    }

    fn filter_activity_completions(&self, event: &Event) -> bool {
        self.completed.contains(&event.coursemoduleid)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Node {
    Tree(Tree),
    Condition(Condition),
}

#[derive(Debug, Deserialize)]
struct Tree {
    op: String,
    #[serde(default)]
    c: Vec<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Condition {
    Date { d: String, t: i64 },
    Completion { cm: i64, e: i64 },
    #[serde(other)]
    Unknown,
}
