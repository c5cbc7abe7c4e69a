//! Pure joins over the four snapshots, recomputed on every access.
//!
//! Nothing here fails for an unknown plan id: absence is the normal case for
//! a freshly assigned plan.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::domains::{Bookmark, NotesMap, WorkoutPlan, WorkoutSession};

#[derive(Debug, Clone, Default)]
pub struct ReadModel {
    plans: Arc<Vec<WorkoutPlan>>,
    bookmarks: Arc<Vec<Bookmark>>,
    history: Arc<Vec<WorkoutSession>>,
    notes: Arc<NotesMap>,
    pending: Arc<BTreeSet<String>>,
}

/// A bookmark resolved to displayable plan data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmarkedPlan<'a> {
    pub plan: &'a WorkoutPlan,
    pub bookmark_id: Option<&'a str>,
    /// A local toggle for this plan is still awaiting the server. A confirmed
    /// entry may still lack `bookmark_id` until the next fetch.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanHistory<'a> {
    pub plan: &'a WorkoutPlan,
    pub sessions: Vec<&'a WorkoutSession>,
}

impl ReadModel {
    pub fn new(
        plans: Arc<Vec<WorkoutPlan>>,
        bookmarks: Arc<Vec<Bookmark>>,
        history: Arc<Vec<WorkoutSession>>,
        notes: Arc<NotesMap>,
    ) -> Self {
        Self {
            plans,
            bookmarks,
            history,
            notes,
            pending: Arc::default(),
        }
    }

    /// Plans whose bookmark toggle has not settled yet.
    pub fn with_pending(mut self, plan_ids: BTreeSet<String>) -> Self {
        self.pending = Arc::new(plan_ids);
        self
    }

    pub fn plans(&self) -> &[WorkoutPlan] {
        &self.plans
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn history(&self) -> &[WorkoutSession] {
        &self.history
    }

    pub fn notes(&self) -> &NotesMap {
        &self.notes
    }

    pub fn plan(&self, plan_id: &str) -> Option<&WorkoutPlan> {
        self.plans.iter().find(|plan| plan.id == plan_id)
    }

    pub fn is_bookmarked(&self, plan_id: &str) -> bool {
        self.bookmarks
            .iter()
            .any(|bookmark| bookmark.workout_plan_id == plan_id)
    }

    pub fn is_bookmark_pending(&self, plan_id: &str) -> bool {
        self.pending.contains(plan_id)
    }

    /// Sessions for `plan_id` in collection order. Fetch order is not stable;
    /// use [`ReadModel::recent_history_of`] when recency matters.
    pub fn history_of(&self, plan_id: &str) -> Vec<&WorkoutSession> {
        self.history
            .iter()
            .filter(|session| session.workout_plan_id == plan_id)
            .collect()
    }

    pub fn recent_history_of(&self, plan_id: &str) -> Vec<&WorkoutSession> {
        let mut sessions = self.history_of(plan_id);
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        sessions
    }

    pub fn notes_of(&self, plan_id: &str) -> &str {
        self.notes.get(plan_id).map(String::as_str).unwrap_or("")
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// Bookmarks in collection order, each resolved through its denormalized
    /// plan copy first and the plans snapshot second. Entries resolving to
    /// neither are dropped.
    pub fn bookmarked_plans(&self) -> Vec<BookmarkedPlan<'_>> {
        self.bookmarks
            .iter()
            .filter_map(|bookmark| {
                let plan = bookmark
                    .workout_plan
                    .as_ref()
                    .or_else(|| self.plan(&bookmark.workout_plan_id))?;
                Some(BookmarkedPlan {
                    plan,
                    bookmark_id: bookmark.id.as_deref(),
                    pending: self.is_bookmark_pending(&bookmark.workout_plan_id),
                })
            })
            .collect()
    }

    /// History grouped under each loaded plan that has sessions, in plans
    /// order. Sessions for plans that are not loaded are left out.
    pub fn history_by_plan(&self) -> Vec<PlanHistory<'_>> {
        self.plans
            .iter()
            .filter_map(|plan| {
                let sessions = self.history_of(&plan.id);
                if sessions.is_empty() {
                    None
                } else {
                    Some(PlanHistory { plan, sessions })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const KNOWN: [&str; 5] = ["p1", "p2", "gone", "archived", "orphan"];

    fn session(id: &str, plan: &str, day: u32) -> WorkoutSession {
        WorkoutSession {
            id: id.to_string(),
            workout_plan_id: plan.to_string(),
            workout_name: "Leg Day".to_string(),
            duration: 30,
            completed_at: Utc.with_ymd_and_hms(2025, 11, day, 8, 0, 0).unwrap(),
            notes: None,
        }
    }

    fn model() -> ReadModel {
        let mut notes = NotesMap::new();
        notes.insert("p1".to_string(), "keep knees out".to_string());
        ReadModel::new(
            Arc::new(vec![WorkoutPlan::new("p1", "Leg Day"), WorkoutPlan::new("p2", "Push")]),
            Arc::new(vec![
                Bookmark {
                    id: Some("b1".to_string()),
                    workout_plan_id: "p2".to_string(),
                    workout_plan: None,
                },
                Bookmark {
                    id: Some("b2".to_string()),
                    workout_plan_id: "gone".to_string(),
                    workout_plan: None,
                },
                Bookmark {
                    id: Some("b3".to_string()),
                    workout_plan_id: "archived".to_string(),
                    workout_plan: Some(WorkoutPlan::new("archived", "Old Cycle")),
                },
            ]),
            Arc::new(vec![
                session("s1", "p1", 2),
                session("s2", "orphan", 3),
                session("s3", "p1", 5),
            ]),
            Arc::new(notes),
        )
    }

    #[test]
    fn unknown_ids_read_as_absent() {
        let model = model();
        for id in ["nope", ""] {
            assert!(!model.is_bookmarked(id));
            assert_eq!(model.notes_of(id), "");
        }
        assert!(model.history_of("nope").is_empty());
        assert!(ReadModel::default().history_of("p1").is_empty());
    }

    proptest! {
        #[test]
        fn any_id_outside_the_snapshots_reads_as_absent(
            id in prop_oneof![any::<String>(), "p[0-9]{0,3}", " ?(p1|p2) ?", "(P1|Gone|ARCHIVED)"],
        ) {
            prop_assume!(!KNOWN.contains(&id.as_str()));
            let model = model().with_pending(BTreeSet::from(["p2".to_string()]));
            prop_assert!(!model.is_bookmarked(&id));
            prop_assert!(model.history_of(&id).is_empty());
            prop_assert!(model.recent_history_of(&id).is_empty());
            prop_assert_eq!(model.notes_of(&id), "");
            prop_assert!(!model.is_bookmark_pending(&id));
        }
    }

    #[test]
    fn history_order_follows_collection_unless_sorted() {
        let model = model();
        let ids: Vec<&str> = model.history_of("p1").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        let recent: Vec<&str> = model
            .recent_history_of("p1")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(recent, vec!["s3", "s1"]);
    }

    #[test]
    fn bookmarked_plans_use_denormalized_copy_and_drop_unresolvable() {
        let model = model();
        let names: Vec<&str> = model
            .bookmarked_plans()
            .iter()
            .map(|entry| entry.plan.name.as_str())
            .collect();
        assert_eq!(names, vec!["Push", "Old Cycle"]);
    }

    #[test]
    fn history_groups_skip_orphans_and_empty_plans() {
        let model = model();
        let groups = model.history_by_plan();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].plan.id, "p1");
        assert_eq!(groups[0].sessions.len(), 2);
        assert!(model.has_history());
        assert_eq!(model.notes_of("p1"), "keep knees out");
    }
}
