use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domains::{Bookmark, WorkoutPlan};

#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkIntent {
    Add(WorkoutPlan),
    Remove,
}

impl BookmarkIntent {
    pub fn is_add(&self) -> bool {
        matches!(self, Self::Add(_))
    }
}

/// Handle for a locally applied toggle, used to confirm or roll it back.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchToken {
    pub seq: u64,
    pub plan_id: String,
    pub intent: BookmarkIntent,
}

#[derive(Debug, Clone)]
struct BookmarkPatch {
    seq: u64,
    plan_id: String,
    intent: BookmarkIntent,
}

impl BookmarkPatch {
    fn apply_to(&self, bookmarks: &mut Vec<Bookmark>) {
        match &self.intent {
            BookmarkIntent::Add(plan) => {
                if !bookmarks.iter().any(|b| b.workout_plan_id == self.plan_id) {
                    bookmarks.push(Bookmark::synthetic(plan));
                }
            }
            BookmarkIntent::Remove => bookmarks.retain(|b| b.workout_plan_id != self.plan_id),
        }
    }
}

/// Last server-confirmed bookmarks plus the patches not yet settled. The
/// displayed snapshot is always `base` with `pending` replayed in sequence
/// order, so a fetch landing mid-flight cannot drop an unsettled guess and a
/// rollback only undoes its own patch.
#[derive(Debug, Default)]
pub struct BookmarkLedger {
    base: Arc<Vec<Bookmark>>,
    pending: Vec<BookmarkPatch>,
}

impl BookmarkLedger {
    pub fn rebase(&mut self, server: Vec<Bookmark>) -> Vec<Bookmark> {
        self.base = Arc::new(server);
        self.replay()
    }

    pub fn push(&mut self, token: &PatchToken) -> Vec<Bookmark> {
        self.pending.push(BookmarkPatch {
            seq: token.seq,
            plan_id: token.plan_id.clone(),
            intent: token.intent.clone(),
        });
        self.replay()
    }

    /// Folds the patch into the base; the display is unchanged.
    pub fn confirm(&mut self, seq: u64) -> bool {
        let Some(patch) = self.take(seq) else {
            return false;
        };
        let mut base = self.base.as_ref().clone();
        patch.apply_to(&mut base);
        self.base = Arc::new(base);
        true
    }

    /// Drops the patch and returns the display without it.
    pub fn rollback(&mut self, seq: u64) -> Option<Vec<Bookmark>> {
        self.take(seq)?;
        Some(self.replay())
    }

    pub fn is_pending(&self, plan_id: &str) -> bool {
        self.pending.iter().any(|p| p.plan_id == plan_id)
    }

    /// Plans with a patch not yet confirmed or rolled back.
    pub fn pending_plan_ids(&self) -> BTreeSet<String> {
        self.pending.iter().map(|p| p.plan_id.clone()).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take(&mut self, seq: u64) -> Option<BookmarkPatch> {
        let index = self.pending.iter().position(|p| p.seq == seq)?;
        Some(self.pending.remove(index))
    }

    fn replay(&self) -> Vec<Bookmark> {
        let mut shown = self.base.as_ref().clone();
        for patch in &self.pending {
            patch.apply_to(&mut shown);
        }
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn token(seq: u64, plan: &str, intent: BookmarkIntent) -> PatchToken {
        PatchToken {
            seq,
            plan_id: plan.to_string(),
            intent,
        }
    }

    fn add(plan: &str) -> BookmarkIntent {
        BookmarkIntent::Add(WorkoutPlan::new(plan, plan))
    }

    fn plan_ids(list: &[Bookmark]) -> Vec<&str> {
        list.iter().map(|b| b.workout_plan_id.as_str()).collect()
    }

    #[test]
    fn rollback_without_interleaving_restores_previous() {
        let mut ledger = BookmarkLedger::default();
        ledger.rebase(vec![Bookmark {
            id: Some("b0".to_string()),
            workout_plan_id: "p0".to_string(),
            workout_plan: None,
        }]);
        let shown = ledger.push(&token(5, "p1", add("p1")));
        assert_eq!(plan_ids(&shown), vec!["p0", "p1"]);
        assert!(shown[1].is_synthetic());

        let restored = ledger.rollback(5).expect("pending patch");
        assert_eq!(plan_ids(&restored), vec!["p0"]);
        assert!(ledger.rollback(5).is_none());
    }

    #[test]
    fn rollback_keeps_other_pending_patches() {
        let mut ledger = BookmarkLedger::default();
        ledger.push(&token(1, "p1", add("p1")));
        ledger.push(&token(2, "p2", add("p2")));
        let shown = ledger.rollback(1).expect("pending");
        assert_eq!(plan_ids(&shown), vec!["p2"]);
        assert!(ledger.is_pending("p2"));
        assert!(!ledger.is_pending("p1"));
    }

    #[test]
    fn rebase_replays_unsettled_patches_over_server_data() {
        let mut ledger = BookmarkLedger::default();
        ledger.push(&token(3, "p1", add("p1")));
        let shown = ledger.rebase(Vec::new());
        assert_eq!(plan_ids(&shown), vec!["p1"]);

        assert!(ledger.confirm(3));
        assert_eq!(ledger.pending_len(), 0);
        let shown = ledger.rebase(vec![Bookmark {
            id: Some("b9".to_string()),
            workout_plan_id: "p1".to_string(),
            workout_plan: None,
        }]);
        assert_eq!(shown.len(), 1);
        assert!(!shown[0].is_synthetic());
    }

    #[test]
    fn remove_patch_hides_existing_entry() {
        let mut ledger = BookmarkLedger::default();
        ledger.rebase(vec![Bookmark {
            id: Some("b1".to_string()),
            workout_plan_id: "p1".to_string(),
            workout_plan: None,
        }]);
        let shown = ledger.push(&token(4, "p1", BookmarkIntent::Remove));
        assert!(shown.is_empty());
        let shown = ledger.rollback(4).expect("pending");
        assert_eq!(plan_ids(&shown), vec!["p1"]);
    }

    const PLANS: [&str; 4] = ["p0", "p1", "p2", "p3"];

    #[derive(Debug, Clone)]
    enum Step {
        Toggle(usize),
        Confirm(usize),
        Rollback(usize),
        Rebase(Vec<bool>),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (0..PLANS.len()).prop_map(Step::Toggle),
            1 => (0usize..8).prop_map(Step::Confirm),
            1 => (0usize..8).prop_map(Step::Rollback),
            1 => proptest::collection::vec(any::<bool>(), PLANS.len()).prop_map(Step::Rebase),
        ]
    }

    fn server_bookmark(plan: &str) -> Bookmark {
        Bookmark {
            id: Some(format!("b-{plan}")),
            workout_plan_id: plan.to_string(),
            workout_plan: None,
        }
    }

    fn plan_set(list: &[Bookmark]) -> BTreeSet<String> {
        list.iter().map(|b| b.workout_plan_id.clone()).collect()
    }

    fn apply(set: &mut BTreeSet<String>, plan: &str, adding: bool) {
        if adding {
            set.insert(plan.to_string());
        } else {
            set.remove(plan);
        }
    }

    fn expected(base: &BTreeSet<String>, pending: &[(u64, String, bool)]) -> BTreeSet<String> {
        let mut shown = base.clone();
        for (_, plan, adding) in pending {
            apply(&mut shown, plan, *adding);
        }
        shown
    }

    proptest! {
        // One unsettled toggle per plan at a time, as the sync service allows.
        #[test]
        fn display_is_base_plus_pending_under_any_interleaving(
            steps in proptest::collection::vec(step(), 0..40),
            last in 0..PLANS.len(),
        ) {
            let mut ledger = BookmarkLedger::default();
            let mut base = BTreeSet::new();
            let mut pending: Vec<(u64, String, bool)> = Vec::new();
            let mut seq = 0u64;

            for step in steps {
                match step {
                    Step::Toggle(i) => {
                        let plan = PLANS[i];
                        if pending.iter().any(|(_, p, _)| p == plan) {
                            continue;
                        }
                        let adding = !plan_set(&ledger.replay()).contains(plan);
                        let intent = if adding { add(plan) } else { BookmarkIntent::Remove };
                        seq += 1;
                        ledger.push(&token(seq, plan, intent));
                        pending.push((seq, plan.to_string(), adding));
                    }
                    Step::Confirm(k) => {
                        if pending.is_empty() {
                            prop_assert!(!ledger.confirm(seq + 1));
                        } else {
                            let (settled, plan, adding) = pending.remove(k % pending.len());
                            prop_assert!(ledger.confirm(settled));
                            prop_assert!(!ledger.confirm(settled));
                            apply(&mut base, &plan, adding);
                        }
                    }
                    Step::Rollback(k) => {
                        if pending.is_empty() {
                            prop_assert!(ledger.rollback(seq + 1).is_none());
                        } else {
                            let (settled, _, _) = pending.remove(k % pending.len());
                            prop_assert!(ledger.rollback(settled).is_some());
                            prop_assert!(ledger.rollback(settled).is_none());
                        }
                    }
                    Step::Rebase(mask) => {
                        let server: Vec<Bookmark> = PLANS
                            .iter()
                            .zip(mask)
                            .filter(|(_, keep)| *keep)
                            .map(|(plan, _)| server_bookmark(plan))
                            .collect();
                        base = plan_set(&server);
                        ledger.rebase(server);
                    }
                }
                let shown = ledger.replay();
                prop_assert_eq!(plan_set(&shown).len(), shown.len());
                prop_assert_eq!(plan_set(&shown), expected(&base, &pending));
                prop_assert_eq!(ledger.pending_len(), pending.len());
            }

            let idle = (0..PLANS.len())
                .map(|offset| PLANS[(last + offset) % PLANS.len()])
                .find(|plan| !pending.iter().any(|(_, p, _)| p == plan));
            if let Some(plan) = idle {
                let previous = ledger.replay();
                let intent = if plan_set(&previous).contains(plan) {
                    BookmarkIntent::Remove
                } else {
                    add(plan)
                };
                seq += 1;
                let toggled = ledger.push(&token(seq, plan, intent));
                prop_assert_ne!(plan_set(&toggled), plan_set(&previous));
                prop_assert_eq!(ledger.rollback(seq), Some(previous));
            }
        }
    }
}
