//! Local cache of the four server collections.
//!
//! Every fetch and every optimistic write draws its sequence number from one
//! shared counter. A collection applies a fetch result only when its ticket is
//! newer than the last applied one and not below the collection's mutation
//! floor; anything else is ignored. Lock order is plans, then bookmarks, then
//! the bookmark ledger.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;

use crate::domains::{Bookmark, NotesMap, WorkoutPlan, WorkoutSession};
use crate::read_model::ReadModel;

pub mod collection;
pub mod optimistic;

pub use collection::{Collection, CollectionStatus, FetchOutcome, FetchTicket};
pub use optimistic::{BookmarkIntent, BookmarkLedger, PatchToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Plans,
    Bookmarks,
    History,
    Notes,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Plans,
        CollectionKind::Bookmarks,
        CollectionKind::History,
        CollectionKind::Notes,
    ];

    /// Resource segment under `/api/clients/{clientId}/`.
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Plans => "workout-plans",
            Self::Bookmarks => "workout-bookmarks",
            Self::History => "workout-history",
            Self::Notes => "workout-notes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Plans => "plans",
            Self::Bookmarks => "bookmarks",
            Self::History => "history",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fetched payload, tagged with the collection it replaces.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Plans(Vec<WorkoutPlan>),
    Bookmarks(Vec<Bookmark>),
    History(Vec<WorkoutSession>),
    Notes(NotesMap),
}

impl Fetched {
    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Plans(_) => CollectionKind::Plans,
            Self::Bookmarks(_) => CollectionKind::Bookmarks,
            Self::History(_) => CollectionKind::History,
            Self::Notes(_) => CollectionKind::Notes,
        }
    }
}

trait CollectionMeta {
    fn mark_stale(&mut self);
    fn record_failure(&mut self, error: String);
    fn status(&self, kind: CollectionKind) -> CollectionStatus;
}

impl<T> CollectionMeta for Collection<T> {
    fn mark_stale(&mut self) {
        Collection::mark_stale(self)
    }

    fn record_failure(&mut self, error: String) {
        Collection::record_failure(self, error)
    }

    fn status(&self, kind: CollectionKind) -> CollectionStatus {
        Collection::status(self, kind)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct SyncCache {
    sequence: AtomicU64,
    plans: RwLock<Collection<Vec<WorkoutPlan>>>,
    bookmarks: RwLock<Collection<Vec<Bookmark>>>,
    history: RwLock<Collection<Vec<WorkoutSession>>>,
    notes: RwLock<Collection<NotesMap>>,
    ledger: Mutex<BookmarkLedger>,
}

impl SyncCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn begin_fetch(&self, kind: CollectionKind) -> FetchTicket {
        FetchTicket {
            kind,
            seq: self.next_sequence(),
        }
    }

    pub fn apply_fetch(&self, ticket: FetchTicket, fetched: Fetched) -> FetchOutcome {
        debug_assert_eq!(ticket.kind, fetched.kind());
        let now = Utc::now();
        match fetched {
            Fetched::Plans(plans) => write(&self.plans).apply_fetch(ticket, plans, now),
            Fetched::History(history) => write(&self.history).apply_fetch(ticket, history, now),
            Fetched::Notes(notes) => write(&self.notes).apply_fetch(ticket, notes, now),
            Fetched::Bookmarks(server) => {
                let mut bookmarks = write(&self.bookmarks);
                if let Some(rejected) = bookmarks.check(ticket) {
                    return rejected;
                }
                let shown = lock(&self.ledger).rebase(server);
                bookmarks.accept(ticket, shown, now)
            }
        }
    }

    pub fn record_failure(&self, kind: CollectionKind, error: String) {
        self.with_meta(kind, |meta| meta.record_failure(error));
    }

    pub fn mark_stale(&self, kind: CollectionKind) {
        self.with_meta(kind, |meta| meta.mark_stale());
    }

    pub fn status(&self, kind: CollectionKind) -> CollectionStatus {
        self.with_meta(kind, |meta| meta.status(kind))
    }

    /// True when every collection has failed at least `threshold` times in a row.
    pub fn all_failing(&self, threshold: u32) -> bool {
        threshold > 0
            && CollectionKind::ALL
                .iter()
                .all(|kind| self.status(*kind).consecutive_failures >= threshold)
    }

    /// Installs the optimistic toggle for `plan_id` and returns its token.
    /// `None` when the plan is neither bookmarked nor present in the plans
    /// snapshot: nothing is installed.
    pub fn apply_bookmark_toggle(&self, plan_id: &str) -> Option<PatchToken> {
        let plans = read(&self.plans).data();
        let mut bookmarks = write(&self.bookmarks);
        let currently = bookmarks
            .data()
            .iter()
            .any(|b| b.workout_plan_id == plan_id);
        let intent = if currently {
            BookmarkIntent::Remove
        } else {
            let plan = plans.iter().find(|p| p.id == plan_id)?;
            BookmarkIntent::Add(plan.clone())
        };
        let token = PatchToken {
            seq: self.next_sequence(),
            plan_id: plan_id.to_string(),
            intent,
        };
        let shown = lock(&self.ledger).push(&token);
        bookmarks.install(shown);
        bookmarks.raise_floor(token.seq);
        Some(token)
    }

    /// The write landed: fetches issued before now may predate it.
    pub fn confirm_bookmark_patch(&self, token: &PatchToken) {
        let mut bookmarks = write(&self.bookmarks);
        lock(&self.ledger).confirm(token.seq);
        bookmarks.raise_floor(self.next_sequence());
        bookmarks.mark_stale();
    }

    /// Returns false when the patch was already settled.
    pub fn rollback_bookmark_patch(&self, token: &PatchToken) -> bool {
        let mut bookmarks = write(&self.bookmarks);
        let restored = lock(&self.ledger).rollback(token.seq);
        match restored {
            Some(shown) => {
                bookmarks.install(shown);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_bookmark(&self, plan_id: &str) -> bool {
        lock(&self.ledger).is_pending(plan_id)
    }

    pub fn read_model(&self) -> ReadModel {
        let plans = read(&self.plans).data();
        let (bookmarks, pending) = {
            let bookmarks = read(&self.bookmarks);
            (bookmarks.data(), lock(&self.ledger).pending_plan_ids())
        };
        ReadModel::new(
            plans,
            bookmarks,
            read(&self.history).data(),
            read(&self.notes).data(),
        )
        .with_pending(pending)
    }

    fn with_meta<R>(&self, kind: CollectionKind, f: impl FnOnce(&mut dyn CollectionMeta) -> R) -> R {
        match kind {
            CollectionKind::Plans => f(&mut *write(&self.plans)),
            CollectionKind::Bookmarks => f(&mut *write(&self.bookmarks)),
            CollectionKind::History => f(&mut *write(&self.history)),
            CollectionKind::Notes => f(&mut *write(&self.notes)),
        }
    }
}
