use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{
    BookmarkIntent, CollectionKind, CollectionStatus, FetchOutcome, Fetched, PatchToken, SyncCache,
};
use crate::config::{Config, DEFAULT_DURATION_MINUTES};
use crate::domains::{NewWorkoutSession, WorkoutSession, PLACEHOLDER_WORKOUT_NAME};
use crate::error::{FitproError, Result};
use crate::identity::{ClientId, SessionContext};
use crate::interfaces::backend::WorkoutBackend;
use crate::read_model::ReadModel;
use crate::selection::SelectionState;
use crate::services::events::{self, Notice, SyncEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub default_duration: u32,
    pub event_capacity: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_DURATION_MINUTES,
            event_capacity: 256,
        }
    }
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_duration: config.default_duration(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Bookmarked,
    Unbookmarked,
    /// Plan is neither bookmarked nor loaded; nothing was sent.
    Skipped,
}

/// Parses the log form's duration field into whole positive minutes.
pub fn parse_duration(text: &str) -> Result<u32> {
    let minutes: u32 = text.trim().parse().map_err(|_| {
        FitproError::Validation("Duration must be a whole number of minutes".to_string())
    })?;
    if minutes == 0 {
        return Err(FitproError::Validation(
            "Duration must be greater than zero".to_string(),
        ));
    }
    Ok(minutes)
}

/// A plan's toggle slot plus, once installed, its optimistic patch. Dropped
/// with the patch unsettled, it rolls the patch back.
struct ToggleGuard<'a> {
    cache: &'a SyncCache,
    in_flight: &'a Mutex<HashSet<String>>,
    plan_id: String,
    patch: Option<PatchToken>,
}

impl ToggleGuard<'_> {
    fn confirm(&mut self) {
        if let Some(token) = self.patch.take() {
            self.cache.confirm_bookmark_patch(&token);
        }
    }

    fn rollback(&mut self) {
        if let Some(token) = self.patch.take() {
            self.cache.rollback_bookmark_patch(&token);
        }
    }
}

impl Drop for ToggleGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.patch.take() {
            if self.cache.rollback_bookmark_patch(&token) {
                debug!(plan_id = %self.plan_id, seq = token.seq, "unsettled toggle dropped; rolled back");
            }
        }
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.plan_id);
    }
}

/// Client-side synchronization core: the four collection fetchers, the three
/// mutation executors and the transient selection state for one session.
pub struct WorkoutSync {
    backend: Arc<dyn WorkoutBackend>,
    session: SessionContext,
    cache: SyncCache,
    selection: Mutex<SelectionState>,
    toggles_in_flight: Mutex<HashSet<String>>,
    events: broadcast::Sender<SyncEvent>,
    closed: AtomicBool,
}

impl WorkoutSync {
    pub fn new(
        backend: Arc<dyn WorkoutBackend>,
        session: SessionContext,
        options: SyncOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            backend,
            session,
            cache: SyncCache::new(),
            selection: Mutex::new(SelectionState::new(options.default_duration)),
            toggles_in_flight: Mutex::new(HashSet::new()),
            events,
            closed: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn cache(&self) -> &SyncCache {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn status(&self, kind: CollectionKind) -> CollectionStatus {
        self.cache.status(kind)
    }

    /// Current joins over all four snapshots. Unavailable without identity.
    pub fn read_model(&self) -> Result<ReadModel> {
        self.session.require()?;
        Ok(self.cache.read_model())
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_selection<R>(&self, f: impl FnOnce(&mut SelectionState) -> R) -> R {
        let mut selection = self
            .selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut selection)
    }

    pub fn is_toggle_pending(&self, plan_id: &str) -> bool {
        self.toggles_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(plan_id)
    }

    /// Ends the session. Results of requests still in flight are dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("sync session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// One fetch of `kind`. A failure keeps the previous snapshot and is
    /// reported on the event channel as well as returned.
    pub async fn refresh(&self, kind: CollectionKind) -> Result<FetchOutcome> {
        let client = self.open_client()?;
        let ticket = self.cache.begin_fetch(kind);
        let fetched = self.fetch(&client, kind).await;
        if self.is_closed() {
            return Ok(FetchOutcome::Discarded);
        }
        match fetched {
            Ok(data) => {
                let outcome = self.cache.apply_fetch(ticket, data);
                match outcome {
                    FetchOutcome::Applied { version } => {
                        debug!(collection = %kind, version, seq = ticket.seq, "snapshot applied");
                        self.emit(SyncEvent::SnapshotApplied { kind, version });
                    }
                    ignored => {
                        debug!(collection = %kind, seq = ticket.seq, outcome = ?ignored, "fetch result ignored");
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!(collection = %kind, error = %err, "fetch failed; keeping previous snapshot");
                self.cache.record_failure(kind, err.to_string());
                self.emit(SyncEvent::FetchFailed {
                    kind,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Fetches all four collections concurrently. Individual failures stay on
    /// the side channel.
    pub async fn refresh_all(&self) -> Result<()> {
        self.open_client()?;
        let (plans, bookmarks, history, notes) = futures::join!(
            self.refresh(CollectionKind::Plans),
            self.refresh(CollectionKind::Bookmarks),
            self.refresh(CollectionKind::History),
            self.refresh(CollectionKind::Notes),
        );
        for result in [plans, bookmarks, history, notes] {
            if let Err(FitproError::Unavailable | FitproError::Closed) = result {
                return result.map(|_| ());
            }
        }
        Ok(())
    }

    /// Optimistic bookmark toggle. The local snapshot changes before the
    /// write is issued; a failed write restores it.
    pub async fn toggle_bookmark(&self, plan_id: &str) -> Result<ToggleOutcome> {
        let client = self.open_client()?;
        let mut guard = self.claim_toggle(plan_id)?;
        let Some(token) = self.cache.apply_bookmark_toggle(plan_id) else {
            debug!(plan_id, "toggle skipped: plan not loaded");
            return Ok(ToggleOutcome::Skipped);
        };
        guard.patch = Some(token.clone());

        let adding = token.intent.is_add();
        let written = match &token.intent {
            BookmarkIntent::Add(_) => self.backend.add_bookmark(&client, plan_id).await,
            BookmarkIntent::Remove => self.backend.remove_bookmark(&client, plan_id).await,
        };
        if self.is_closed() {
            guard.rollback();
            return Err(FitproError::Closed);
        }

        match written {
            Ok(()) => {
                guard.confirm();
                drop(guard);
                info!(plan_id, adding, seq = token.seq, "bookmark write confirmed");
                self.emit(SyncEvent::Notice(Notice::info(events::BOOKMARK_UPDATED)));
                self.refetch_after_write(CollectionKind::Bookmarks).await;
                Ok(if adding {
                    ToggleOutcome::Bookmarked
                } else {
                    ToggleOutcome::Unbookmarked
                })
            }
            Err(err) => {
                guard.rollback();
                drop(guard);
                warn!(plan_id, seq = token.seq, error = %err, "bookmark write failed; rolled back");
                self.emit(SyncEvent::Notice(Notice::error(events::BOOKMARK_FAILED)));
                Err(err)
            }
        }
    }

    /// Logs a completed session. Validation happens before any request; the
    /// form is cleared only on success.
    pub async fn log_session(
        &self,
        plan_id: &str,
        duration: &str,
        notes: &str,
    ) -> Result<WorkoutSession> {
        let client = self.open_client()?;
        let minutes = match parse_duration(duration) {
            Ok(minutes) => minutes,
            Err(err) => {
                self.emit(SyncEvent::Notice(Notice::invalid(&err_message(&err))));
                return Err(err);
            }
        };
        let workout_name = self
            .cache
            .read_model()
            .plan(plan_id)
            .map(|plan| plan.name.clone())
            .unwrap_or_else(|| PLACEHOLDER_WORKOUT_NAME.to_string());
        let body = NewWorkoutSession {
            workout_plan_id: plan_id.to_string(),
            workout_name,
            duration: minutes,
            notes: notes.to_string(),
        };

        let created = self.backend.create_session(&client, &body).await;
        if self.is_closed() {
            return Err(FitproError::Closed);
        }
        match created {
            Ok(session) => {
                info!(plan_id, duration = minutes, session_id = %session.id, "session logged");
                self.update_selection(SelectionState::reset_log_form);
                self.emit(SyncEvent::Notice(Notice::info(events::SESSION_LOGGED)));
                self.refetch_after_write(CollectionKind::History).await;
                Ok(session)
            }
            Err(err) => {
                warn!(plan_id, error = %err, "logging session failed");
                self.emit(SyncEvent::Notice(Notice::error(events::SESSION_FAILED)));
                Err(err)
            }
        }
    }

    /// Submits the open log form using its drafts.
    pub async fn submit_log_form(&self) -> Result<WorkoutSession> {
        let form = self
            .selection()
            .log_form()
            .ok_or_else(|| FitproError::Validation("No workout selected for logging".to_string()))?;
        self.log_session(&form.plan_id, &form.duration, &form.notes)
            .await
    }

    /// Upserts the plan's note; an empty string deletes it.
    pub async fn save_notes(&self, plan_id: &str, notes: &str) -> Result<()> {
        let client = self.open_client()?;
        let written = if notes.is_empty() {
            self.backend.delete_note(&client, plan_id).await
        } else {
            self.backend.save_note(&client, plan_id, notes).await
        };
        if self.is_closed() {
            return Err(FitproError::Closed);
        }
        match written {
            Ok(()) => {
                info!(plan_id, deleted = notes.is_empty(), "notes saved");
                self.emit(SyncEvent::Notice(Notice::info(events::NOTES_SAVED)));
                self.refetch_after_write(CollectionKind::Notes).await;
                Ok(())
            }
            Err(err) => {
                warn!(plan_id, error = %err, "saving notes failed");
                self.emit(SyncEvent::Notice(Notice::error(events::NOTES_FAILED)));
                Err(err)
            }
        }
    }

    /// Saves the plan's editor draft, or the fetched note when no editor is open.
    pub async fn save_note_draft(&self, plan_id: &str) -> Result<()> {
        let draft = self
            .selection()
            .note_draft(plan_id)
            .map(str::to_string)
            .unwrap_or_else(|| self.cache.read_model().notes_of(plan_id).to_string());
        self.save_notes(plan_id, &draft).await
    }

    async fn fetch(&self, client: &ClientId, kind: CollectionKind) -> Result<Fetched> {
        let backend = &self.backend;
        match kind {
            CollectionKind::Plans => backend.list_plans(client).await.map(Fetched::Plans),
            CollectionKind::Bookmarks => backend.list_bookmarks(client).await.map(Fetched::Bookmarks),
            CollectionKind::History => backend.list_history(client).await.map(Fetched::History),
            CollectionKind::Notes => backend.list_notes(client).await.map(Fetched::Notes),
        }
    }

    /// Invalidate and refetch. A failed refetch is a fetch failure, not a
    /// mutation failure: the snapshot stays stale until the next poll.
    async fn refetch_after_write(&self, kind: CollectionKind) {
        self.cache.mark_stale(kind);
        if let Err(err) = self.refresh(kind).await {
            debug!(collection = %kind, error = %err, "refetch after write failed");
        }
    }

    fn open_client(&self) -> Result<ClientId> {
        let client = self.session.require()?.clone();
        if self.is_closed() {
            return Err(FitproError::Closed);
        }
        Ok(client)
    }

    fn claim_toggle(&self, plan_id: &str) -> Result<ToggleGuard<'_>> {
        let mut in_flight = self
            .toggles_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(plan_id.to_string()) {
            return Err(FitproError::MutationInFlight(plan_id.to_string()));
        }
        Ok(ToggleGuard {
            cache: &self.cache,
            in_flight: &self.toggles_in_flight,
            plan_id: plan_id.to_string(),
            patch: None,
        })
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

fn err_message(err: &FitproError) -> String {
    match err {
        FitproError::Validation(message) => message.clone(),
        other => other.to_string(),
    }
}
