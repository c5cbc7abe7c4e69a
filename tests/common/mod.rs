#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use fitpro_sync::domains::{Bookmark, NewWorkoutSession, NotesMap, WorkoutPlan, WorkoutSession};
use fitpro_sync::error::Result;
use fitpro_sync::identity::{ClientId, SessionContext};
use fitpro_sync::interfaces::backend::WorkoutBackend;
use fitpro_sync::providers::InMemoryBackend;
use fitpro_sync::services::{SyncOptions, WorkoutSync};

pub const CLIENT: &str = "client-1";

pub fn client() -> ClientId {
    ClientId::parse(CLIENT).expect("client id")
}

/// Pauses one side of the store until the test lets a call through.
pub struct Gate {
    closed: AtomicBool,
    permits: Semaphore,
    entered: Notify,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            closed: AtomicBool::new(false),
            permits: Semaphore::new(0),
            entered: Notify::new(),
        }
    }
}

impl Gate {
    pub fn hold(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Lets one held call proceed.
    pub fn release_one(&self) {
        self.permits.add_permits(1);
    }

    /// New calls pass straight through; parked calls stay parked.
    pub fn stop_holding(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.permits.add_permits(64);
    }

    /// Resolves once a call is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    async fn pass(&self) {
        if self.closed.load(Ordering::SeqCst) {
            self.entered.notify_one();
            let permit = self.permits.acquire().await.expect("gate semaphore");
            permit.forget();
        }
    }
}

/// In-memory store with holdable writes and delayable read responses. A held
/// read has already observed the store, so its response is stale by release.
#[derive(Default)]
pub struct GatedBackend {
    pub store: InMemoryBackend,
    pub reads: Gate,
    pub writes: Gate,
}

#[async_trait]
impl WorkoutBackend for GatedBackend {
    async fn list_plans(&self, client: &ClientId) -> Result<Vec<WorkoutPlan>> {
        let response = self.store.list_plans(client).await;
        self.reads.pass().await;
        response
    }

    async fn list_bookmarks(&self, client: &ClientId) -> Result<Vec<Bookmark>> {
        let response = self.store.list_bookmarks(client).await;
        self.reads.pass().await;
        response
    }

    async fn add_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        self.writes.pass().await;
        self.store.add_bookmark(client, plan_id).await
    }

    async fn remove_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        self.writes.pass().await;
        self.store.remove_bookmark(client, plan_id).await
    }

    async fn list_history(&self, client: &ClientId) -> Result<Vec<WorkoutSession>> {
        let response = self.store.list_history(client).await;
        self.reads.pass().await;
        response
    }

    async fn create_session(
        &self,
        client: &ClientId,
        session: &NewWorkoutSession,
    ) -> Result<WorkoutSession> {
        self.writes.pass().await;
        self.store.create_session(client, session).await
    }

    async fn list_notes(&self, client: &ClientId) -> Result<NotesMap> {
        let response = self.store.list_notes(client).await;
        self.reads.pass().await;
        response
    }

    async fn save_note(&self, client: &ClientId, plan_id: &str, notes: &str) -> Result<()> {
        self.writes.pass().await;
        self.store.save_note(client, plan_id, notes).await
    }

    async fn delete_note(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        self.writes.pass().await;
        self.store.delete_note(client, plan_id).await
    }
}

pub async fn seeded_backend(plans: &[(&str, &str)]) -> Arc<GatedBackend> {
    let backend = Arc::new(GatedBackend::default());
    for (id, name) in plans {
        backend
            .store
            .assign_plan(&client(), WorkoutPlan::new(id, name))
            .await;
    }
    backend
}

pub fn sync_for(backend: Arc<GatedBackend>) -> Arc<WorkoutSync> {
    Arc::new(WorkoutSync::new(
        backend,
        SessionContext::for_client(CLIENT),
        SyncOptions::default(),
    ))
}

/// Seeded store with "p1"/"Leg Day", loaded into a fresh session.
pub async fn leg_day() -> (Arc<GatedBackend>, Arc<WorkoutSync>) {
    let backend = seeded_backend(&[("p1", "Leg Day")]).await;
    let sync = sync_for(Arc::clone(&backend));
    sync.refresh_all().await.expect("initial load");
    (backend, sync)
}
