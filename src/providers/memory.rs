use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domains::{Bookmark, NewWorkoutSession, NotesMap, WorkoutPlan, WorkoutSession};
use crate::error::{FitproError, Result};
use crate::identity::ClientId;
use crate::interfaces::backend::WorkoutBackend;

#[derive(Debug, Default, Clone)]
struct ClientRecords {
    plans: Vec<WorkoutPlan>,
    bookmarks: Vec<Bookmark>,
    history: Vec<WorkoutSession>,
    notes: NotesMap,
}

/// Key-value identity store standing in for the server: per-client records,
/// store-assigned ids, one bookmark per plan, empty note text means no note.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    clients: RwLock<HashMap<ClientId, ClientRecords>>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trainer-side assignment, outside the client's write path.
    pub async fn assign_plan(&self, client: &ClientId, plan: WorkoutPlan) {
        let mut clients = self.clients.write().await;
        let records = clients.entry(client.clone()).or_default();
        records.plans.retain(|existing| existing.id != plan.id);
        records.plans.push(plan);
    }

    /// Deletes a plan and everything referencing it.
    pub async fn remove_plan(&self, client: &ClientId, plan_id: &str) -> bool {
        let mut clients = self.clients.write().await;
        let Some(records) = clients.get_mut(client) else {
            return false;
        };
        let before = records.plans.len();
        records.plans.retain(|plan| plan.id != plan_id);
        records.bookmarks.retain(|b| b.workout_plan_id != plan_id);
        records.history.retain(|s| s.workout_plan_id != plan_id);
        records.notes.remove(plan_id);
        records.plans.len() != before
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn read<T>(&self, client: &ClientId, f: impl FnOnce(&ClientRecords) -> T) -> Result<T> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FitproError::Http("HTTP 503 Service Unavailable: read failed".to_string()));
        }
        let clients = self.clients.read().await;
        let empty = ClientRecords::default();
        Ok(f(clients.get(client).unwrap_or(&empty)))
    }

    async fn write<T>(
        &self,
        client: &ClientId,
        f: impl FnOnce(&mut ClientRecords) -> T,
    ) -> Result<T> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FitproError::Http("HTTP 500 Internal Server Error: write failed".to_string()));
        }
        let mut clients = self.clients.write().await;
        Ok(f(clients.entry(client.clone()).or_default()))
    }
}

#[async_trait]
impl WorkoutBackend for InMemoryBackend {
    async fn list_plans(&self, client: &ClientId) -> Result<Vec<WorkoutPlan>> {
        self.read(client, |records| records.plans.clone()).await
    }

    async fn list_bookmarks(&self, client: &ClientId) -> Result<Vec<Bookmark>> {
        self.read(client, |records| records.bookmarks.clone()).await
    }

    async fn add_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        let id = self.next_id("bookmark");
        self.write(client, |records| {
            if records.bookmarks.iter().any(|b| b.workout_plan_id == plan_id) {
                return;
            }
            let workout_plan = records.plans.iter().find(|p| p.id == plan_id).cloned();
            records.bookmarks.push(Bookmark {
                id: Some(id),
                workout_plan_id: plan_id.to_string(),
                workout_plan,
            });
        })
        .await
    }

    async fn remove_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        self.write(client, |records| {
            records.bookmarks.retain(|b| b.workout_plan_id != plan_id);
        })
        .await
    }

    async fn list_history(&self, client: &ClientId) -> Result<Vec<WorkoutSession>> {
        self.read(client, |records| records.history.clone()).await
    }

    async fn create_session(
        &self,
        client: &ClientId,
        session: &NewWorkoutSession,
    ) -> Result<WorkoutSession> {
        let created = WorkoutSession {
            id: self.next_id("session"),
            workout_plan_id: session.workout_plan_id.clone(),
            workout_name: session.workout_name.clone(),
            duration: session.duration,
            completed_at: Utc::now(),
            notes: Some(session.notes.clone()).filter(|n| !n.is_empty()),
        };
        self.write(client, |records| {
            records.history.push(created.clone());
            created
        })
        .await
    }

    async fn list_notes(&self, client: &ClientId) -> Result<NotesMap> {
        self.read(client, |records| records.notes.clone()).await
    }

    async fn save_note(&self, client: &ClientId, plan_id: &str, notes: &str) -> Result<()> {
        self.write(client, |records| {
            if notes.is_empty() {
                records.notes.remove(plan_id);
            } else {
                records.notes.insert(plan_id.to_string(), notes.to_string());
            }
        })
        .await
    }

    async fn delete_note(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        self.write(client, |records| {
            records.notes.remove(plan_id);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientId {
        ClientId::parse("c1").expect("id")
    }

    #[tokio::test]
    async fn bookmarks_are_unique_per_plan_and_carry_plan_copy() {
        let backend = InMemoryBackend::new();
        backend
            .assign_plan(&client(), WorkoutPlan::new("p1", "Leg Day"))
            .await;
        backend.add_bookmark(&client(), "p1").await.expect("add");
        backend.add_bookmark(&client(), "p1").await.expect("add again");

        let bookmarks = backend.list_bookmarks(&client()).await.expect("list");
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(
            bookmarks[0].workout_plan.as_ref().map(|p| p.name.as_str()),
            Some("Leg Day")
        );
        assert!(!bookmarks[0].is_synthetic());
    }

    #[tokio::test]
    async fn unknown_client_reads_empty_and_failures_are_injected() {
        let backend = InMemoryBackend::new();
        assert!(backend.list_plans(&client()).await.expect("plans").is_empty());
        assert!(backend.list_notes(&client()).await.expect("notes").is_empty());

        backend.set_fail_writes(true);
        let err = backend.save_note(&client(), "p1", "x").await.unwrap_err();
        assert!(matches!(err, FitproError::Http(_)));
        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.read_count(), 2);
    }

    #[tokio::test]
    async fn removing_a_plan_cascades() {
        let backend = InMemoryBackend::new();
        let c = client();
        backend.assign_plan(&c, WorkoutPlan::new("p1", "Leg Day")).await;
        backend.add_bookmark(&c, "p1").await.expect("bookmark");
        backend.save_note(&c, "p1", "deep squats").await.expect("note");
        backend
            .create_session(
                &c,
                &NewWorkoutSession {
                    workout_plan_id: "p1".to_string(),
                    workout_name: "Leg Day".to_string(),
                    duration: 40,
                    notes: String::new(),
                },
            )
            .await
            .expect("session");

        assert!(backend.remove_plan(&c, "p1").await);
        assert!(backend.list_bookmarks(&c).await.expect("b").is_empty());
        assert!(backend.list_history(&c).await.expect("h").is_empty());
        assert!(backend.list_notes(&c).await.expect("n").is_empty());
        assert!(!backend.remove_plan(&c, "p1").await);
    }
}
