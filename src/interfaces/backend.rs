use async_trait::async_trait;

use crate::domains::{Bookmark, NewWorkoutSession, NotesMap, WorkoutPlan, WorkoutSession};
use crate::error::Result;
use crate::identity::ClientId;

/// Request/response boundary to the backing store. Every call is keyed by
/// the client identity.
#[async_trait]
pub trait WorkoutBackend: Send + Sync {
    async fn list_plans(&self, client: &ClientId) -> Result<Vec<WorkoutPlan>>;
    async fn list_bookmarks(&self, client: &ClientId) -> Result<Vec<Bookmark>>;
    async fn add_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()>;
    async fn remove_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()>;
    async fn list_history(&self, client: &ClientId) -> Result<Vec<WorkoutSession>>;
    async fn create_session(
        &self,
        client: &ClientId,
        session: &NewWorkoutSession,
    ) -> Result<WorkoutSession>;
    async fn list_notes(&self, client: &ClientId) -> Result<NotesMap>;
    async fn save_note(&self, client: &ClientId, plan_id: &str, notes: &str) -> Result<()>;
    async fn delete_note(&self, client: &ClientId, plan_id: &str) -> Result<()>;
}
