use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::cache::CollectionKind;
use crate::config::ApiConfig;
use crate::domains::{Bookmark, NewWorkoutSession, NotesMap, WorkoutPlan, WorkoutSession};
use crate::error::{FitproError, Result};
use crate::identity::ClientId;
use crate::interfaces::backend::WorkoutBackend;

/// REST transport against `/api/clients/{clientId}/...`.
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let base = Url::parse(api.base_url.trim())
            .map_err(|e| FitproError::Config(format!("invalid api.base_url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(FitproError::Config(format!(
                "api.base_url cannot carry a path: {base}"
            )));
        }
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = api.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| FitproError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base,
            auth_token: api
                .auth_token
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, client: &ClientId, kind: CollectionKind, plan_id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "clients", client.as_str(), kind.resource()]);
            if let Some(plan_id) = plan_id {
                segments.push(plan_id);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| FitproError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FitproError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(FitproError::Http(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    /// An empty or `null` body is an empty collection.
    async fn get_json<T: DeserializeOwned + Default>(
        &self,
        client: &ClientId,
        kind: CollectionKind,
    ) -> Result<T> {
        let url = self.endpoint(client, kind, None);
        debug!(%url, collection = %kind, "fetching collection");
        let body = self.send(self.request(Method::GET, url)).await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(T::default());
        }
        serde_json::from_str(trimmed)
            .map_err(|e| FitproError::Serialization(format!("{kind} decode failed: {e}")))
    }
}

#[async_trait]
impl WorkoutBackend for HttpBackend {
    async fn list_plans(&self, client: &ClientId) -> Result<Vec<WorkoutPlan>> {
        self.get_json(client, CollectionKind::Plans).await
    }

    async fn list_bookmarks(&self, client: &ClientId) -> Result<Vec<Bookmark>> {
        self.get_json(client, CollectionKind::Bookmarks).await
    }

    async fn add_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        let url = self.endpoint(client, CollectionKind::Bookmarks, Some(plan_id));
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    async fn remove_bookmark(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        let url = self.endpoint(client, CollectionKind::Bookmarks, Some(plan_id));
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn list_history(&self, client: &ClientId) -> Result<Vec<WorkoutSession>> {
        self.get_json(client, CollectionKind::History).await
    }

    async fn create_session(
        &self,
        client: &ClientId,
        session: &NewWorkoutSession,
    ) -> Result<WorkoutSession> {
        let url = self.endpoint(client, CollectionKind::History, None);
        let body = self
            .send(self.request(Method::POST, url).json(session))
            .await?;
        serde_json::from_str(&body)
            .map_err(|e| FitproError::Serialization(format!("session decode failed: {e}")))
    }

    async fn list_notes(&self, client: &ClientId) -> Result<NotesMap> {
        self.get_json(client, CollectionKind::Notes).await
    }

    async fn save_note(&self, client: &ClientId, plan_id: &str, notes: &str) -> Result<()> {
        let url = self.endpoint(client, CollectionKind::Notes, Some(plan_id));
        self.send(
            self.request(Method::POST, url)
                .json(&json!({ "notes": notes })),
        )
        .await?;
        Ok(())
    }

    async fn delete_note(&self, client: &ClientId, plan_id: &str) -> Result<()> {
        let url = self.endpoint(client, CollectionKind::Notes, Some(plan_id));
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
