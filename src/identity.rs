use std::fmt;

use crate::error::{FitproError, Result};

pub const CLIENT_ID_ENV: &str = "FITPRO_CLIENT_ID";

/// Opaque identifier of the signed-in client, as issued by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session state handed to the sync engine. Every operation is gated on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    client_id: Option<ClientId>,
}

impl SessionContext {
    pub fn new(client_id: Option<ClientId>) -> Self {
        Self { client_id }
    }

    pub fn for_client(raw: &str) -> Self {
        Self::new(ClientId::parse(raw))
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// First non-blank source wins: explicit flag, then environment, then config.
    pub fn resolve(cli: Option<&str>, env: Option<&str>, config: Option<&str>) -> Self {
        let client_id = [cli, env, config]
            .into_iter()
            .flatten()
            .find_map(ClientId::parse);
        Self { client_id }
    }

    /// [`SessionContext::resolve`] with the environment slot read from
    /// `FITPRO_CLIENT_ID`.
    pub fn resolve_with_env(cli: Option<&str>, config: Option<&str>) -> Self {
        let env = std::env::var(CLIENT_ID_ENV).ok();
        Self::resolve(cli, env.as_deref(), config)
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.client_id.is_some()
    }

    pub fn require(&self) -> Result<&ClientId> {
        self.client_id.as_ref().ok_or(FitproError::Unavailable)
    }
}
