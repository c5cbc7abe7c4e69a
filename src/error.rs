use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitproError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("no client identity in session")]
    Unavailable,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("mutation already in flight for plan {0}")]
    MutationInFlight(String),
    #[error("sync session closed")]
    Closed,
}

impl FitproError {
    /// No identity: the whole component tree is inert, retrying is pointless.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for FitproError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub use crate::Result;
