use serde::Serialize;

use crate::cache::CollectionKind;

pub const BOOKMARK_UPDATED: &str = "Workout bookmark updated";
pub const BOOKMARK_FAILED: &str = "Failed to update bookmark";
pub const SESSION_LOGGED: &str = "Workout session logged successfully!";
pub const SESSION_FAILED: &str = "Failed to log workout";
pub const NOTES_SAVED: &str = "Notes saved successfully!";
pub const NOTES_FAILED: &str = "Failed to save notes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    /// Inline form message; nothing was sent.
    Invalid,
    Error,
}

/// User-facing message raised by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: &str) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.to_string(),
        }
    }

    pub fn invalid(message: &str) -> Self {
        Self {
            level: NoticeLevel::Invalid,
            message: message.to_string(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.to_string(),
        }
    }
}

/// Side channel for observers. Fetch failures travel here instead of the
/// read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    SnapshotApplied { kind: CollectionKind, version: u64 },
    FetchFailed { kind: CollectionKind, error: String },
    Notice(Notice),
}
