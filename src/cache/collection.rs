use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::CollectionKind;

/// Sequence number handed out when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub kind: CollectionKind,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied { version: u64 },
    /// A later-issued fetch was already applied.
    Superseded,
    /// Issued before a local write the server may not have seen yet.
    PredatesMutation,
    /// The sync session ended while the request was in flight.
    Discarded,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStatus {
    pub kind: CollectionKind,
    pub version: u64,
    pub loaded: bool,
    pub stale: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Fully-replacing local copy of one server collection.
#[derive(Debug)]
pub struct Collection<T> {
    data: Arc<T>,
    version: u64,
    fetched_at: Option<DateTime<Utc>>,
    stale: bool,
    last_error: Option<String>,
    consecutive_failures: u32,
    applied_seq: u64,
    floor: u64,
}

impl<T: Default> Default for Collection<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(T::default()),
            version: 0,
            fetched_at: None,
            stale: false,
            last_error: None,
            consecutive_failures: 0,
            applied_seq: 0,
            floor: 0,
        }
    }
}

impl<T> Collection<T> {
    pub fn data(&self) -> Arc<T> {
        Arc::clone(&self.data)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the rejection for `ticket`, if any.
    pub fn check(&self, ticket: FetchTicket) -> Option<FetchOutcome> {
        if ticket.seq < self.floor {
            Some(FetchOutcome::PredatesMutation)
        } else if ticket.seq <= self.applied_seq {
            Some(FetchOutcome::Superseded)
        } else {
            None
        }
    }

    /// Installs server data for a ticket that passed `check`.
    pub fn accept(&mut self, ticket: FetchTicket, data: T, at: DateTime<Utc>) -> FetchOutcome {
        self.applied_seq = ticket.seq;
        self.data = Arc::new(data);
        self.version += 1;
        self.fetched_at = Some(at);
        self.stale = false;
        self.last_error = None;
        self.consecutive_failures = 0;
        FetchOutcome::Applied {
            version: self.version,
        }
    }

    pub fn apply_fetch(&mut self, ticket: FetchTicket, data: T, at: DateTime<Utc>) -> FetchOutcome {
        match self.check(ticket) {
            Some(rejected) => rejected,
            None => self.accept(ticket, data, at),
        }
    }

    /// Local (non-server) replacement, e.g. an optimistic patch.
    pub fn install(&mut self, data: T) -> u64 {
        self.data = Arc::new(data);
        self.version += 1;
        self.version
    }

    pub fn raise_floor(&mut self, seq: u64) {
        self.floor = self.floor.max(seq);
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn record_failure(&mut self, error: String) {
        self.last_error = Some(error);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn status(&self, kind: CollectionKind) -> CollectionStatus {
        CollectionStatus {
            kind,
            version: self.version,
            loaded: self.fetched_at.is_some(),
            stale: self.stale,
            last_error: self.last_error.clone(),
            consecutive_failures: self.consecutive_failures,
            fetched_at: self.fetched_at,
        }
    }
}
