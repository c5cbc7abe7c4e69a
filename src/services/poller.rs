use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::cache::CollectionKind;
use crate::config::PollingConfig;
use crate::error::Result;
use crate::interfaces::scheduler::PollingJob;
use crate::scheduler::Scheduler;
use crate::services::sync::WorkoutSync;

/// Periodic refetch of one collection.
pub struct RefreshJob {
    sync: Arc<WorkoutSync>,
    kind: CollectionKind,
    period: Duration,
    name: String,
}

impl RefreshJob {
    pub fn new(sync: Arc<WorkoutSync>, kind: CollectionKind, period: Duration) -> Self {
        Self {
            sync,
            kind,
            period,
            name: format!("refresh-{}", kind.resource()),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }
}

#[async_trait]
impl PollingJob for RefreshJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn tick(&self) -> Result<()> {
        self.sync.refresh(self.kind).await.map(|_| ())
    }
}

/// Keeps all four collections fresh while a session is open.
pub struct Poller {
    scheduler: Scheduler,
}

impl Poller {
    /// Nothing is scheduled without a client identity.
    pub fn start(sync: Arc<WorkoutSync>, polling: &PollingConfig) -> Self {
        let mut scheduler = Scheduler::new();
        if sync.session().is_available() {
            for kind in CollectionKind::ALL {
                scheduler.register_job(Arc::new(RefreshJob::new(
                    Arc::clone(&sync),
                    kind,
                    polling.interval(kind),
                )));
            }
            scheduler.start();
            info!(jobs = scheduler.job_count(), "polling started");
        } else {
            info!("no client identity; polling disabled");
        }
        Self { scheduler }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn job_count(&self) -> usize {
        self.scheduler.job_count()
    }

    pub async fn stop(&mut self) {
        self.scheduler.stop().await;
    }
}
