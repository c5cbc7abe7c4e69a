mod common;

use std::sync::Arc;
use std::time::Duration;

use fitpro_sync::cache::CollectionKind;
use fitpro_sync::config::PollingConfig;
use fitpro_sync::identity::SessionContext;
use fitpro_sync::interfaces::backend::WorkoutBackend;
use fitpro_sync::interfaces::scheduler::PollingJob;
use fitpro_sync::services::{Poller, RefreshJob, SyncOptions, WorkoutSync};

use common::{client, seeded_backend, sync_for};

fn fast_polling() -> PollingConfig {
    PollingConfig {
        plans_seconds: 1,
        bookmarks_seconds: 1,
        history_seconds: 1,
        notes_seconds: 1,
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn first_ticks_load_every_collection() {
    let backend = seeded_backend(&[("p1", "Leg Day")]).await;
    let sync = sync_for(Arc::clone(&backend));

    let mut poller = Poller::start(Arc::clone(&sync), &fast_polling());
    assert!(poller.is_running());
    assert_eq!(poller.job_count(), 4);

    wait_until(|| CollectionKind::ALL.iter().all(|kind| sync.status(*kind).loaded)).await;
    assert_eq!(sync.read_model().expect("model").plans().len(), 1);

    poller.stop().await;
    assert!(!poller.is_running());
    let reads = backend.store.read_count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.store.read_count(), reads);
}

#[tokio::test]
async fn polling_picks_up_server_side_changes() {
    let backend = seeded_backend(&[]).await;
    let sync = sync_for(Arc::clone(&backend));
    let mut poller = Poller::start(Arc::clone(&sync), &fast_polling());
    wait_until(|| sync.status(CollectionKind::Plans).loaded).await;

    backend
        .store
        .assign_plan(&client(), fitpro_sync::domains::WorkoutPlan::new("p9", "Mobility"))
        .await;
    wait_until(|| {
        sync.read_model()
            .map(|model| model.plan("p9").is_some())
            .unwrap_or(false)
    })
    .await;
    poller.stop().await;
}

#[tokio::test]
async fn nothing_is_scheduled_without_identity() {
    let backend = seeded_backend(&[("p1", "Leg Day")]).await;
    let sync = Arc::new(WorkoutSync::new(
        Arc::clone(&backend) as Arc<dyn WorkoutBackend>,
        SessionContext::anonymous(),
        SyncOptions::default(),
    ));

    let mut poller = Poller::start(sync, &fast_polling());
    assert!(!poller.is_running());
    assert_eq!(poller.job_count(), 0);
    poller.stop().await;
    assert_eq!(backend.store.read_count(), 0);
}

#[tokio::test]
async fn refresh_job_reports_fetch_failures() {
    let backend = seeded_backend(&[("p1", "Leg Day")]).await;
    let sync = sync_for(Arc::clone(&backend));
    let job = RefreshJob::new(Arc::clone(&sync), CollectionKind::History, Duration::from_secs(60));
    assert_eq!(job.name(), "refresh-workout-history");
    assert_eq!(job.period(), Duration::from_secs(60));
    assert_eq!(job.kind(), CollectionKind::History);

    job.tick().await.expect("first tick");
    backend.store.set_fail_reads(true);
    assert!(job.tick().await.is_err());
    assert!(sync.status(CollectionKind::History).loaded);
}
