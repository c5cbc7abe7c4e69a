use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::interfaces::scheduler::PollingJob;

/// Runs each registered job on its own interval until stopped.
pub struct Scheduler {
    jobs: Vec<Arc<dyn PollingJob>>,
    handles: Vec<JoinHandle<()>>,
    stop: Option<watch::Sender<bool>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            handles: Vec::new(),
            stop: None,
        }
    }

    pub fn register_job(&mut self, job: Arc<dyn PollingJob>) {
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_some()
    }

    /// The first tick of every job fires immediately. A tick that overruns its
    /// period delays the next one instead of bursting to catch up.
    pub fn start(&mut self) {
        if self.stop.is_some() {
            return;
        }
        let (tx, rx) = watch::channel(false);
        self.stop = Some(tx);

        for job in &self.jobs {
            let job = Arc::clone(job);
            let mut tick = tokio::time::interval(job.period());
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut rx = rx.clone();
            let handle = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            tokio::select! {
                                result = job.tick() => {
                                    if let Err(err) = result {
                                        debug!(job = job.name(), error = %err, "polling tick failed");
                                    }
                                }
                                _ = rx.changed() => break,
                            }
                        }
                        _ = rx.changed() => break,
                    }
                    if *rx.borrow() {
                        break;
                    }
                }
            });
            self.handles.push(handle);
        }
    }

    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(true);
        }
        let handles = std::mem::take(&mut self.handles);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
