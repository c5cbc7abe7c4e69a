use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// A unit of periodic work. The scheduler awaits each `tick` before the next
/// one may start, so a job never overlaps itself.
#[async_trait]
pub trait PollingJob: Send + Sync {
    fn name(&self) -> &str;
    fn period(&self) -> Duration;
    async fn tick(&self) -> Result<()>;
}
