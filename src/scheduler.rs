use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::utils::error::{AppError, Result};

/// Work fired by a trigger. Each call produces a fresh future.
pub type CycleCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Decides when reconciliation cycles run.
#[async_trait]
pub trait Trigger: Send + Sync {
    /// Runs `callback` once, right away, and waits for it.
    async fn run_immediately_once(&self, callback: CycleCallback) -> Result<()>;
    /// Fires `callback` every `interval_hours` until shutdown.
    async fn register_periodic(&self, interval_hours: u64, callback: CycleCallback) -> Result<()>;
    async fn shutdown(&self) -> Result<()>;
}

/// Production trigger backed by `tokio-cron-scheduler`.
pub struct CronTrigger {
    scheduler: JobScheduler,
    jobs: Mutex<Vec<Uuid>>,
}

impl CronTrigger {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::StartupConfiguration(format!("Failed to create scheduler: {}", e)))?;
        Ok(Self {
            scheduler,
            jobs: Mutex::new(Vec::new()),
        })
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

pub fn interval_duration(interval_hours: u64) -> Duration {
    Duration::from_secs(interval_hours.saturating_mul(60 * 60))
}

#[async_trait]
impl Trigger for CronTrigger {
    async fn run_immediately_once(&self, callback: CycleCallback) -> Result<()> {
        tracing::info!("Running initial check");
        callback().await;
        Ok(())
    }

    async fn register_periodic(&self, interval_hours: u64, callback: CycleCallback) -> Result<()> {
        let job = Job::new_repeated_async(interval_duration(interval_hours), move |_uuid, _l| {
            let callback = Arc::clone(&callback);
            Box::pin(async move {
                callback().await;
            })
        })?;

        let id = self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        self.jobs.lock().await.push(id);

        tracing::info!("Next check in {} hours", interval_hours);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        self.jobs.lock().await.clear();
        tracing::info!("Scheduler shutdown");
        Ok(())
    }
}
