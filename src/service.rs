use std::future::Future;
use std::sync::Arc;

use crate::models::{LogEntry, LogKind};
use crate::reconciler::ReconciliationLoop;
use crate::scheduler::Trigger;
use crate::utils::error::Result;

/// Runs one cycle now, then every `interval_hours` until `shutdown`
/// resolves. `shutdown` is watched from the start, so a stop during the
/// first cycle abandons it. Stopping records a `STOPPED` entry and tears the
/// trigger down; a cycle still in flight is not resumed.
pub async fn run_until_stopped<F>(
    watcher: Arc<ReconciliationLoop>,
    trigger: &dyn Trigger,
    interval_hours: u64,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tracing::info!("Starting auto-updater, checking every {} hours", interval_hours);

    tokio::pin!(shutdown);

    let callback = watcher.cycle_callback();
    let startup = async {
        trigger.run_immediately_once(Arc::clone(&callback)).await?;
        trigger.register_periodic(interval_hours, Arc::clone(&callback)).await
    };

    let stopped_during_startup = tokio::select! {
        biased;
        _ = &mut shutdown => true,
        started = startup => {
            started?;
            false
        }
    };

    if stopped_during_startup {
        tracing::info!("Stop requested before the first cycle finished");
    } else {
        shutdown.await;
    }

    tracing::info!("Shutting down...");
    watcher
        .store()
        .record(LogEntry::new(LogKind::Stopped, "Auto-updater stopped manually"));
    trigger.shutdown().await
}
