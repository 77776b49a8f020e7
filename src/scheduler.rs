//! Cron trigger for the daily runway job.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::monitor::RunwayMonitor;
use crate::snapshot::RunwaySnapshot;

/// Run the job once, logging the outcome. Errors are returned, never panicked on.
pub async fn run_job(monitor: &RunwayMonitor) -> eyre::Result<RunwaySnapshot> {
    tracing::info!("Daily runway job started");
    match monitor.run_daily_job().await {
        Ok(snapshot) => {
            tracing::info!(
                timestamp = snapshot.timestamp,
                runway_in_seconds = ?snapshot.runway_in_seconds,
                reward_debt = %snapshot.reward_debt,
                "Daily runway job finished"
            );
            Ok(snapshot)
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Failed to run daily job");
            Err(e)
        }
    }
}

pub struct DailyScheduler {
    monitor: Arc<RunwayMonitor>,
    cron: String,
}

impl DailyScheduler {
    pub fn new(monitor: Arc<RunwayMonitor>, cron: impl Into<String>) -> Self {
        Self {
            monitor,
            cron: cron.into(),
        }
    }

    /// Register the job and keep the scheduler alive until `shutdown` fires. A failed run
    /// is logged and the next tick runs as usual.
    pub async fn run(&self, shutdown: CancellationToken) -> eyre::Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        let monitor = self.monitor.clone();
        let job = Job::new_async(self.cron.as_str(), move |_uuid, _lock| {
            let monitor = monitor.clone();
            Box::pin(async move {
                let _ = run_job(&monitor).await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;
        tracing::info!(cron = %self.cron, "Daily runway job scheduled (UTC)");

        shutdown.cancelled().await;
        tracing::info!("Scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }
}
