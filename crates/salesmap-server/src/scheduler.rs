//! Periodic snapshot refresh.
//!
//! A single repeated job on a [`JobScheduler`] calls
//! [`RecordCache::refresh`]. Enabling replaces any existing job; disabling
//! removes it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use crate::cache::RecordCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoRefreshStatus {
    pub enabled: bool,
    pub interval_secs: Option<u64>,
}

#[derive(Clone, Copy)]
struct ActiveJob {
    id: Uuid,
    interval_secs: u64,
}

pub struct AutoRefresh {
    scheduler: JobScheduler,
    cache: Arc<RecordCache>,
    active: Mutex<Option<ActiveJob>>,
}

impl AutoRefresh {
    /// Create and start the underlying scheduler with no job registered.
    ///
    /// The returned handle must be kept alive; dropping it stops refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler cannot be initialised
    /// or started.
    pub async fn start(cache: Arc<RecordCache>) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        Ok(Self {
            scheduler,
            cache,
            active: Mutex::new(None),
        })
    }

    /// Refresh every `interval_secs`, replacing any running schedule.
    /// Zero disables.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job cannot be swapped in.
    pub async fn enable(&self, interval_secs: u64) -> Result<AutoRefreshStatus, JobSchedulerError> {
        if interval_secs == 0 {
            return self.disable().await;
        }

        let mut active = self.active.lock().await;
        if let Some(job) = active.take() {
            self.scheduler.remove(&job.id).await?;
        }

        let cache = Arc::clone(&self.cache);
        let job = Job::new_repeated_async(
            Duration::from_secs(interval_secs),
            move |_uuid, _lock| {
                let cache = Arc::clone(&cache);
                Box::pin(async move {
                    match cache.refresh().await {
                        Ok(snapshot) => tracing::debug!(
                            records = snapshot.records.len(),
                            "scheduler: auto-refresh complete"
                        ),
                        Err(e) => tracing::warn!(error = %e, "scheduler: auto-refresh failed"),
                    }
                })
            },
        )?;
        let id = self.scheduler.add(job).await?;
        *active = Some(ActiveJob { id, interval_secs });

        tracing::info!(interval_secs, "auto-refresh enabled");
        Ok(AutoRefreshStatus {
            enabled: true,
            interval_secs: Some(interval_secs),
        })
    }

    /// Cancel periodic refresh. No-op when already disabled.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job cannot be removed.
    pub async fn disable(&self) -> Result<AutoRefreshStatus, JobSchedulerError> {
        let mut active = self.active.lock().await;
        if let Some(job) = active.take() {
            self.scheduler.remove(&job.id).await?;
            tracing::info!("auto-refresh disabled");
        }
        Ok(AutoRefreshStatus {
            enabled: false,
            interval_secs: None,
        })
    }

    pub async fn status(&self) -> AutoRefreshStatus {
        match *self.active.lock().await {
            Some(job) => AutoRefreshStatus {
                enabled: true,
                interval_secs: Some(job.interval_secs),
            },
            None => AutoRefreshStatus {
                enabled: false,
                interval_secs: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use salesmap_sheets::{MemorySource, RecordSource};

    use super::*;

    async fn auto_refresh(source: &Arc<MemorySource>) -> AutoRefresh {
        let cache = Arc::new(RecordCache::new(
            Arc::clone(source) as Arc<dyn RecordSource>,
            Duration::from_secs(3600),
        ));
        AutoRefresh::start(cache).await.expect("scheduler")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn starts_disabled() {
        let source = Arc::new(MemorySource::default());
        let refresh = auto_refresh(&source).await;
        assert_eq!(
            refresh.status().await,
            AutoRefreshStatus {
                enabled: false,
                interval_secs: None
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enable_then_disable_round_trips_status() {
        let source = Arc::new(MemorySource::default());
        let refresh = auto_refresh(&source).await;

        let status = refresh.enable(120).await.unwrap();
        assert_eq!(status.interval_secs, Some(120));
        assert_eq!(refresh.status().await, status);

        refresh.enable(300).await.unwrap();
        assert_eq!(refresh.status().await.interval_secs, Some(300));

        assert!(!refresh.disable().await.unwrap().enabled);
        assert!(!refresh.status().await.enabled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zero_interval_disables() {
        let source = Arc::new(MemorySource::default());
        let refresh = auto_refresh(&source).await;
        refresh.enable(60).await.unwrap();
        assert!(!refresh.enable(0).await.unwrap().enabled);
        assert!(!refresh.status().await.enabled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enabled_job_refreshes_the_cache() {
        let source = Arc::new(MemorySource::default());
        let refresh = auto_refresh(&source).await;
        refresh.enable(1).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(source.fetch_count() >= 1);
        refresh.disable().await.unwrap();
    }
}
