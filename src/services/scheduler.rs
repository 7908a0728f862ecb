//! Periodic dispatch and stale-search recovery (C8), built on the generic
//! `ScheduledExecutor`/`ScheduledTask` pair. Two independent tasks run on
//! their own intervals: `DispatchTask` claims ready PENDING searches and
//! spawns bounded Worker runs, `StaleRecoveryTask` resets or fails searches
//! stuck in PROCESSING (spec §4.5).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::Semaphore;

use crate::services::store::SearchesRepo;
use crate::services::worker::{Worker, MAX_RETRIES};
use crate::utils::scheduled_executor::ScheduledTask;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub dispatch_interval: Duration,
    pub recovery_interval: Duration,
    pub max_concurrent: usize,
    pub dispatch_batch_size: i64,
    pub stale_after: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(60),
            recovery_interval: Duration::from_secs(120),
            max_concurrent: 3,
            dispatch_batch_size: 10,
            stale_after: Duration::from_secs(300),
        }
    }
}

/// Claims ready PENDING searches under `FOR UPDATE SKIP LOCKED` and spawns
/// a Worker run per search, bounded by a semaphore sized to
/// `max_concurrent` — multiple Scheduler instances across processes stay
/// dispatch-exclusive because the claim itself is the exclusivity
/// mechanism, not the semaphore (spec §4.5, §8 "Dispatch exclusivity").
pub struct DispatchTask {
    searches_repo: Arc<SearchesRepo>,
    worker: Arc<Worker>,
    semaphore: Arc<Semaphore>,
    batch_size: i64,
}

impl DispatchTask {
    pub fn new(searches_repo: Arc<SearchesRepo>, worker: Arc<Worker>, config: &SchedulerConfig) -> Self {
        Self {
            searches_repo,
            worker,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            batch_size: config.dispatch_batch_size,
        }
    }
}

impl ScheduledTask for DispatchTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            let available = self.semaphore.available_permits();
            if available == 0 {
                return Ok(());
            }

            let limit = self.batch_size.min(available as i64);
            let ready = self.searches_repo.find_pending_ready(Utc::now(), MAX_RETRIES, limit).await?;

            for search in ready {
                let permit = self.semaphore.clone().acquire_owned().await?;
                let worker = self.worker.clone();
                tokio::spawn(async move {
                    worker.run(search.id).await;
                    drop(permit);
                });
            }

            Ok(())
        })
    }
}

/// Resets stale PROCESSING searches back to PENDING with back-off, then
/// terminal-fails the ones that already exhausted their retries — run in
/// that order each tick so a search is never both reset and failed in the
/// same pass (spec §4.3, §4.5).
pub struct StaleRecoveryTask {
    searches_repo: Arc<SearchesRepo>,
    stale_after: ChronoDuration,
}

impl StaleRecoveryTask {
    pub fn new(searches_repo: Arc<SearchesRepo>, config: &SchedulerConfig) -> Self {
        let stale_after = ChronoDuration::from_std(config.stale_after)
            .unwrap_or_else(|_| ChronoDuration::seconds(120));
        Self { searches_repo, stale_after }
    }
}

impl ScheduledTask for StaleRecoveryTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            let now = Utc::now();
            let reset = self.searches_repo.reset_stale(now, self.stale_after, MAX_RETRIES).await?;
            if reset > 0 {
                tracing::info!(count = reset, "reset stale processing searches to pending");
            }

            let failed =
                self.searches_repo.mark_permanently_failed(now, self.stale_after, MAX_RETRIES).await?;
            if failed > 0 {
                tracing::warn!(count = failed, "permanently failed stale searches past retry limit");
            }

            Ok(())
        })
    }
}
