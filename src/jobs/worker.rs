use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::DbErr;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{
    config::WorkerConfig,
    database::models::{job, job_status::JobStatus},
    emails::{BulkSender, DispatchContext},
    jobs::{
        job_store::{Claim, DispatchReport, JobStore},
        DispatchError,
    },
    recipients::RecipientResolver,
};

/// Polls the store for due jobs and runs them one at a time.
#[derive(Clone)]
pub struct Worker {
    store: JobStore,
    resolver: Arc<dyn RecipientResolver>,
    sender: Arc<dyn BulkSender>,
    config: WorkerConfig,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Worker {
    pub fn new(
        store: JobStore,
        resolver: Arc<dyn RecipientResolver>,
        sender: Arc<dyn BulkSender>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            sender,
            config,
        }
    }

    pub const fn store(&self) -> &JobStore {
        &self.store
    }

    /// Run one poll tick against the wall clock. Returns the number of jobs processed.
    pub async fn tick(&self) -> Result<usize, DbErr> {
        self.tick_with_clock(Utc::now).await
    }

    /// Run one poll tick on a clock that reads `now` when the tick starts and
    /// advances in real time from there.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<usize, DbErr> {
        let origin = Instant::now();
        self.tick_with_clock(move || advance(now, origin.elapsed()))
            .await
    }

    /// Run one poll tick, reading `clock` whenever a job is claimed or finalized.
    pub async fn tick_with_clock<C>(&self, clock: C) -> Result<usize, DbErr>
    where
        C: Fn() -> DateTime<Utc>,
    {
        let now = clock();

        if let Some(stale_after) = self.config.stale_after_seconds {
            let stale_after = i64::try_from(stale_after)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX);
            let cutoff = now.checked_sub_signed(stale_after).unwrap_or(DateTime::<Utc>::MIN_UTC);

            for job in self.store.recover_stale_jobs(cutoff, now).await? {
                warn!(
                    job_id = %job.id,
                    "🧟 Recovered stale job '{}', now {} (retry {}/{})",
                    job.name, job.status, job.retry_count, job.max_retries
                );
            }
        }

        let due_jobs = self.store.list_due_jobs(now).await?;
        if due_jobs.is_empty() {
            debug!("No due jobs at {}", now);
            return Ok(0);
        }

        let mut processed = 0;
        for due in due_jobs {
            let Some(claim) = self.store.claim_job(due.id, clock()).await? else {
                debug!(job_id = %due.id, "Job '{}' is no longer claimable, skipping", due.name);
                continue;
            };

            info!(
                job_id = %claim.job.id,
                attempt = claim.execution.attempt,
                "🔧 Claimed job '{}'",
                claim.job.name
            );

            self.execute(&claim, &clock).await?;
            processed += 1;
        }

        Ok(processed)
    }

    async fn execute<C>(&self, claim: &Claim, clock: &C) -> Result<job::Model, DbErr>
    where
        C: Fn() -> DateTime<Utc>,
    {
        let start_time = Instant::now();
        let outcome = self.dispatch(claim).await;
        let execution_duration = start_time.elapsed();
        let finished_at = clock();

        match outcome {
            Ok(report) => {
                let job = self
                    .store
                    .complete_execution(claim, &report, finished_at)
                    .await?;
                info!(
                    job_id = %job.id,
                    "✅ Job '{}' dispatched {} email(s) in {:?}, next run {:?}",
                    job.name, report.emails_sent, execution_duration, job.next_run_at
                );
                Ok(job)
            }
            Err(dispatch_error) => {
                let job = self
                    .store
                    .fail_execution(claim, &dispatch_error, finished_at)
                    .await?;

                if job.status == JobStatus::DeadLetter {
                    error!(
                        job_id = %job.id,
                        "💀 Job '{}' dead-lettered after {} failure(s): {}",
                        job.name, job.retry_count, dispatch_error
                    );
                } else {
                    warn!(
                        job_id = %job.id,
                        "❌ Job '{}' failed attempt {}: {}. Next attempt at {:?}",
                        job.name, claim.execution.attempt, dispatch_error, job.next_run_at
                    );
                }
                Ok(job)
            }
        }
    }

    async fn dispatch(&self, claim: &Claim) -> Result<DispatchReport, DispatchError> {
        let recipients = self.resolver.resolve(&claim.job).await?;

        let context = DispatchContext {
            job_id: claim.job.id,
            job_name: claim.job.name.clone(),
            attempt: claim.execution.attempt,
        };
        let result = self
            .sender
            .send_bulk(&claim.job.template_name, &recipients, &context)
            .await?;

        Ok(DispatchReport {
            recipients,
            emails_sent: result.total_dispatched,
        })
    }

    /// Tick until interrupted, sleeping `poll_interval` in between, or tick once.
    ///
    /// Store errors end a single-shot run; in loop mode they are logged and the
    /// next tick is attempted after the usual sleep.
    pub async fn start(&self, poll_interval: Duration, run_once: bool) -> Result<(), DbErr> {
        if run_once {
            let processed = self.tick().await?;
            info!("Processed {} job(s)", processed);
            return Ok(());
        }

        info!("👷 Worker started, polling every {:?}", poll_interval);

        loop {
            match self.tick().await {
                Ok(0) => {}
                Ok(processed) => info!("Processed {} job(s)", processed),
                Err(e) => error!("Worker tick failed: {}", e),
            }

            tokio::select! {
                () = sleep(poll_interval) => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("🛑 Worker shutting down");
                    return Ok(());
                }
            }
        }
    }
}

fn advance(origin: DateTime<Utc>, elapsed: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(elapsed)
        .ok()
        .and_then(|elapsed| origin.checked_add_signed(elapsed))
        .unwrap_or(origin)
}
