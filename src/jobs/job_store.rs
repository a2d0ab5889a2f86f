//! Transactional repository for jobs and their executions.
//!
//! Every public operation runs in its own transaction: it begins one, does all
//! of its reads and writes through it, and commits. Any early return drops the
//! uncommitted transaction, which rolls it back. No transaction is held open
//! across a call to an external collaborator.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    database::models::{
        execution_status::ExecutionStatus,
        job::{self, Entity as JobEntity},
        job_execution::{self, Entity as JobExecutionEntity},
        job_status::JobStatus,
        recipient_source::RecipientSource,
        schedule_kind::ScheduleKind,
    },
    jobs::{
        retry_policy::{RetryDecision, RetryPolicy},
        schedule::compute_next_run,
        scheduling_service::JobRequest,
        DispatchError, SchedulerError,
    },
    recipients::Recipients,
};

/// A job that has been moved to `running`, with the execution opened for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub job: job::Model,
    pub execution: job_execution::Model,
}

/// What a successful attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub recipients: Vec<String>,
    pub emails_sent: usize,
}

#[derive(Debug, Clone)]
pub struct JobStore {
    db: DatabaseConnection,
    retry_policy: RetryPolicy,
}

impl JobStore {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        Self {
            db,
            retry_policy: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Validate and persist a new job with its first `next_run_at` computed from `now`.
    pub async fn create_job(
        &self,
        request: &JobRequest,
        now: DateTime<Utc>,
    ) -> Result<job::Model, SchedulerError> {
        request.validate_request()?;
        let next_run_at = compute_next_run(&request.schedule(), now)?;

        let (recipient_source, recipients, recipient_filter) = match request.recipient_payload()? {
            Recipients::StaticList(list) => (RecipientSource::StaticList, Some(json!(list)), None),
            Recipients::Filter(filter) => (RecipientSource::Filter, None, Some(json!(filter))),
        };

        let new_job = job::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.clone()),
            template_name: Set(request.template_name.clone()),
            schedule_kind: Set(request.schedule_kind),
            run_at: Set(request.run_at),
            cron_expression: Set(request.cron_expression.clone()),
            recipient_source: Set(recipient_source),
            recipients: Set(recipients),
            recipient_filter: Set(recipient_filter),
            next_run_at: Set(Some(next_run_at)),
            status: Set(JobStatus::Scheduled),
            retry_count: Set(0),
            max_retries: Set(request.max_retries),
            last_error: Set(None),
            cancelled: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.db.begin().await?;
        let job = new_job.insert(&txn).await?;
        txn.commit().await?;

        Ok(job)
    }

    /// Jobs eligible for dispatch at `now`, oldest-due first.
    pub async fn list_due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<job::Model>, DbErr> {
        let txn = self.db.begin().await?;

        let jobs = JobEntity::find()
            .filter(job::Column::Cancelled.eq(false))
            .filter(job::Column::NextRunAt.is_not_null())
            .filter(job::Column::NextRunAt.lte(now))
            .filter(job::Column::Status.is_in(JobStatus::DISPATCHABLE))
            .order_by_asc(job::Column::NextRunAt)
            .order_by_asc(job::Column::CreatedAt)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(jobs)
    }

    /// All jobs, newest created first.
    pub async fn list_jobs(&self) -> Result<Vec<job::Model>, DbErr> {
        JobEntity::find()
            .order_by_desc(job::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    pub async fn get_job(&self, id: Uuid) -> Result<job::Model, SchedulerError> {
        JobEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(SchedulerError::NotFound(id))
    }

    pub async fn cancel_job(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<job::Model, SchedulerError> {
        let txn = self.db.begin().await?;

        let job = JobEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(SchedulerError::NotFound(id))?;

        let mut active_job: job::ActiveModel = job.into();
        active_job.status = Set(JobStatus::Cancelled);
        active_job.cancelled = Set(true);
        active_job.next_run_at = Set(None);
        active_job.updated_at = Set(now);
        let job = active_job.update(&txn).await?;

        txn.commit().await?;
        Ok(job)
    }

    /// Most recent executions of a job, newest first.
    pub async fn recent_executions(
        &self,
        job_id: Uuid,
        limit: u64,
    ) -> Result<Vec<job_execution::Model>, DbErr> {
        JobExecutionEntity::find()
            .filter(job_execution::Column::JobId.eq(job_id))
            .order_by_desc(job_execution::Column::CreatedAt)
            .order_by_desc(job_execution::Column::Attempt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    /// Move a due job to `running` and open an execution for it.
    ///
    /// The status change is a conditional update, so a job that was cancelled
    /// or claimed since it was listed is left alone and `None` is returned.
    pub async fn claim_job(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Claim>, DbErr> {
        let txn = self.db.begin().await?;

        let claimed = JobEntity::update_many()
            .set(job::ActiveModel {
                status: Set(JobStatus::Running),
                last_error: Set(None),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(job::Column::Id.eq(job_id))
            .filter(job::Column::Cancelled.eq(false))
            .filter(job::Column::Status.is_in(JobStatus::DISPATCHABLE))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let Some(job) = JobEntity::find_by_id(job_id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let execution = job_execution::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job.id),
            status: Set(ExecutionStatus::Running),
            attempt: Set(job.next_attempt()),
            started_at: Set(Some(now)),
            finished_at: Set(None),
            error: Set(None),
            emails_sent: Set(0),
            details: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(Some(Claim { job, execution }))
    }

    /// Record a successful attempt and advance the job's schedule.
    pub async fn complete_execution(
        &self,
        claim: &Claim,
        report: &DispatchReport,
        now: DateTime<Utc>,
    ) -> Result<job::Model, DbErr> {
        let txn = self.db.begin().await?;
        let current = find_job(&txn, claim.job.id).await?;

        let mut active_execution: job_execution::ActiveModel = claim.execution.clone().into();
        active_execution.status = Set(ExecutionStatus::Succeeded);
        active_execution.emails_sent = Set(i32::try_from(report.emails_sent).unwrap_or(i32::MAX));
        active_execution.finished_at = Set(Some(now));
        active_execution.details = Set(Some(json!({ "recipients": report.recipients })));
        active_execution.update(&txn).await?;

        let mut active_job: job::ActiveModel = current.clone().into();
        active_job.retry_count = Set(0);
        active_job.last_error = Set(None);
        active_job.updated_at = Set(now);

        if current.cancelled {
            // Cancelled mid-dispatch: keep it cancelled.
            debug!(job_id = %current.id, "Job was cancelled while running");
        } else {
            match advance_schedule(&current, now) {
                Ok((status, next_run_at)) => {
                    active_job.status = Set(status);
                    active_job.next_run_at = Set(next_run_at);
                }
                Err(e) => {
                    // A schedule that cannot be recomputed will never succeed on retry.
                    warn!(job_id = %current.id, "Cannot advance schedule: {}", e);
                    active_job.status = Set(JobStatus::DeadLetter);
                    active_job.next_run_at = Set(None);
                    active_job.last_error = Set(Some(e.to_string()));
                }
            }
        }

        let job = active_job.update(&txn).await?;
        txn.commit().await?;
        Ok(job)
    }

    /// Record a failed attempt and apply the retry policy.
    pub async fn fail_execution(
        &self,
        claim: &Claim,
        error: &DispatchError,
        now: DateTime<Utc>,
    ) -> Result<job::Model, DbErr> {
        let txn = self.db.begin().await?;
        let current = find_job(&txn, claim.job.id).await?;

        let job = self
            .apply_failure(&txn, current, claim.execution.clone().into(), error, now)
            .await?;

        txn.commit().await?;
        Ok(job)
    }

    /// Fail jobs that have been `running` since before `cutoff`, as if their
    /// in-flight attempt had failed.
    pub async fn recover_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<job::Model>, DbErr> {
        let stale_ids: Vec<Uuid> = JobEntity::find()
            .select_only()
            .column(job::Column::Id)
            .filter(job::Column::Status.eq(JobStatus::Running))
            .filter(job::Column::UpdatedAt.lte(cutoff))
            .order_by_asc(job::Column::UpdatedAt)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut recovered = Vec::with_capacity(stale_ids.len());
        for job_id in stale_ids {
            let txn = self.db.begin().await?;
            let current = find_job(&txn, job_id).await?;

            // Re-check inside the transaction; the job may have finished meanwhile.
            if current.status != JobStatus::Running || current.updated_at > cutoff {
                txn.rollback().await?;
                continue;
            }

            let open_execution = JobExecutionEntity::find()
                .filter(job_execution::Column::JobId.eq(job_id))
                .filter(job_execution::Column::Status.eq(ExecutionStatus::Running))
                .order_by_desc(job_execution::Column::CreatedAt)
                .one(&txn)
                .await?;

            let execution = match open_execution {
                Some(execution) => execution,
                None => {
                    job_execution::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        job_id: Set(job_id),
                        status: Set(ExecutionStatus::Running),
                        attempt: Set(current.next_attempt()),
                        started_at: Set(Some(current.updated_at)),
                        finished_at: Set(None),
                        error: Set(None),
                        emails_sent: Set(0),
                        details: Set(None),
                        created_at: Set(now),
                    }
                    .insert(&txn)
                    .await?
                }
            };

            let running_for = now.signed_duration_since(current.updated_at).num_seconds();
            let job = self
                .apply_failure(&txn, current, execution.into(), &DispatchError::Stale(running_for), now)
                .await?;

            txn.commit().await?;
            recovered.push(job);
        }

        Ok(recovered)
    }

    async fn apply_failure<C: ConnectionTrait>(
        &self,
        conn: &C,
        current: job::Model,
        mut execution: job_execution::ActiveModel,
        error: &DispatchError,
        now: DateTime<Utc>,
    ) -> Result<job::Model, DbErr> {
        let message = error.to_string();

        execution.status = Set(ExecutionStatus::Failed);
        execution.error = Set(Some(message.clone()));
        execution.finished_at = Set(Some(now));
        execution.update(conn).await?;

        let retry_count = current.retry_count.saturating_add(1);
        let cancelled = current.cancelled;
        let max_retries = current.max_retries;

        let mut active_job: job::ActiveModel = current.into();
        active_job.retry_count = Set(retry_count);
        active_job.last_error = Set(Some(message));
        active_job.updated_at = Set(now);

        if cancelled {
            active_job.status = Set(JobStatus::Cancelled);
            active_job.next_run_at = Set(None);
        } else {
            match self.retry_policy.decide(retry_count, max_retries) {
                RetryDecision::DeadLetter => {
                    active_job.status = Set(JobStatus::DeadLetter);
                    active_job.next_run_at = Set(None);
                }
                RetryDecision::RetryAfter(delay) => {
                    active_job.status = Set(JobStatus::Failed);
                    active_job.next_run_at = Set(Some(now + delay));
                }
            }
        }

        active_job.update(conn).await
    }
}

/// Status and `next_run_at` for a job that just succeeded at `now`.
pub fn advance_schedule(
    job: &job::Model,
    now: DateTime<Utc>,
) -> Result<(JobStatus, Option<DateTime<Utc>>), SchedulerError> {
    match job.schedule_kind {
        ScheduleKind::Recurring => {
            let next_run_at = compute_next_run(&job.schedule(), now)?;
            Ok((JobStatus::Scheduled, Some(next_run_at)))
        }
        ScheduleKind::Immediate | ScheduleKind::Delayed => Ok((JobStatus::Completed, None)),
    }
}

async fn find_job<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<job::Model, DbErr> {
    JobEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("job {id}")))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::tests::setup_test::setup_test;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    /// `next_run_at` is null exactly when the job will never run again.
    fn assert_schedule_consistent(job: &job::Model) {
        assert_eq!(
            job.next_run_at.is_none(),
            job.status.is_terminal(),
            "job in status {} has next_run_at {:?}",
            job.status,
            job.next_run_at
        );
    }

    fn immediate(name: &str) -> JobRequest {
        JobRequest::new(name, "welcome", ScheduleKind::Immediate)
            .recipients(["a@example.com", "b@example.com"])
    }

    #[tokio::test]
    async fn test_create_job_computes_next_run() {
        let test = setup_test().await;

        let job = test.store.create_job(&immediate("now"), noon()).await.unwrap();
        assert_eq!(job.status, JobStatus::Scheduled);
        assert_eq!(job.next_run_at, Some(noon()));
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.recipient_source, RecipientSource::StaticList);
        assert_eq!(
            job.recipients().unwrap(),
            Recipients::StaticList(vec!["a@example.com".into(), "b@example.com".into()])
        );

        let recurring = test
            .store
            .create_job(
                &JobRequest::new("every five", "welcome", ScheduleKind::Recurring)
                    .cron("*/5 * * * *")
                    .filter([("department", "sales")]),
                noon(),
            )
            .await
            .unwrap();
        assert_eq!(recurring.next_run_at, Some(noon() + TimeDelta::minutes(5)));
        assert_eq!(recurring.recipient_source, RecipientSource::Filter);
    }

    #[tokio::test]
    async fn test_create_job_rejects_invalid_requests() {
        let test = setup_test().await;

        let both = immediate("both").filter([("plan", "pro")]);
        let delayed = JobRequest::new("later", "welcome", ScheduleKind::Delayed)
            .recipients(["a@example.com"]);
        let bad_cron = JobRequest::new("bad", "welcome", ScheduleKind::Recurring)
            .cron("not a cron")
            .recipients(["a@example.com"]);

        assert!(matches!(
            test.store.create_job(&both, noon()).await,
            Err(SchedulerError::InvalidRequest(_))
        ));
        assert!(matches!(
            test.store.create_job(&delayed, noon()).await,
            Err(SchedulerError::InvalidRequest(_))
        ));
        assert!(matches!(
            test.store.create_job(&bad_cron, noon()).await,
            Err(SchedulerError::InvalidSchedule(_))
        ));
        assert!(test.store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_due_jobs_filters_and_orders() {
        let test = setup_test().await;
        let store = &test.store;

        let later = store
            .create_job(
                &immediate("later").max_retries(1),
                noon() - TimeDelta::minutes(1),
            )
            .await
            .unwrap();
        let oldest = store
            .create_job(&immediate("oldest"), noon() - TimeDelta::hours(1))
            .await
            .unwrap();
        let future = store
            .create_job(
                &JobRequest::new("future", "welcome", ScheduleKind::Delayed)
                    .run_at(noon() + TimeDelta::hours(1))
                    .recipients(["a@example.com"]),
                noon(),
            )
            .await
            .unwrap();
        let cancelled = store
            .create_job(&immediate("cancelled"), noon() - TimeDelta::hours(2))
            .await
            .unwrap();
        store.cancel_job(cancelled.id, noon()).await.unwrap();

        let due: Vec<Uuid> = store
            .list_due_jobs(noon())
            .await
            .unwrap()
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(due, vec![oldest.id, later.id]);

        let due_later = store
            .list_due_jobs(noon() + TimeDelta::hours(2))
            .await
            .unwrap();
        assert_eq!(due_later.len(), 3);
        assert_eq!(due_later[2].id, future.id);
        assert!(due_later
            .iter()
            .all(|job| job.is_due(noon() + TimeDelta::hours(2))));
        assert!(!future.is_due(noon()));
        assert!(!store.get_job(cancelled.id).await.unwrap().is_due(noon()));

        for job in store.list_jobs().await.unwrap() {
            assert_schedule_consistent(&job);
        }
    }

    #[tokio::test]
    async fn test_cancel_job_clears_schedule() {
        let test = setup_test().await;
        let job = test.store.create_job(&immediate("c"), noon()).await.unwrap();

        let cancelled = test.store.cancel_job(job.id, noon()).await.unwrap();

        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert!(cancelled.cancelled);
        assert_eq!(cancelled.next_run_at, None);
        assert_schedule_consistent(&cancelled);
        assert!(test.store.claim_job(job.id, noon()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_is_single_shot() {
        let test = setup_test().await;
        let job = test.store.create_job(&immediate("claim"), noon()).await.unwrap();

        let claim = test.store.claim_job(job.id, noon()).await.unwrap().unwrap();
        assert_eq!(claim.job.status, JobStatus::Running);
        assert_eq!(claim.execution.status, ExecutionStatus::Running);
        assert_eq!(claim.execution.attempt, 1);
        assert_eq!(claim.execution.started_at, Some(noon()));

        assert!(test.store.claim_job(job.id, noon()).await.unwrap().is_none());
        assert!(test.store.list_due_jobs(noon()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_back_off_then_dead_letter() {
        let test = setup_test().await;
        let store = &test.store;
        let job = store.create_job(&immediate("flaky"), noon()).await.unwrap();
        let error = DispatchError::Delivery("smtp unavailable".to_string());

        let mut now = noon();
        for (attempt, delay) in [(1, 30), (2, 60), (3, 120)] {
            let claim = store.claim_job(job.id, now).await.unwrap().unwrap();
            assert_eq!(claim.execution.attempt, attempt);

            let failed = store.fail_execution(&claim, &error, now).await.unwrap();
            assert_eq!(failed.status, JobStatus::Failed);
            assert_eq!(failed.retry_count, attempt);
            assert_eq!(failed.next_run_at, Some(now + TimeDelta::seconds(delay)));
            assert_eq!(failed.last_error.as_deref(), Some(error.to_string().as_str()));
            assert_schedule_consistent(&failed);

            now += TimeDelta::hours(1);
        }

        let claim = store.claim_job(job.id, now).await.unwrap().unwrap();
        let dead = store.fail_execution(&claim, &error, now).await.unwrap();
        assert_eq!(dead.status, JobStatus::DeadLetter);
        assert_eq!(dead.next_run_at, None);
        assert_schedule_consistent(&dead);
        assert!(store
            .list_due_jobs(now + TimeDelta::days(365))
            .await
            .unwrap()
            .is_empty());

        let executions = store.recent_executions(job.id, 10).await.unwrap();
        let attempts: Vec<i32> = executions.iter().map(|e| e.attempt).collect();
        assert_eq!(attempts, vec![4, 3, 2, 1]);
        assert!(executions
            .iter()
            .all(|e| e.status == ExecutionStatus::Failed && e.error.is_some()));
        assert_eq!(store.recent_executions(job.id, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_success_resets_retries_and_advances() {
        let test = setup_test().await;
        let store = &test.store;
        let job = store
            .create_job(
                &JobRequest::new("digest", "welcome", ScheduleKind::Recurring)
                    .cron("0 * * * *")
                    .recipients(["a@example.com"]),
                noon(),
            )
            .await
            .unwrap();
        let run_time = noon() + TimeDelta::hours(1);

        let claim = store.claim_job(job.id, run_time).await.unwrap().unwrap();
        store
            .fail_execution(&claim, &DispatchError::Render("boom".into()), run_time)
            .await
            .unwrap();

        let retry_time = run_time + TimeDelta::minutes(1);
        let claim = store.claim_job(job.id, retry_time).await.unwrap().unwrap();
        assert_eq!(claim.execution.attempt, 2);
        assert_eq!(claim.job.last_error, None);

        let report = DispatchReport {
            recipients: vec!["a@example.com".to_string()],
            emails_sent: 1,
        };
        let done = store
            .complete_execution(&claim, &report, retry_time)
            .await
            .unwrap();

        assert_eq!(done.status, JobStatus::Scheduled);
        assert_eq!(done.retry_count, 0);
        assert_eq!(done.next_run_at, Some(noon() + TimeDelta::hours(2)));
        assert!(done.next_run_at.unwrap() > retry_time);
        assert_schedule_consistent(&done);

        let latest = &store.recent_executions(job.id, 1).await.unwrap()[0];
        assert_eq!(latest.status, ExecutionStatus::Succeeded);
        assert_eq!(latest.emails_sent, 1);
        assert_eq!(latest.finished_at, Some(retry_time));
        assert_eq!(
            latest.details,
            Some(json!({ "recipients": ["a@example.com"] }))
        );
    }

    #[tokio::test]
    async fn test_cancel_while_running_is_preserved() {
        let test = setup_test().await;
        let store = &test.store;
        let job = store.create_job(&immediate("racy"), noon()).await.unwrap();

        let claim = store.claim_job(job.id, noon()).await.unwrap().unwrap();
        store.cancel_job(job.id, noon()).await.unwrap();
        let report = DispatchReport {
            recipients: vec![],
            emails_sent: 0,
        };
        let finished = store.complete_execution(&claim, &report, noon()).await.unwrap();

        assert_eq!(finished.status, JobStatus::Cancelled);
        assert_eq!(finished.next_run_at, None);
        assert_schedule_consistent(&finished);
    }

    #[tokio::test]
    async fn test_recover_stale_jobs() {
        let test = setup_test().await;
        let store = &test.store;
        let stale = store.create_job(&immediate("stale"), noon()).await.unwrap();
        let fresh = store.create_job(&immediate("fresh"), noon()).await.unwrap();

        store.claim_job(stale.id, noon()).await.unwrap().unwrap();
        store
            .claim_job(fresh.id, noon() + TimeDelta::minutes(50))
            .await
            .unwrap()
            .unwrap();

        let now = noon() + TimeDelta::hours(1);
        let recovered = store
            .recover_stale_jobs(now - TimeDelta::minutes(30), now)
            .await
            .unwrap();

        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].id, stale.id);
        assert_eq!(recovered[0].status, JobStatus::Failed);
        assert_eq!(recovered[0].retry_count, 1);
        assert_eq!(recovered[0].next_run_at, Some(now + TimeDelta::seconds(30)));

        let execution = &store.recent_executions(stale.id, 1).await.unwrap()[0];
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(
            execution.error.as_deref(),
            Some(DispatchError::Stale(3600).to_string().as_str())
        );
        assert_eq!(store.get_job(fresh.id).await.unwrap().status, JobStatus::Running);
    }

    #[test]
    fn test_advance_schedule_for_one_off_jobs() {
        let now = noon();
        let job = job::Model {
            id: Uuid::new_v4(),
            name: "once".to_string(),
            template_name: "welcome".to_string(),
            schedule_kind: ScheduleKind::Delayed,
            run_at: Some(now),
            cron_expression: None,
            recipient_source: RecipientSource::StaticList,
            recipients: Some(json!(["a@example.com"])),
            recipient_filter: None,
            next_run_at: Some(now),
            status: JobStatus::Running,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
            cancelled: false,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(
            advance_schedule(&job, now).unwrap(),
            (JobStatus::Completed, None)
        );
    }
}
