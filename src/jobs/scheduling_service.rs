use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    database::models::{job, job_execution, schedule_kind::ScheduleKind},
    jobs::{job_store::JobStore, schedule::ScheduleSpec, SchedulerError},
    recipients::Recipients,
};

pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Everything needed to create a job.
///
/// Exactly one of `recipients` / `recipient_filter` must be non-empty, and the
/// schedule-specific field (`run_at` for delayed, `cron_expression` for
/// recurring) must be present.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_job_request", skip_on_field_errors = false))]
pub struct JobRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub template_name: String,
    pub schedule_kind: ScheduleKind,
    pub run_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 128))]
    pub cron_expression: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub recipient_filter: Option<BTreeMap<String, String>>,
    #[validate(range(min = 0))]
    pub max_retries: i32,
}

impl JobRequest {
    pub fn new(
        name: impl Into<String>,
        template_name: impl Into<String>,
        schedule_kind: ScheduleKind,
    ) -> Self {
        Self {
            name: name.into(),
            template_name: template_name.into(),
            schedule_kind,
            run_at: None,
            cron_expression: None,
            recipients: None,
            recipient_filter: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn run_at(mut self, run_at: DateTime<Utc>) -> Self {
        self.run_at = Some(run_at);
        self
    }

    #[must_use]
    pub fn cron(mut self, expression: impl Into<String>) -> Self {
        self.cron_expression = Some(expression.into());
        self
    }

    #[must_use]
    pub fn recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients = Some(recipients.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn filter<I, K, V>(mut self, filter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.recipient_filter = Some(
            filter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub const fn max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn schedule(&self) -> ScheduleSpec<'_> {
        ScheduleSpec {
            kind: self.schedule_kind,
            run_at: self.run_at,
            cron_expression: self.cron_expression.as_deref(),
        }
    }

    /// The recipient payload, with empty lists and filters treated as absent.
    pub fn recipient_payload(&self) -> Result<Recipients, SchedulerError> {
        let list = self.recipients.as_ref().filter(|list| !list.is_empty());
        let filter = self
            .recipient_filter
            .as_ref()
            .filter(|filter| !filter.is_empty());

        match (list, filter) {
            (Some(list), None) => Ok(Recipients::StaticList(list.clone())),
            (None, Some(filter)) => Ok(Recipients::Filter(filter.clone())),
            (Some(_), Some(_)) => Err(SchedulerError::InvalidRequest(
                "provide either recipients or a recipient filter, not both".to_string(),
            )),
            (None, None) => Err(SchedulerError::InvalidRequest(
                "provide recipients or a recipient filter".to_string(),
            )),
        }
    }

    /// Check field constraints, recipient exclusivity and schedule fields.
    pub fn validate_request(&self) -> Result<(), SchedulerError> {
        self.recipient_payload()?;
        self.validate()?;
        Ok(())
    }
}

fn validate_job_request(request: &JobRequest) -> Result<(), ValidationError> {
    match request.schedule_kind {
        ScheduleKind::Delayed if request.run_at.is_none() => Err(ValidationError::new(
            "run_at_required",
        )
        .with_message("delayed jobs require run_at".into())),
        ScheduleKind::Recurring if request.cron_expression.is_none() => Err(
            ValidationError::new("cron_required")
                .with_message("recurring jobs require a cron expression".into()),
        ),
        _ => Ok(()),
    }
}

/// Public entry point for creating, inspecting and cancelling jobs.
#[derive(Debug, Clone)]
pub struct SchedulingService {
    store: JobStore,
}

impl SchedulingService {
    pub const fn from_store(store: JobStore) -> Self {
        Self { store }
    }

    pub async fn create_job(&self, request: JobRequest) -> Result<job::Model, SchedulerError> {
        let job = self.store.create_job(&request, Utc::now()).await?;

        info!(
            job_id = %job.id,
            schedule = %job.schedule_kind,
            "🗓️ Created job '{}' next run at {:?}",
            job.name,
            job.next_run_at
        );

        Ok(job)
    }

    /// All jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<job::Model>, SchedulerError> {
        Ok(self.store.list_jobs().await?)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<job::Model, SchedulerError> {
        self.store.get_job(id).await
    }

    pub async fn cancel_job(&self, id: Uuid) -> Result<job::Model, SchedulerError> {
        let job = self.store.cancel_job(id, Utc::now()).await?;
        info!(job_id = %job.id, "🛑 Cancelled job '{}'", job.name);
        Ok(job)
    }

    /// Most recent executions of a job, newest first.
    pub async fn recent_executions(
        &self,
        job_id: Uuid,
        limit: u64,
    ) -> Result<Vec<job_execution::Model>, SchedulerError> {
        Ok(self.store.recent_executions(job_id, limit).await?)
    }
}
