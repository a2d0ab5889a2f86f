//! `SeaORM` Entity for scheduled jobs

use std::collections::BTreeMap;

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{
    database::models::{
        job_status::JobStatus, recipient_source::RecipientSource, schedule_kind::ScheduleKind,
    },
    jobs::schedule::ScheduleSpec,
    recipients::Recipients,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub template_name: String,
    pub schedule_kind: ScheduleKind,
    pub run_at: Option<DateTimeUtc>,
    pub cron_expression: Option<String>,
    pub recipient_source: RecipientSource,
    #[sea_orm(column_type = "Json")]
    pub recipients: Option<Json>,
    #[sea_orm(column_type = "Json")]
    pub recipient_filter: Option<Json>,
    pub next_run_at: Option<DateTimeUtc>,
    pub status: JobStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    #[sea_orm(column_type = "Text")]
    pub last_error: Option<String>,
    pub cancelled: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::job_execution::Entity")]
    JobExecution,
}

impl Related<super::job_execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobExecution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Schedule definition used to compute `next_run_at`.
    pub fn schedule(&self) -> ScheduleSpec<'_> {
        ScheduleSpec {
            kind: self.schedule_kind,
            run_at: self.run_at,
            cron_expression: self.cron_expression.as_deref(),
        }
    }

    /// Decode the stored recipient payload for this job's recipient source.
    pub fn recipients(&self) -> Result<Recipients, serde_json::Error> {
        match self.recipient_source {
            RecipientSource::StaticList => {
                let list = match &self.recipients {
                    Some(value) => serde_json::from_value::<Vec<String>>(value.clone())?,
                    None => Vec::new(),
                };
                Ok(Recipients::StaticList(list))
            }
            RecipientSource::Filter => {
                let filter = match &self.recipient_filter {
                    Some(value) => serde_json::from_value::<BTreeMap<String, String>>(value.clone())?,
                    None => BTreeMap::new(),
                };
                Ok(Recipients::Filter(filter))
            }
        }
    }

    /// Attempt number of the next execution (1-based).
    pub const fn next_attempt(&self) -> i32 {
        self.retry_count + 1
    }

    /// Check if the job is eligible for dispatch at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTimeUtc) -> bool {
        !self.cancelled
            && self.status.is_dispatchable()
            && self.next_run_at.is_some_and(|next_run_at| next_run_at <= now)
    }
}
