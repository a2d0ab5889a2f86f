//! `SeaORM` Entity for the execution history ledger

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::database::models::execution_status::ExecutionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "job_execution")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ExecutionStatus,
    pub attempt: i32,
    pub started_at: Option<DateTimeUtc>,
    pub finished_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text")]
    pub error: Option<String>,
    pub emails_sent: i32,
    #[sea_orm(column_type = "Json")]
    pub details: Option<Json>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id",
        on_delete = "Cascade"
    )]
    Job,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Wall-clock duration of the attempt, once finished.
    pub fn execution_duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started_at), Some(finished_at)) => {
                Some(finished_at.signed_duration_since(started_at))
            }
            _ => None,
        }
    }

    pub const fn was_successful(&self) -> bool {
        matches!(self.status, ExecutionStatus::Succeeded)
    }
}
