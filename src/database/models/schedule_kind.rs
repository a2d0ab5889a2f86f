use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a job's `next_run_at` is derived.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScheduleKind {
    /// Due as soon as it is created; runs once.
    #[sea_orm(string_value = "immediate")]
    Immediate,
    /// Due at a fixed `run_at`; runs once.
    #[sea_orm(string_value = "delayed")]
    Delayed,
    /// Due at every fire time of a cron expression.
    #[sea_orm(string_value = "recurring")]
    Recurring,
}
