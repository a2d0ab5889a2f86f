use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a scheduled job.
///
/// # State Transitions
///
/// - `Scheduled` → `Running` → `Scheduled` (recurring job succeeded)
/// - `Scheduled` → `Running` → `Completed` (one-off job succeeded)
/// - `Scheduled` → `Running` → `Failed` (attempt failed, retry pending)
/// - `Failed` → `Running` → ... (retry attempt)
/// - `Running` → `DeadLetter` (retries exhausted)
/// - any non-terminal state → `Cancelled`
///
/// `next_run_at` is null exactly when the status is `Completed`, `Cancelled`
/// or `DeadLetter`.
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
#[strum(serialize_all = "snake_case")]
#[derive(Default)]
pub enum JobStatus {
    /// Waiting for `next_run_at` to pass. The default for new jobs.
    #[sea_orm(string_value = "scheduled")]
    #[default]
    Scheduled,

    /// Claimed by the worker. A crash while in this state leaves the job here
    /// until stale recovery is enabled or an operator intervenes.
    #[sea_orm(string_value = "running")]
    Running,

    /// One-off job finished successfully. Terminal.
    #[sea_orm(string_value = "completed")]
    Completed,

    /// Last attempt failed; the job is due again at `next_run_at`.
    #[sea_orm(string_value = "failed")]
    Failed,

    /// Cancelled by an operator. Terminal.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,

    /// Retries exhausted. Terminal, surfaced through job listings.
    #[sea_orm(string_value = "dead_letter")]
    DeadLetter,
}

impl JobStatus {
    /// Statuses the worker will pick up once `next_run_at` has passed.
    pub const DISPATCHABLE: [Self; 2] = [Self::Scheduled, Self::Failed];

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::DeadLetter)
    }

    pub const fn is_dispatchable(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Failed)
    }
}
