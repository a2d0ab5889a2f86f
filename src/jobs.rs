pub mod job_store;
pub mod retry_policy;
pub mod schedule;
pub mod scheduling_service;
pub mod worker;

use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced synchronously to callers of the scheduling API.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("unsupported schedule: {0}")]
    UnsupportedSchedule(String),
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl From<validator::ValidationErrors> for SchedulerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidRequest(errors.to_string())
    }
}

/// Reasons a single execution attempt failed.
///
/// The worker does not distinguish between them: every variant is recorded on
/// the execution and fed into the retry policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("recipient resolution failed: {0}")]
    RecipientResolution(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("job was still running after {0}s and has been recovered")]
    Stale(i64),
}
