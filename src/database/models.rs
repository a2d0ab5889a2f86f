pub mod execution_status;
pub mod job;
pub mod job_execution;
pub mod job_status;
pub mod recipient_source;
pub mod schedule_kind;
