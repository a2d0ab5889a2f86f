use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::jobs::scheduling_service::DEFAULT_MAX_RETRIES;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dispatch loop
    Worker {
        /// Seconds between polls (default: from configuration)
        #[arg(long)]
        poll_interval: Option<u64>,
        /// Process due jobs once and exit
        #[arg(long)]
        run_once: bool,
    },
    /// Create, inspect and cancel jobs
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum JobAction {
    /// Schedule a new job
    Create(CreateJobArgs),
    /// List all jobs, newest first
    List,
    /// Cancel a job so it is never dispatched again
    Cancel {
        id: Uuid,
    },
    /// Show the most recent executions of a job
    Executions {
        id: Uuid,
        #[arg(short, long, default_value = "10")]
        limit: u64,
    },
}

#[derive(Args)]
pub struct CreateJobArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Template identifier
    #[arg(long)]
    pub template: String,
    /// immediate, delayed or recurring
    #[arg(long, default_value = "immediate")]
    pub schedule: String,
    /// Run time for delayed jobs (RFC 3339)
    #[arg(long)]
    pub run_at: Option<DateTime<Utc>>,
    /// Cron expression for recurring jobs
    #[arg(long)]
    pub cron: Option<String>,
    /// Comma separated list of recipients
    #[arg(long, value_delimiter = ',')]
    pub recipients: Vec<String>,
    /// File with one recipient per line
    #[arg(long, conflicts_with = "recipients")]
    pub recipients_file: Option<PathBuf>,
    /// Recipient filter as key=value, may be repeated
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: i32,
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Run migrations up
    Up {
        /// Number of migrations to run (default: all)
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Run migrations down
    Down {
        /// Number of migrations to rollback (default: 1)
        #[arg(short, long, default_value = "1")]
        steps: u32,
    },
    /// Show migration status
    Status,
}
