use time::format_description::parse;
use tracing_subscriber::{filter::Directive, fmt::time::OffsetTime, EnvFilter};

use crate::cli::Commands;

const QUIET_TARGETS: [&str; 2] = ["sqlx=warn", "sea_orm_migration=warn"];

/// Default filter level for a command; `RUST_LOG` overrides it.
pub fn default_level_for_command<'a>(command: &Commands, worker_log_level: &'a str) -> &'a str {
    match command {
        // The worker needs operational visibility
        Commands::Worker { .. } => worker_log_level,
        // One-shot commands print their own output
        Commands::Job { .. } | Commands::Migrate { .. } => "warn",
        Commands::Version => "error",
    }
}

pub fn setup_tracing_for_command(command: &Commands, worker_log_level: &str) {
    let default_level = default_level_for_command(command, worker_log_level);

    let env_filter = QUIET_TARGETS
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
            EnvFilter::add_directive,
        );

    let timer_format = parse("[hour]:[minute]:[second].[subsecond digits:2]").unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .with_timer(OffsetTime::new(
            time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
            timer_format,
        ))
        .compact()
        .init();
}
