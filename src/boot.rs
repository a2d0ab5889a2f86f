use std::{env, process, str::FromStr as _};

use clap::Parser as _;
use config_rs::{Config as ConfigRs, ConfigError};
use tracing::{debug, error, trace};

use crate::{
    cli::{Cli, Commands},
    commands::{job, migrate, version, worker},
    config::Config,
    environment::Environment,
    setup_tracing::setup_tracing_for_command,
};

const ENVIRONMENT_VARIABLE: &str = "HERALD_ENVIRONMENT";
const ENVIRONMENT_PREFIX: &str = "HERALD";

pub async fn boot() {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        version::print_version_info();
        return;
    }

    let environment = set_environment();

    let app_config = match read_config(&environment) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    // Set up tracing with appropriate level based on command
    setup_tracing_for_command(&cli.command, &app_config.tracing.log_level);

    debug!("Environment set to: {:?}", environment);
    trace!("Configuration loaded: {:?}", app_config);

    if let Err(e) = handle_command(environment, app_config, cli).await {
        error!("{}", e);
        eprintln!("❌ {e}");
        process::exit(1);
    }
}

#[must_use]
pub fn set_environment() -> Environment {
    env::var(ENVIRONMENT_VARIABLE)
        .ok()
        .and_then(|s| Environment::from_str(&s).ok())
        .unwrap_or_default()
}

/// Layer `config/<environment>` (optional, any format config-rs knows) and
/// `HERALD_*` variables over the built-in defaults.
///
/// Nested keys use a double underscore: `HERALD_DATABASE__URL`.
pub fn read_config(environment: &Environment) -> Result<Config, ConfigError> {
    let config_file_name = environment.config_file_name();

    trace!("Reading configuration from: {}", config_file_name);

    ConfigRs::builder()
        .add_source(config_rs::File::with_name(&config_file_name).required(false))
        .add_source(
            config_rs::Environment::with_prefix(ENVIRONMENT_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

pub async fn handle_command(
    environment: Environment,
    config: Config,
    cli: Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Worker {
            poll_interval,
            run_once,
        } => worker::handle_worker_command(environment, config, poll_interval, run_once).await?,
        Commands::Job { action } => job::handle_job_command(environment, config, action).await?,
        Commands::Migrate { action } => migrate::handle_migrate_command(&config, action).await?,
        Commands::Version => version::print_version_info(),
    }

    Ok(())
}
