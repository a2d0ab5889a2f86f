use std::time::Duration;

use tracing::info;

use crate::{app::App, config::Config, environment::Environment};

pub async fn handle_worker_command(
    environment: Environment,
    config: Config,
    poll_interval: Option<u64>,
    run_once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let poll_interval =
        Duration::from_secs(poll_interval.unwrap_or(config.worker.poll_interval_seconds));

    let app = App::new(environment, config).await?;
    info!("✅ Database is ready!");

    let worker = app.worker()?;
    worker.start(poll_interval, run_once).await?;

    Ok(())
}
