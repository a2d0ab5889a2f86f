use std::error::Error;

use crate::{
    app::App,
    cli::{CreateJobArgs, JobAction},
    config::Config,
    database::models::{job, job_execution},
    environment::Environment,
    jobs::{
        schedule::parse_schedule_kind, scheduling_service::JobRequest, SchedulerError,
    },
};

pub async fn handle_job_command(
    environment: Environment,
    config: Config,
    action: JobAction,
) -> Result<(), Box<dyn Error>> {
    let app = App::new(environment, config).await?;
    let service = app.scheduling_service();

    match action {
        JobAction::Create(args) => {
            let request = build_request(args).await?;
            let job = service.create_job(request).await?;
            println!("✅ Created job {}", job.id);
            print_job(&job);
        }
        JobAction::List => {
            let jobs = service.list_jobs().await?;
            if jobs.is_empty() {
                println!("No jobs scheduled");
            }
            for job in &jobs {
                print_job(job);
            }
        }
        JobAction::Cancel { id } => {
            let job = service.cancel_job(id).await?;
            println!("🛑 Cancelled job {} ({})", job.id, job.name);
        }
        JobAction::Executions { id, limit } => {
            let job = service.get_job(id).await?;
            let executions = service.recent_executions(id, limit).await?;

            println!("📋 Executions of '{}' (newest first):", job.name);
            if executions.is_empty() {
                println!("  none yet");
            }
            for execution in &executions {
                print_execution(execution);
            }
        }
    }

    Ok(())
}

/// Turn command-line arguments into a job request.
pub async fn build_request(args: CreateJobArgs) -> Result<JobRequest, SchedulerError> {
    let schedule_kind = parse_schedule_kind(&args.schedule)?;
    let mut request = JobRequest::new(args.name, args.template, schedule_kind)
        .max_retries(args.max_retries);

    if let Some(run_at) = args.run_at {
        request = request.run_at(run_at);
    }
    if let Some(cron) = args.cron {
        request = request.cron(cron);
    }

    let recipients = match args.recipients_file {
        Some(path) => {
            let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
                SchedulerError::InvalidRequest(format!(
                    "failed to read recipients file {}: {e}",
                    path.display()
                ))
            })?;
            parse_recipient_lines(&contents)
        }
        None => args
            .recipients
            .into_iter()
            .map(|recipient| recipient.trim().to_string())
            .filter(|recipient| !recipient.is_empty())
            .collect(),
    };
    if !recipients.is_empty() {
        request = request.recipients(recipients);
    }

    if !args.filters.is_empty() {
        let filter = args
            .filters
            .iter()
            .map(|pair| parse_filter(pair))
            .collect::<Result<Vec<_>, _>>()?;
        request = request.filter(filter);
    }

    Ok(request)
}

/// One recipient per line; blank lines and `#` comments are skipped.
fn parse_recipient_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

fn parse_filter(pair: &str) -> Result<(String, String), SchedulerError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(SchedulerError::InvalidRequest(format!(
            "filter '{pair}' must look like key=value"
        ))),
    }
}

fn print_job(job: &job::Model) {
    let next_run = job
        .next_run_at
        .map_or_else(|| "-".to_string(), |next_run_at| next_run_at.to_rfc3339());

    println!(
        "  {} {:<12} {:<10} next: {:<25} retries: {}/{} {}",
        job.id,
        job.status,
        job.schedule_kind,
        next_run,
        job.retry_count,
        job.max_retries,
        job.name
    );
    if let Some(last_error) = &job.last_error {
        println!("      last error: {last_error}");
    }
}

fn print_execution(execution: &job_execution::Model) {
    let duration = execution
        .execution_duration()
        .map_or_else(|| "-".to_string(), |duration| format!("{}ms", duration.num_milliseconds()));

    println!(
        "  #{} {:<10} sent: {:<4} took: {:<8} started: {}",
        execution.attempt,
        execution.status,
        execution.emails_sent,
        duration,
        execution
            .started_at
            .map_or_else(|| "-".to_string(), |started_at| started_at.to_rfc3339()),
    );
    if let Some(error) = &execution.error {
        println!("      error: {error}");
    }
}
