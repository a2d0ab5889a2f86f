//! Next-run computation for immediate, delayed and recurring jobs.
//!
//! All inputs and outputs are UTC. Cron expressions are delegated to the
//! `cron` crate; the classic five-field crontab form is accepted and
//! normalised to the seconds-first form that crate expects.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{database::models::schedule_kind::ScheduleKind, jobs::SchedulerError};

/// The parts of a job that determine when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec<'a> {
    pub kind: ScheduleKind,
    pub run_at: Option<DateTime<Utc>>,
    pub cron_expression: Option<&'a str>,
}

/// Compute the next time a job with `schedule` should run, relative to `reference`.
///
/// - immediate: `reference` itself
/// - delayed: the fixed `run_at`
/// - recurring: the first cron fire time strictly after `reference`
pub fn compute_next_run(
    schedule: &ScheduleSpec<'_>,
    reference: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    match schedule.kind {
        ScheduleKind::Immediate => Ok(reference),
        ScheduleKind::Delayed => schedule.run_at.ok_or_else(|| {
            SchedulerError::InvalidSchedule("delayed jobs must define run_at".to_string())
        }),
        ScheduleKind::Recurring => {
            let expression = schedule
                .cron_expression
                .filter(|expression| !expression.trim().is_empty())
                .ok_or_else(|| {
                    SchedulerError::InvalidSchedule(
                        "recurring jobs require a cron expression".to_string(),
                    )
                })?;
            next_fire_time(expression, reference)
        }
    }
}

/// First fire time of `expression` strictly after `after`.
pub fn next_fire_time(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    parse_cron(expression)?
        .after(&after)
        .next()
        .ok_or_else(|| {
            SchedulerError::InvalidSchedule(format!(
                "cron expression '{expression}' has no upcoming fire time"
            ))
        })
}

pub fn parse_cron(expression: &str) -> Result<cron::Schedule, SchedulerError> {
    let normalized = normalize_cron_expression(expression)?;

    cron::Schedule::from_str(&normalized).map_err(|e| {
        SchedulerError::InvalidSchedule(format!("invalid cron expression '{expression}': {e}"))
    })
}

/// Parse a schedule kind given as text (e.g. from the command line).
pub fn parse_schedule_kind(value: &str) -> Result<ScheduleKind, SchedulerError> {
    ScheduleKind::from_str(value.trim())
        .map_err(|_| SchedulerError::UnsupportedSchedule(value.to_string()))
}

fn normalize_cron_expression(expression: &str) -> Result<String, SchedulerError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();

    match fields.as_slice() {
        [minute, hour, day_of_month, month, day_of_week] => {
            let day_of_week = translate_day_of_week(day_of_week)?;
            Ok(format!(
                "0 {minute} {hour} {day_of_month} {month} {day_of_week}"
            ))
        }
        // Already in the seconds-first (optionally with year) form
        [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => Ok(fields.join(" ")),
        _ => Err(SchedulerError::InvalidSchedule(format!(
            "cron expression '{expression}' must have 5 fields, found {}",
            fields.len()
        ))),
    }
}

/// Crontab numbers Sunday as 0 (or 7); the cron crate numbers it 1 and
/// Saturday 7. Names pass through untouched.
fn translate_day_of_week(field: &str) -> Result<String, SchedulerError> {
    let mut parts = Vec::new();

    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };

        let translated = match range.split_once('-') {
            // A range running up to Sunday wraps around to day 1
            Some((start, "7")) if step.is_none() => format!("{}-7,1", shift_day(start)?),
            Some((start, end)) => format!("{}-{}", shift_day(start)?, shift_day(end)?),
            None => shift_day(range)?,
        };

        parts.push(match step {
            Some(step) => format!("{translated}/{step}"),
            None => translated,
        });
    }

    Ok(parts.join(","))
}

fn shift_day(token: &str) -> Result<String, SchedulerError> {
    match token.parse::<u8>() {
        Ok(day @ 0..=6) => Ok((day + 1).to_string()),
        Ok(7) => Ok("1".to_string()),
        Ok(day) => Err(SchedulerError::InvalidSchedule(format!(
            "day of week {day} is out of range 0-7"
        ))),
        Err(_) => Ok(token.to_string()),
    }
}
