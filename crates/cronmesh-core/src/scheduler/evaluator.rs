//! Cron schedule evaluation
//!
//! Evaluates standard five-field cron expressions
//! (`minute hour day-of-month month day-of-week`) at minute granularity.
//!
//! The `cron` crate expects a leading seconds field and numbers weekdays
//! `1-7` from Sunday, so expressions are normalised before parsing:
//! seconds are pinned to `0`, `?` is read as `*`, and numeric weekdays
//! `0-7` are shifted.
//! When both day-of-month and day-of-week are restricted, a day matches if
//! either field matches (classic cron semantics).

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::str::FromStr;

use super::types::{Result, SchedulerError};

/// Computes the next fire instant of a cron expression
pub trait ScheduleEvaluator: Send + Sync {
    /// Next matching instant strictly after `reference`
    fn next_after(&self, expression: &str, reference: DateTime<Utc>) -> Result<DateTime<Utc>>;

    /// Check that `expression` parses and fires at least once more
    fn validate(&self, expression: &str) -> Result<()> {
        self.next_after(expression, Utc::now()).map(|_| ())
    }
}

/// Standard five-field cron evaluator (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct CronEvaluator;

impl CronEvaluator {
    /// Create a new evaluator
    pub fn new() -> Self {
        Self
    }

    /// Parse `expression` into one or two `cron` schedules.
    ///
    /// Two schedules are returned when both day fields are restricted; the
    /// effective next instant is the earlier of the two.
    fn parse(expression: &str) -> Result<Vec<cron::Schedule>> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SchedulerError::invalid_expression(
                expression,
                format!("expected 5 fields, found {}", fields.len()),
            ));
        }

        let (minute, hour, month) = (fields[0], fields[1], fields[3]);
        let dom = open_day_of_month(fields[2]);
        let dow = normalize_weekdays(fields[4])
            .map_err(|reason| SchedulerError::invalid_expression(expression, reason))?;

        let build = |dom: &str, dow: &str| {
            cron::Schedule::from_str(&format!("0 {minute} {hour} {dom} {month} {dow}"))
                .map_err(|e| SchedulerError::invalid_expression(expression, e))
        };

        if is_restricted(fields[2]) && is_restricted(fields[4]) {
            Ok(vec![build(&dom, "*")?, build("*", &dow)?])
        } else {
            Ok(vec![build(&dom, &dow)?])
        }
    }
}

impl ScheduleEvaluator for CronEvaluator {
    fn next_after(&self, expression: &str, reference: DateTime<Utc>) -> Result<DateTime<Utc>> {
        Self::parse(expression)?
            .iter()
            .filter_map(|schedule| schedule.after(&reference).next())
            .min()
            .ok_or_else(|| SchedulerError::invalid_expression(expression, "schedule never fires"))
    }
}

/// A day field left open: `*`, `?` or an unstepped star
fn is_restricted(field: &str) -> bool {
    !matches!(field, "*" | "?" | "*/1" | "?/1")
}

/// `?` is accepted as a synonym for `*`
fn open_day_of_month(field: &str) -> String {
    match field.strip_prefix('?') {
        Some(rest) => format!("*{rest}"),
        None => field.to_string(),
    }
}

/// Translate standard weekdays (0 or 7 = Sunday) into the `cron` crate's
/// 1-based numbering.
///
/// Numeric items are expanded to an explicit day list so ranges ending or
/// starting on 7 and stepped ranges keep their Sunday. Names (`MON`,
/// `fri`) pass through.
fn normalize_weekdays(field: &str) -> std::result::Result<String, String> {
    if matches!(field, "*" | "?") {
        return Ok("*".to_string());
    }

    let mut days = BTreeSet::new();
    let mut named = Vec::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => match step.parse::<u8>() {
                Ok(step) if step > 0 => (base, Some(step)),
                _ => return Err(format!("invalid day-of-week step '{step}'")),
            },
            None => (item, None),
        };

        if base.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(item.to_string());
            continue;
        }

        let (start, end) = match base {
            "*" | "?" => (0, 6),
            _ => match base.split_once('-') {
                Some((start, end)) => (parse_weekday(start)?, parse_weekday(end)?),
                // `N/step` runs from N to the end of the week
                None if step.is_some() => (parse_weekday(base)?, 6),
                None => {
                    let day = parse_weekday(base)?;
                    (day, day)
                }
            },
        };
        if start > end {
            return Err(format!("day-of-week range '{base}' runs backwards"));
        }

        let step = usize::from(step.unwrap_or(1));
        days.extend((start..=end).step_by(step).map(|day| day % 7));
    }

    Ok(days
        .into_iter()
        .map(|day| (day + 1).to_string())
        .chain(named)
        .collect::<Vec<_>>()
        .join(","))
}

fn parse_weekday(token: &str) -> std::result::Result<u8, String> {
    match token.parse::<u8>() {
        Ok(day @ 0..=7) => Ok(day),
        Ok(day) => Err(format!("day-of-week {day} out of range 0-7")),
        Err(_) => Err(format!("invalid day-of-week '{token}'")),
    }
}
