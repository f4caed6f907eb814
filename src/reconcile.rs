//! Normalization of persisted rows into typed [`Task`] records.
//!
//! Rows come from a tabular store that may have been edited by hand or written
//! by older versions: columns can be missing, hold the wrong type, or be blank.
//! Reconciliation never fails. Anything it cannot read falls back to a default.

use std::num::NonZeroU32;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::lifecycle::{add_days, sub_days};
use crate::models::{RawRow, Task, DATE_FORMAT};

/// Date-only layouts accepted on load, besides full timestamps.
const DATE_LAYOUTS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];

/// Timestamp layouts whose date part is kept.
const DATETIME_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Turns raw rows into tasks, re-deriving dates with the configured prompt offset.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    prompt_offset_days: NonZeroU32,
}

impl Reconciler {
    pub fn new(prompt_offset_days: NonZeroU32) -> Self {
        Self { prompt_offset_days }
    }

    /// Reconciles every row, dropping the blank ones. Order is preserved.
    pub fn reconcile(&self, rows: &[RawRow]) -> Vec<Task> {
        rows.iter()
            .enumerate()
            .filter_map(|(index, row)| {
                if is_blank(row) {
                    trace!(row = index, "dropping blank row");
                    return None;
                }
                Some(self.reconcile_row(index, row))
            })
            .collect()
    }

    /// Dates are re-derived only from a known start and a positive duration.
    /// Otherwise the persisted expiry and prompt dates are used as parsed.
    fn reconcile_row(&self, index: usize, row: &RawRow) -> Task {
        let start_date = date_field(index, row, "start_date");
        let duration = duration_field(index, row);

        let (expiry_date, prompt_date) = match (start_date, duration) {
            (Some(start), Some(days)) if days >= 1 => {
                let expiry = add_days(start, days);
                (expiry, expiry.and_then(|e| sub_days(e, self.prompt_offset_days.get())))
            }
            _ => (
                date_field(index, row, "expiry_date"),
                date_field(index, row, "prompt_date"),
            ),
        };

        let task_name = text_field(row, "task_name").unwrap_or_default();
        if expiry_date.is_none() {
            warn!(row = index, task = %task_name, "task has no known expiry date and will never expire");
        }

        Task {
            scheduler_name: text_field(row, "scheduler_name"),
            scheduler_email: text_field(row, "scheduler_email"),
            task_name,
            start_date,
            duration_days: duration.unwrap_or(0),
            expiry_date,
            prompt_date,
            expired: None,
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A row whose every value is null, blank or absent is not a task.
pub fn is_blank(row: &RawRow) -> bool {
    row.values().all(is_empty)
}

/// Reads a text column. Empty and missing values both come back as `None`.
fn text_field(row: &RawRow, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn date_field(index: usize, row: &RawRow, column: &str) -> Option<NaiveDate> {
    let value = row.get(column).filter(|v| !is_empty(v))?;
    let parsed = value.as_str().and_then(parse_date);
    if parsed.is_none() {
        debug!(row = index, column, %value, "unparsable date, treating as unknown");
    }
    parsed
}

fn duration_field(index: usize, row: &RawRow) -> Option<u32> {
    let value = row.get("duration_days").filter(|v| !is_empty(v))?;
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|d| u32::try_from(d).ok())
            .or_else(|| n.as_f64().and_then(float_days)),
        Value::String(s) => parse_days(s),
        _ => None,
    };
    if parsed.is_none() {
        debug!(row = index, %value, "unparsable duration, using 0");
    }
    parsed
}

/// Leniently parses a calendar date, taking the date part of timestamps.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(input, layout).ok())
        .or_else(|| {
            DATETIME_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(input, layout).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Parses a day count written as an integer or a whole-ish float.
pub fn parse_days(input: &str) -> Option<u32> {
    let input = input.trim();
    input
        .parse::<u32>()
        .ok()
        .or_else(|| input.parse::<f64>().ok().and_then(float_days))
}

fn float_days(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        // Truncation is intended: 7.9 days is 7 whole days.
        Some(value as u32)
    } else {
        None
    }
}
