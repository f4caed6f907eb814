use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

/// A persisted row as read back from storage: column name to loosely-typed value.
pub type RawRow = Map<String, Value>;

/// Column names of the persisted schema, in storage order.
pub const COLUMNS: [&str; 8] = [
    "scheduler_name",
    "scheduler_email",
    "task_name",
    "start_date",
    "duration_days",
    "expiry_date",
    "prompt_date",
    "expired",
];

/// Date format used both on disk and for display.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents a single tracked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Who scheduled the task (multi-user setups only).
    pub scheduler_name: Option<String>,
    /// Where alerts for the task should go (multi-user setups only).
    pub scheduler_email: Option<String>,
    /// The name of the task. Empty when missing on load.
    pub task_name: String,
    /// The day the task starts. `None` when the stored value could not be parsed.
    pub start_date: Option<NaiveDate>,
    /// Lifetime of the task in days.
    pub duration_days: u32,
    /// `start_date + duration_days`.
    pub expiry_date: Option<NaiveDate>,
    /// `expiry_date - prompt offset`.
    pub prompt_date: Option<NaiveDate>,
    /// Whether the expiry date has passed. `None` until evaluated against a clock.
    pub expired: Option<bool>,
}

/// Input collected from the add-task form or the `add` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub task_name: String,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    pub scheduler_name: Option<String>,
    pub scheduler_email: Option<String>,
}

/// Observable state of a task relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Active,
    Expired,
}

impl Task {
    /// Returns the status of the task at `now`.
    ///
    /// A task with an unknown expiry date is always `Active`.
    pub fn status(&self, now: NaiveDateTime) -> TaskStatus {
        match self.expiry_date {
            Some(expiry) if expiry.and_time(NaiveTime::MIN) < now => TaskStatus::Expired,
            _ => TaskStatus::Active,
        }
    }

    /// The last evaluated expiry flag, `false` if never evaluated.
    pub fn is_expired(&self) -> bool {
        self.expired.unwrap_or(false)
    }

    /// Whether `today` falls inside the reminder window of a still active task.
    pub fn prompt_reached(&self, today: NaiveDate) -> bool {
        !self.is_expired() && self.prompt_date.is_some_and(|prompt| prompt <= today)
    }

    /// Tasks without a known expiry never expire and need a human look.
    pub fn has_unknown_expiry(&self) -> bool {
        self.expiry_date.is_none()
    }

    /// Converts the task to its persisted row, with columns in schema order.
    ///
    /// `expired` is written empty; it is never authoritative on disk.
    pub fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.insert("scheduler_name".into(), text(self.scheduler_name.as_deref()));
        row.insert("scheduler_email".into(), text(self.scheduler_email.as_deref()));
        row.insert("task_name".into(), Value::String(self.task_name.clone()));
        row.insert("start_date".into(), date(self.start_date));
        row.insert("duration_days".into(), Value::from(self.duration_days));
        row.insert("expiry_date".into(), date(self.expiry_date));
        row.insert("prompt_date".into(), date(self.prompt_date));
        row.insert("expired".into(), Value::String(String::new()));
        row
    }
}

fn text(value: Option<&str>) -> Value {
    Value::String(value.unwrap_or_default().to_string())
}

fn date(value: Option<NaiveDate>) -> Value {
    Value::String(
        value
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(expiry: Option<NaiveDate>) -> Task {
        Task {
            scheduler_name: None,
            scheduler_email: None,
            task_name: "Inspect boiler".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            duration_days: 10,
            expiry_date: expiry,
            prompt_date: expiry.and_then(|e| e.pred_opt()),
            expired: None,
        }
    }

    #[test]
    fn to_row_follows_schema_order() {
        let row = task(NaiveDate::from_ymd_opt(2024, 3, 11)).to_row();
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, COLUMNS);
        assert_eq!(row["expiry_date"], "2024-03-11");
        assert_eq!(row["scheduler_name"], "");
        assert_eq!(row["duration_days"], 10);
    }

    #[test]
    fn unknown_expiry_is_active_and_flagged() {
        let t = task(None);
        let now = NaiveDate::from_ymd_opt(2100, 1, 1)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(t.status(now), TaskStatus::Active);
        assert!(t.has_unknown_expiry());
    }

    #[test]
    fn prompt_window_excludes_expired_tasks() {
        let mut t = task(NaiveDate::from_ymd_opt(2024, 3, 11));
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(t.prompt_reached(today));
        t.expired = Some(true);
        assert!(!t.prompt_reached(today));
    }
}
