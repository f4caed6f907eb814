use std::num::NonZeroU32;

use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::LifecycleError;
use crate::models::{NewTask, Task, TaskStatus};

/// Derives expiry and prompt dates for new tasks and evaluates expiry.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    prompt_offset_days: NonZeroU32,
}

impl Lifecycle {
    pub fn new(prompt_offset_days: NonZeroU32) -> Self {
        Self { prompt_offset_days }
    }

    /// Validates form input and derives the task.
    pub fn admit(&self, input: NewTask) -> Result<Task, LifecycleError> {
        if input.duration_days < 1 {
            return Err(LifecycleError::InvalidDuration(input.duration_days));
        }
        Ok(derive_on_create(input, self.prompt_offset_days))
    }
}

/// Builds a task from form input.
///
/// `expiry_date = start_date + duration_days` and
/// `prompt_date = expiry_date - offset_days`. `expired` is left unset until
/// [`refresh_expiry`] runs. The offset is never zero, so the prompt always
/// precedes the expiry. Dates past the end of the calendar come back unknown.
pub fn derive_on_create(input: NewTask, offset_days: NonZeroU32) -> Task {
    let expiry_date = add_days(input.start_date, input.duration_days);
    let prompt_date = expiry_date.and_then(|expiry| sub_days(expiry, offset_days.get()));
    debug!(
        task = %input.task_name,
        start = %input.start_date,
        ?expiry_date,
        ?prompt_date,
        "derived task dates"
    );
    Task {
        scheduler_name: input.scheduler_name,
        scheduler_email: input.scheduler_email,
        task_name: input.task_name,
        start_date: Some(input.start_date),
        duration_days: input.duration_days,
        expiry_date,
        prompt_date,
        expired: None,
    }
}

/// Returns a copy of `tasks` with `expired` evaluated at `now`.
///
/// A task expiring exactly at `now` is not expired yet. Tasks with an unknown
/// expiry date are never expired.
pub fn refresh_expiry(tasks: &[Task], now: NaiveDateTime) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| Task {
            expired: Some(task.status(now) == TaskStatus::Expired),
            ..task.clone()
        })
        .collect()
}

pub(crate) fn add_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
}

pub(crate) fn sub_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days)))
}
