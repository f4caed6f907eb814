use chrono::NaiveDate;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::models::{Task, DATE_FORMAT};

/// A task ready for display: dates as `YYYY-MM-DD`, empty when unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub scheduler_name: String,
    pub scheduler_email: String,
    pub task_name: String,
    pub start_date: String,
    pub duration_days: u32,
    pub expiry_date: String,
    pub prompt_date: String,
    pub expired: bool,
    /// Set for records whose expiry could not be determined.
    pub needs_review: bool,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        TaskView {
            scheduler_name: task.scheduler_name.clone().unwrap_or_default(),
            scheduler_email: task.scheduler_email.clone().unwrap_or_default(),
            task_name: task.task_name.clone(),
            start_date: format_date(task.start_date),
            duration_days: task.duration_days,
            expiry_date: format_date(task.expiry_date),
            prompt_date: format_date(task.prompt_date),
            expired: task.is_expired(),
            needs_review: task.has_unknown_expiry(),
        }
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Only the tasks flagged expired by the last refresh.
pub fn expired_only(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.is_expired()).collect()
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| Cell::new(l).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Renders every task with all schema columns.
pub fn tasks_table(tasks: &[Task], scheduler_fields: bool) -> Table {
    let mut labels = Vec::new();
    if scheduler_fields {
        labels.extend(["Scheduler", "Email"]);
    }
    labels.extend(["Task", "Start", "Days", "Expiry", "Prompt", "Expired"]);

    let mut table = new_table();
    table.set_header(header(&labels));

    for view in tasks.iter().map(TaskView::from) {
        let mut row = Vec::new();
        if scheduler_fields {
            row.push(Cell::new(&view.scheduler_name));
            row.push(Cell::new(&view.scheduler_email));
        }
        let expiry = if view.needs_review {
            Cell::new("?").fg(Color::Yellow)
        } else {
            Cell::new(&view.expiry_date)
        };
        let (status, color) = if view.expired {
            ("yes", Color::Red)
        } else {
            ("no", Color::Green)
        };
        row.extend([
            Cell::new(&view.task_name),
            Cell::new(&view.start_date),
            Cell::new(view.duration_days),
            expiry,
            Cell::new(&view.prompt_date),
            Cell::new(status).fg(color),
        ]);
        table.add_row(row);
    }
    table
}

/// Renders the expired subset with the columns needed to chase them up.
pub fn expired_table(tasks: &[&Task], scheduler_fields: bool) -> Table {
    let mut labels = Vec::new();
    if scheduler_fields {
        labels.extend(["Scheduler", "Email"]);
    }
    labels.extend(["Task", "Start", "Expiry"]);

    let mut table = new_table();
    table.set_header(header(&labels));

    for view in tasks.iter().map(|t| TaskView::from(*t)) {
        let mut row = Vec::new();
        if scheduler_fields {
            row.push(Cell::new(&view.scheduler_name));
            row.push(Cell::new(&view.scheduler_email));
        }
        row.extend([
            Cell::new(&view.task_name),
            Cell::new(&view.start_date),
            Cell::new(&view.expiry_date).fg(Color::Red),
        ]);
        table.add_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task() -> Task {
        Task {
            scheduler_name: Some("Ana".into()),
            scheduler_email: None,
            task_name: "Renew license".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            duration_days: 7,
            expiry_date: NaiveDate::from_ymd_opt(2024, 1, 8),
            prompt_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            expired: Some(true),
        }
    }

    #[test]
    fn view_formats_dates() {
        assert_eq!(
            TaskView::from(&task()),
            TaskView {
                scheduler_name: "Ana".into(),
                scheduler_email: String::new(),
                task_name: "Renew license".into(),
                start_date: "2024-01-01".into(),
                duration_days: 7,
                expiry_date: "2024-01-08".into(),
                prompt_date: "2024-01-05".into(),
                expired: true,
                needs_review: false,
            }
        );
    }

    #[test]
    fn unknown_dates_render_empty() {
        let mut t = task();
        t.start_date = None;
        t.expiry_date = None;
        t.expired = None;
        let view = TaskView::from(&t);
        assert_eq!(view.start_date, "");
        assert_eq!(view.expiry_date, "");
        assert!(!view.expired);
        assert!(view.needs_review);
    }

    #[test]
    fn tables_hide_scheduler_columns_when_disabled() {
        let tasks = vec![task()];
        let full = tasks_table(&tasks, false).to_string();
        assert!(full.contains("Renew license"));
        assert!(!full.contains("Scheduler"));

        let expired = expired_table(&expired_only(&tasks), true).to_string();
        assert!(expired.contains("Scheduler"));
        assert!(expired.contains("2024-01-08"));
    }

    #[test]
    fn expired_only_filters_on_last_refresh() {
        let mut active = task();
        active.expired = Some(false);
        let tasks = vec![task(), active];
        assert_eq!(expired_only(&tasks).len(), 1);
    }
}
