use chrono::NaiveDateTime;
use tracing::info;

use crate::config::Settings;
use crate::display::{expired_only, expired_table, tasks_table};
use crate::error::AppError;
use crate::lifecycle::{refresh_expiry, Lifecycle};
use crate::models::{NewTask, RawRow, Task};
use crate::reconcile::{is_blank, Reconciler};
use crate::storage::TaskStore;

/// Loads every task and evaluates expiry at `now`.
pub fn load_tasks<S: TaskStore>(
    store: &S,
    settings: &Settings,
    now: NaiveDateTime,
) -> Result<Vec<Task>, AppError> {
    let snapshot = store.load()?;
    let tasks = Reconciler::new(settings.prompt_offset()?).reconcile(&snapshot.rows);
    Ok(refresh_expiry(&tasks, now))
}

/// Admits a new task, appends it to the store and returns the refreshed task list.
///
/// Existing rows are written back exactly as loaded; only blank rows are left
/// out. If another writer saved in between, the save is refused with a
/// conflict and nothing is written.
pub fn add_task<S: TaskStore>(
    store: &S,
    settings: &Settings,
    input: NewTask,
    now: NaiveDateTime,
) -> Result<Vec<Task>, AppError> {
    let offset = settings.prompt_offset()?;
    let task = Lifecycle::new(offset).admit(input)?;

    let snapshot = store.load()?;
    let mut rows: Vec<RawRow> = snapshot.rows.into_iter().filter(|r| !is_blank(r)).collect();
    let mut tasks = Reconciler::new(offset).reconcile(&rows);
    rows.push(task.to_row());
    tasks.push(task);
    store.save(&rows, snapshot.revision)?;
    info!(total = rows.len(), "task appended");

    Ok(refresh_expiry(&tasks, now))
}

/// Adds a task and prints the updated tables.
pub fn cmd_add<S: TaskStore>(
    store: &S,
    settings: &Settings,
    input: NewTask,
    now: NaiveDateTime,
    silent: bool,
) -> Result<(), AppError> {
    let tasks = add_task(store, settings, input, now)?;
    if !silent {
        if let Some(added) = tasks.last() {
            match &added.scheduler_name {
                Some(who) => println!("Task '{}' added by {}!", added.task_name, who),
                None => println!("Task '{}' added!", added.task_name),
            }
        }
        print_report(&tasks, settings, false);
    }
    Ok(())
}

/// Prints all tasks, or only the expired ones.
pub fn cmd_list<S: TaskStore>(
    store: &S,
    settings: &Settings,
    now: NaiveDateTime,
    only_expired: bool,
) -> Result<(), AppError> {
    let tasks = load_tasks(store, settings, now)?;
    print_report(&tasks, settings, only_expired);
    Ok(())
}

fn print_report(tasks: &[Task], settings: &Settings, only_expired: bool) {
    if tasks.is_empty() {
        println!("No tasks yet. Add a new task to get started!");
        return;
    }

    if !only_expired {
        println!("All Tasks");
        println!("{}", tasks_table(tasks, settings.scheduler_fields));
    }

    let expired = expired_only(tasks);
    if expired.is_empty() {
        println!("No expired tasks.");
    } else {
        println!("Expired Tasks");
        println!("{}", expired_table(&expired, settings.scheduler_fields));
    }
}
