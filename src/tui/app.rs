use chrono::NaiveDateTime;
use ratatui::widgets::TableState;
use tracing::warn;

use crate::commands::{add_task, load_tasks};
use crate::config::Settings;
use crate::error::AppError;
use crate::models::{NewTask, Task};
use crate::reconcile::{parse_date, parse_days};
use crate::storage::TaskStore;

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Adding,
}

#[derive(Debug, PartialEq)]
pub enum ViewMode {
    All,
    Expired,
}

/// One field of the "Add Task" form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddStep {
    SchedulerName,
    SchedulerEmail,
    TaskName,
    StartDate,
    Duration,
}

/// State for the multi-step "Add Task" form.
#[derive(Debug, Default)]
pub struct AddState {
    pub step: usize,
    pub scheduler_name: Option<String>,
    pub scheduler_email: Option<String>,
    pub task_name: String,
    pub start_date: Option<chrono::NaiveDate>,
    /// Validation message for the current step.
    pub error: Option<String>,
}

pub struct App<S: TaskStore> {
    store: S,
    pub settings: Settings,
    pub tasks: Vec<Task>,
    pub state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub add_state: AddState,
    /// Last outcome shown in the help bar.
    pub status: Option<String>,
    /// When the table was last evaluated.
    pub now: NaiveDateTime,
}

impl<S: TaskStore> App<S> {
    /// Creates the app and loads the task table.
    pub fn new(store: S, settings: Settings, now: NaiveDateTime) -> Result<Self, AppError> {
        let mut app = App {
            store,
            settings,
            tasks: Vec::new(),
            state: TableState::default(),
            view_mode: ViewMode::All,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            add_state: AddState::default(),
            status: None,
            now,
        };
        app.reload(now)?;
        Ok(app)
    }

    /// Re-reads the store and re-evaluates expiry.
    pub fn reload(&mut self, now: NaiveDateTime) -> Result<(), AppError> {
        self.tasks = load_tasks(&self.store, &self.settings, now)?;
        self.now = now;
        self.clamp_selection();
        Ok(())
    }

    /// Whether `task` is past its prompt date as of the last evaluation.
    pub fn in_prompt_window(&self, task: &Task) -> bool {
        task.prompt_reached(self.now.date())
    }

    /// Tasks shown in the current view.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        match self.view_mode {
            ViewMode::All => self.tasks.iter().collect(),
            ViewMode::Expired => self.tasks.iter().filter(|t| t.is_expired()).collect(),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        let selected = match self.state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.state.select(selected);
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::All => ViewMode::Expired,
            ViewMode::Expired => ViewMode::All,
        };
        self.state.select(None);
        self.clamp_selection();
    }

    /// Selects the next row, wrapping around.
    pub fn next(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous row, wrapping around.
    pub fn previous(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Fields the form asks for, in order.
    pub fn steps(&self) -> Vec<AddStep> {
        let mut steps = Vec::new();
        if self.settings.scheduler_fields {
            steps.extend([AddStep::SchedulerName, AddStep::SchedulerEmail]);
        }
        steps.extend([AddStep::TaskName, AddStep::StartDate, AddStep::Duration]);
        steps
    }

    pub fn current_step(&self) -> Option<AddStep> {
        self.steps().get(self.add_state.step).copied()
    }

    /// Opens the "Add Task" form.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Consumes the input buffer for the current step of the form.
    ///
    /// Invalid dates or durations keep the form on the same step.
    pub fn handle_input(&mut self, now: NaiveDateTime) {
        if self.input_mode != InputMode::Adding {
            return;
        }
        let value = self.input_buffer.trim().to_string();
        let optional = || (!value.is_empty()).then(|| value.clone());
        match self.current_step() {
            Some(AddStep::SchedulerName) => self.add_state.scheduler_name = optional(),
            Some(AddStep::SchedulerEmail) => self.add_state.scheduler_email = optional(),
            Some(AddStep::TaskName) => self.add_state.task_name = value.clone(),
            Some(AddStep::StartDate) => {
                if value.is_empty() {
                    self.add_state.start_date = Some(now.date());
                } else if let Some(date) = parse_date(&value) {
                    self.add_state.start_date = Some(date);
                } else {
                    self.add_state.error = Some(format!("Invalid date '{}'", value));
                    return;
                }
            }
            Some(AddStep::Duration) => {
                let days = if value.is_empty() {
                    Some(self.settings.default_duration_days)
                } else {
                    parse_days(&value).filter(|d| *d >= 1)
                };
                match days {
                    Some(days) => {
                        self.input_buffer.clear();
                        self.submit(days, now);
                        return;
                    }
                    None => {
                        self.add_state.error = Some(format!("Invalid duration '{}'", value));
                        return;
                    }
                }
            }
            None => {}
        }
        self.add_state.error = None;
        self.add_state.step += 1;
        self.input_buffer.clear();
    }

    fn submit(&mut self, duration_days: u32, now: NaiveDateTime) {
        let form = std::mem::take(&mut self.add_state);
        let input = NewTask {
            task_name: form.task_name,
            start_date: form.start_date.unwrap_or_else(|| now.date()),
            duration_days,
            scheduler_name: form.scheduler_name,
            scheduler_email: form.scheduler_email,
        };
        let name = input.task_name.clone();
        let who = input.scheduler_name.clone();

        self.input_mode = InputMode::Normal;
        match add_task(&self.store, &self.settings, input, now) {
            Ok(tasks) => {
                self.tasks = tasks;
                self.now = now;
                self.status = Some(match who {
                    Some(who) => format!("Task '{}' added by {}!", name, who),
                    None => format!("Task '{}' added!", name),
                });
                self.view_mode = ViewMode::All;
                self.state.select(Some(self.tasks.len().saturating_sub(1)));
            }
            Err(e) => {
                warn!(error = %e, "failed to add task");
                self.status = Some(format!("Failed to add task: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn app(scheduler_fields: bool) -> App<MemoryStore> {
        let settings = Settings {
            scheduler_fields,
            ..Settings::default()
        };
        App::new(MemoryStore::new(), settings, now()).unwrap()
    }

    fn enter(app: &mut App<MemoryStore>, text: &str) {
        app.input_buffer = text.to_string();
        app.handle_input(now());
    }

    #[test]
    fn form_adds_task_and_shows_it_expired() {
        let mut app = app(true);
        app.start_add();
        enter(&mut app, "Ana");
        enter(&mut app, "ana@example.com");
        enter(&mut app, "Renew license");
        enter(&mut app, "2024-01-01");
        enter(&mut app, "7");

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.tasks.len(), 1);
        let task = &app.tasks[0];
        assert_eq!(task.expiry_date, NaiveDate::from_ymd_opt(2024, 1, 8));
        assert_eq!(task.expired, Some(true));
        assert_eq!(app.status.as_deref(), Some("Task 'Renew license' added by Ana!"));
        assert_eq!(app.store.rows().len(), 1);

        app.toggle_view();
        assert_eq!(app.visible_tasks().len(), 1);
    }

    #[test]
    fn empty_answers_use_defaults() {
        let mut app = app(false);
        app.start_add();
        enter(&mut app, "Service car");
        enter(&mut app, "");
        enter(&mut app, "");

        let task = &app.tasks[0];
        assert_eq!(task.start_date, Some(now().date()));
        assert_eq!(task.duration_days, 7);
        assert_eq!(task.scheduler_name, None);
        assert_eq!(task.expired, Some(false));
    }

    #[test]
    fn invalid_input_keeps_the_step() {
        let mut app = app(false);
        app.start_add();
        enter(&mut app, "Service car");
        enter(&mut app, "tomorrow");
        assert_eq!(app.current_step(), Some(AddStep::StartDate));
        assert!(app.add_state.error.is_some());

        enter(&mut app, "2024-02-01");
        enter(&mut app, "0");
        assert_eq!(app.current_step(), Some(AddStep::Duration));
        assert!(app.tasks.is_empty());
    }

    #[test]
    fn navigation_wraps() {
        let mut app = app(false);
        for name in ["a", "b"] {
            app.start_add();
            enter(&mut app, name);
            enter(&mut app, "");
            enter(&mut app, "");
        }
        app.state.select(Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
    }

    #[test]
    fn prompt_window_follows_last_evaluation() {
        let at = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_time(NaiveTime::MIN);
        let mut app = App::new(MemoryStore::new(), Settings::default(), at(4)).unwrap();
        app.start_add();
        app.input_buffer = "Renew license".into();
        app.handle_input(at(4));
        app.input_buffer = "2024-01-01".into();
        app.handle_input(at(4));
        app.input_buffer = "7".into();
        app.handle_input(at(4));

        assert_eq!(app.now, at(4));
        let task = app.tasks[0].clone();
        assert_eq!(task.prompt_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(!app.in_prompt_window(&task));

        app.reload(at(6)).unwrap();
        assert_eq!(app.now, at(6));
        assert!(app.in_prompt_window(&app.tasks[0]));
    }
}
