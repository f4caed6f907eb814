use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{AddStep, App, InputMode, ViewMode};
use crate::display::TaskView;
use crate::storage::TaskStore;

pub fn ui<S: TaskStore>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    let scheduler_fields = app.settings.scheduler_fields;

    let rows: Vec<Row> = app
        .visible_tasks()
        .into_iter()
        .map(|t| {
            let view = TaskView::from(t);
            let style = if view.expired {
                Style::default().fg(Color::Red)
            } else if app.in_prompt_window(t) {
                Style::default().fg(Color::Yellow)
            } else if view.needs_review {
                Style::default().fg(Color::Magenta)
            } else {
                Style::default().fg(Color::Green)
            };

            let mut cells = Vec::new();
            if scheduler_fields {
                cells.push(Cell::from(view.scheduler_name));
                cells.push(Cell::from(view.scheduler_email));
            }
            cells.extend([
                Cell::from(view.task_name),
                Cell::from(view.start_date),
                Cell::from(view.duration_days.to_string()),
                Cell::from(if view.needs_review { "?".to_string() } else { view.expiry_date }),
                Cell::from(view.prompt_date),
                Cell::from(if view.expired { "yes" } else { "no" }),
            ]);
            Row::new(cells).style(style)
        })
        .collect();

    let mut header = Vec::new();
    let mut widths = Vec::new();
    if scheduler_fields {
        header.extend(["Scheduler", "Email"]);
        widths.extend([Constraint::Length(14), Constraint::Length(22)]);
    }
    header.extend(["Task", "Start", "Days", "Expiry", "Prompt", "Expired"]);
    widths.extend([
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(8),
    ]);

    let title = match app.view_mode {
        ViewMode::All => "lapsetrack - All Tasks",
        ViewMode::Expired => "lapsetrack - Expired Tasks",
    };

    let table = Table::new(rows, widths)
        .header(Row::new(header)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[0], &mut app.state);

    let help_text = match app.input_mode {
        InputMode::Normal => {
            let keys = match app.view_mode {
                ViewMode::All => "q: Quit | a: Add | v: View Expired | r: Reload | j/k: Move",
                ViewMode::Expired => "q: Quit | a: Add | v: View All | r: Reload | j/k: Move",
            };
            match &app.status {
                Some(status) => format!("{} | {}", status, keys),
                None => keys.to_string(),
            }
        }
        InputMode::Adding => "Enter: Next Step | Esc: Cancel".to_string(),
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[1]);

    if app.input_mode == InputMode::Adding {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let prompt = match app.current_step() {
            Some(AddStep::SchedulerName) => "Add Task: Your Name (Optional)".to_string(),
            Some(AddStep::SchedulerEmail) => "Add Task: Your Email (Optional)".to_string(),
            Some(AddStep::TaskName) => "Add Task: Task Name".to_string(),
            Some(AddStep::StartDate) => "Add Task: Start Date (YYYY-MM-DD, empty for today)".to_string(),
            Some(AddStep::Duration) => format!(
                "Add Task: Duration in Days (empty for {})",
                app.settings.default_duration_days
            ),
            None => "Add Task".to_string(),
        };
        let title = match &app.add_state.error {
            Some(error) => format!("{} - {}", prompt, error),
            None => prompt,
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
