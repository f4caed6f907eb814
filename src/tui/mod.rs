pub mod app;
pub mod ui;

use std::io;

use chrono::{Local, NaiveDateTime};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::config::Settings;
use crate::error::AppError;
use crate::storage::TaskStore;
use app::{App, InputMode};
use ui::ui;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn run_tui<S: TaskStore>(store: S, settings: Settings) -> Result<(), AppError> {
    // Load before touching the terminal so storage errors print normally.
    let mut app = App::new(store, settings, now())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend, S: TaskStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<(), AppError> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char('a') => app.start_add(),
                KeyCode::Char('v') => app.toggle_view(),
                KeyCode::Char('r') => app.reload(now())?,
                _ => {}
            },
            InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(now()),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
