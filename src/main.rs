//! # lapsetrack
//!
//! Tracks tasks with a limited lifetime. Each task has a start date and a
//! duration; lapsetrack derives its expiry date and a prompt (reminder) date a
//! few days earlier, and flags every task whose expiry date has passed.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! Run without arguments to open the task table:
//!
//! ```bash
//! lapsetrack
//! # or explicitly
//! lapsetrack ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `a`: Add new task
//! *   `v`: Toggle between all tasks and expired tasks
//! *   `r`: Reload from disk
//! *   `j` / `k`: Move selection
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! # Seven-day task starting today
//! lapsetrack add "Renew license"
//!
//! # Explicit start and duration, with scheduler details
//! lapsetrack add "Renew license" --start 2024-01-01 --days 7 --scheduler Ana --email ana@example.com
//!
//! # All tasks, then expired ones
//! lapsetrack list
//!
//! # Expired tasks only
//! lapsetrack list --expired
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved as a JSON array in your local data directory:
//! *   Linux: `~/.local/share/lapsetrack/tasks.json`
//! *   macOS: `~/Library/Application Support/lapsetrack/tasks.json`
//! *   Windows: `%LOCALAPPDATA%\lapsetrack\tasks.json`
//!
//! Override it with `--data-file`, `LAPSETRACK_DATA_FILE` or `data_file` in
//! `lapsetrack.toml`.
//!
//! ## Configuration
//!
//! Settings come from `~/.config/lapsetrack/config.toml`, `./lapsetrack.toml`
//! and `LAPSETRACK_*` environment variables, in increasing priority:
//! `prompt_offset_days` (default 3), `default_duration_days` (default 7),
//! `scheduler_fields` (default true) and `data_file`. Log verbosity follows
//! `LAPSETRACK_LOG` (an `EnvFilter` directive).

use std::io;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use lapsetrack::commands::{cmd_add, cmd_list};
use lapsetrack::config::Settings;
use lapsetrack::error::AppError;
use lapsetrack::models::NewTask;
use lapsetrack::reconcile::parse_date;
use lapsetrack::storage::JsonFileStore;
use lapsetrack::tui::run_tui;

#[derive(Debug, Parser)]
#[command(name = "lapsetrack")]
#[command(about = "Track tasks that expire", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Task store to use instead of the configured one
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task name (quoted if it has spaces)
        task_name: String,
        /// Start date in YYYY-MM-DD, defaults to today
        #[arg(short, long, value_parser = parse_start_date)]
        start: Option<NaiveDate>,
        /// Duration in days, at least 1
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Your name (scheduler)
        #[arg(long)]
        scheduler: Option<String>,
        /// Your email, for alerts
        #[arg(short, long)]
        email: Option<String>,
    },
    /// List tasks and flag the expired ones
    List {
        /// Show only expired tasks
        #[arg(short, long)]
        expired: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

fn parse_start_date(input: &str) -> Result<NaiveDate, String> {
    parse_date(input).ok_or_else(|| format!("invalid date '{input}'. Use YYYY-MM-DD."))
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("lapsetrack error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let ui_mode = matches!(cli.command, None | Some(Commands::Ui));
    init_tracing(cli.quiet, cli.verbose, ui_mode);

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "lapsetrack", &mut io::stdout());
        return Ok(());
    }

    let mut settings = Settings::load()?;
    if let Some(path) = cli.data_file {
        settings.data_file = Some(path);
    }
    let store = JsonFileStore::new(settings.data_path());
    let now = Local::now().naive_local();

    match cli.command {
        Some(Commands::Add { task_name, start, days, scheduler, email }) => {
            let input = NewTask {
                task_name,
                start_date: start.unwrap_or_else(|| now.date()),
                duration_days: days.unwrap_or(settings.default_duration_days),
                scheduler_name: scheduler,
                scheduler_email: email,
            };
            cmd_add(&store, &settings, input, now, false)
        }
        Some(Commands::List { expired }) => cmd_list(&store, &settings, now, expired),
        Some(Commands::Ui) | None => run_tui(store, settings),
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

/// Logs go to stderr. The TUI owns the terminal, so it stays silent unless
/// `LAPSETRACK_LOG` asks otherwise.
fn init_tracing(quiet: bool, verbose: bool, ui_mode: bool) {
    let level = if ui_mode {
        "off"
    } else if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_env("LAPSETRACK_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_start_and_days() {
        let cli = Cli::try_parse_from(["lapsetrack", "add", "Renew license", "--start", "2024-01-01", "--days", "7"])
            .unwrap();
        match cli.command {
            Some(Commands::Add { task_name, start, days, .. }) => {
                assert_eq!(task_name, "Renew license");
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(days, Some(7));
            }
            _ => panic!("expected the add command"),
        }
    }

    #[test]
    fn add_rejects_zero_days() {
        let err = Cli::try_parse_from(["lapsetrack", "add", "x", "--days", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn add_rejects_unparsable_start() {
        let err = Cli::try_parse_from(["lapsetrack", "add", "x", "--start", "not-a-date"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(parse_start_date("2024-02-30").is_err());
    }
}
