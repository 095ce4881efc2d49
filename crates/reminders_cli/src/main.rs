//! iCloud Reminders CLI
//!
//! Reads and edits iCloud Reminders from the terminal.
//!
//! # Commands
//!
//! - `auth` - Sign in and save the session
//! - `sync` - Pull changes into the local cache
//! - `list` / `lists` / `search` / `json` - Read from the cache
//! - `add` / `add-batch` / `complete` / `delete` / `edit` - Write changes back
//!
//! Every command except `auth` reuses the saved session and runs a delta
//! sync before doing its work.

mod commands;
mod context;
mod credentials;
mod render;

use clap::{Parser, Subcommand};
use reminders_protocol::Priority;
use reminders_storage::ConfigPaths;
use reminders_sync_engine::ReminderEdit;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// iCloud Reminders from the command line.
#[derive(Parser)]
#[command(name = "reminders")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity: -v info, -vv debug
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory holding session.json, ck_cache.json and credentials
    #[arg(global = true, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with iCloud (required on first run or session expiry)
    ///
    /// Credentials come from ICLOUD_USERNAME / ICLOUD_PASSWORD, then the
    /// credentials file in the config directory, then an interactive prompt.
    /// The password is only used for the SRP exchange and never stored.
    Auth {
        /// Re-authenticate even if the saved session is valid
        #[arg(long)]
        force: bool,
    },

    /// Pull changes into the local cache
    Sync {
        /// Discard the cache and fetch everything
        #[arg(long)]
        force: bool,
    },

    /// List reminders grouped by list
    List {
        /// Include completed reminders
        #[arg(short, long)]
        all: bool,

        /// Only show this list
        #[arg(short, long)]
        list: Option<String>,

        /// Only show children of this parent reminder (title or id)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show all reminder lists
    Lists,

    /// Add a reminder
    Add {
        /// Title of the reminder
        title: String,

        /// List name
        #[arg(short, long)]
        list: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(short, long)]
        due: Option<String>,

        /// Priority: high, medium, low or none
        #[arg(short, long)]
        priority: Option<String>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Parent reminder id (makes this a subtask)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Add several reminders at once
    AddBatch {
        /// Titles, one reminder each
        #[arg(required = true)]
        titles: Vec<String>,

        /// List name
        #[arg(short, long)]
        list: Option<String>,

        /// Parent reminder id (makes them subtasks)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Mark a reminder as complete
    Complete {
        /// Reminder id or id prefix
        id: String,
    },

    /// Delete a reminder
    Delete {
        /// Reminder id or id prefix
        id: String,
    },

    /// Edit a reminder's title, due date, notes or priority
    ///
    /// Only the given fields change. An empty --due or --notes clears that field.
    Edit {
        /// Reminder id or id prefix
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New due date (YYYY-MM-DD); an empty value clears it
        #[arg(short, long)]
        due: Option<String>,

        /// New notes
        #[arg(short, long)]
        notes: Option<String>,

        /// New priority: high, medium, low or none
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Search reminders by title
    Search {
        /// Text to look for (case-insensitive)
        query: String,

        /// Include completed reminders
        #[arg(short, long)]
        all: bool,
    },

    /// Print lists and reminders as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let paths = match cli.config_dir {
        Some(dir) => ConfigPaths::new(dir),
        None => ConfigPaths::default_location()?,
    };

    match cli.command {
        Commands::Auth { force } => commands::auth::run(&paths, force)?,
        Commands::Sync { force } => commands::sync::run(&paths, force)?,
        Commands::List { all, list, parent } => {
            commands::list::run(&paths, all, list.as_deref(), parent.as_deref())?;
        }
        Commands::Lists => commands::lists::run(&paths)?,
        Commands::Add {
            title,
            list,
            due,
            priority,
            notes,
            parent,
        } => {
            let args = commands::add::AddArgs {
                title,
                list,
                due,
                priority,
                notes,
                parent,
            };
            commands::add::run(&paths, args)?;
        }
        Commands::AddBatch {
            titles,
            list,
            parent,
        } => commands::add::run_batch(&paths, &titles, list.as_deref(), parent.as_deref())?,
        Commands::Complete { id } => commands::modify::complete(&paths, &id)?,
        Commands::Delete { id } => commands::modify::delete(&paths, &id)?,
        Commands::Edit {
            id,
            title,
            due,
            notes,
            priority,
        } => {
            let priority = priority.as_deref().map(str::parse::<Priority>).transpose()?;
            let edit = ReminderEdit {
                title,
                due,
                notes,
                priority,
            };
            commands::modify::edit(&paths, &id, edit)?;
        }
        Commands::Search { query, all } => commands::search::run(&paths, &query, all)?,
        Commands::Json => commands::json::run(&paths)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["reminders", "-vv", "lists"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Lists));
    }

    #[test]
    fn add_flags() {
        let cli = Cli::parse_from([
            "reminders", "add", "Buy milk", "-l", "Shopping", "-d", "2026-03-01", "-p", "high",
        ]);
        match cli.command {
            Commands::Add {
                title,
                list,
                due,
                priority,
                ..
            } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(list.as_deref(), Some("Shopping"));
                assert_eq!(due.as_deref(), Some("2026-03-01"));
                assert_eq!(priority.as_deref(), Some("high"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn add_batch_needs_titles() {
        assert!(Cli::try_parse_from(["reminders", "add-batch", "-l", "Work"]).is_err());
        let cli = Cli::try_parse_from(["reminders", "add-batch", "a", "b", "-l", "Work"]).unwrap();
        match cli.command {
            Commands::AddBatch { titles, .. } => assert_eq!(titles, vec!["a", "b"]),
            _ => panic!("expected add-batch"),
        }
    }

    #[test]
    fn global_config_dir_after_subcommand() {
        let cli = Cli::parse_from(["reminders", "sync", "--force", "--config-dir", "/tmp/r"]);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/r")));
        assert!(matches!(cli.command, Commands::Sync { force: true }));
    }
}
