mod commands;
mod logging;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mailcal_core::FilePaths;
use tracing::error;

#[derive(Parser)]
#[command(name = "mailcal")]
#[command(about = "Turn event announcements in your inbox into Google Calendar events")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan unread mail from the configured sender and create calendar events (default)
    Sync {
        /// Maximum number of messages to process (overrides MAX_RESULTS)
        #[arg(long)]
        max_results: Option<usize>,

        /// Calendar to create events in (overrides CALENDAR_ID)
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Authorize mailcal to read Gmail and write to Google Calendar
    Auth,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    // Settings are validated by the commands; only the log location is needed here
    let files = FilePaths::from_env().unwrap_or_default();
    if let Err(e) = logging::init(&files.log_file) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let command = cli.command.unwrap_or(Commands::Sync {
        max_results: None,
        calendar: None,
    });

    let result = match command {
        Commands::Sync {
            max_results,
            calendar,
        } => commands::sync::run(max_results, calendar).await,
        Commands::Auth => commands::auth::run().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(fatal = true, error = %format!("{e:#}"), "mailcal stopped");
            ExitCode::FAILURE
        }
    }
}
