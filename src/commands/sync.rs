use std::sync::Arc;

use anyhow::{Context, Result};
use mailcal_core::{
    EventExtractor, Mailbox, MessageOutcome, Settings, SyncOptions, SyncOrchestrator, SyncReport,
};
use mailcal_provider_google::{Credentials, GmailMailbox, GoogleCalendar};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(max_results: Option<usize>, calendar: Option<String>) -> Result<()> {
    let settings = Settings::from_env().context("Invalid configuration")?;

    let credentials = Credentials::obtain(&settings.token_path, &settings.credentials_path)
        .await
        .context("Failed to obtain Google credentials")?;

    let mailbox = GmailMailbox::new(credentials.access_token());
    let filter = settings.message_filter();
    let max_results = max_results.unwrap_or(settings.max_results);

    let messages = mailbox
        .list_messages(&filter, max_results)
        .await
        .context("Failed to list messages")?;

    if messages.is_empty() {
        info!(sender = %settings.sender_email, "no new emails");
        println!("No new emails from {}", settings.sender_email);
        return Ok(());
    }

    info!(count = messages.len(), sender = %settings.sender_email, "found messages");

    let mut options = SyncOptions::from_settings(&settings);
    if let Some(calendar) = calendar {
        options.calendar_id = calendar;
    }

    let orchestrator = SyncOrchestrator::new(
        EventExtractor::new(settings.extractor_settings()),
        Arc::new(GoogleCalendar::from_credentials(&credentials)),
        options,
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current message");
                cancel.cancel();
            }
        })
    };

    let report = orchestrator.run(&messages, &cancel).await;
    interrupt.abort();

    print_report(&report);

    Ok(())
}

fn print_report(report: &SyncReport) {
    for (message_id, outcome) in &report.outcomes {
        match outcome {
            MessageOutcome::Created { link, .. } => println!("  + {}: {}", message_id, link),
            MessageOutcome::Conflict { summary } => {
                println!("  ! {}: '{}' conflicts with an existing event", message_id, summary)
            }
            MessageOutcome::Failed { reason, .. } => println!("  x {}: {}", message_id, reason),
            MessageOutcome::Skipped(_) => {}
        }
    }

    println!(
        "\nCreated {}, skipped {}, conflicts {}, failed {}",
        report.created(),
        report.skipped(),
        report.conflicts(),
        report.failed()
    );

    if report.interrupted {
        println!("Interrupted before all messages were processed.");
    }
}
