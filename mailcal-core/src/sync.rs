//! Sync pipeline: messages in, calendar events out.
//!
//! Messages are processed one at a time. Each one is extracted, checked for a
//! conflicting calendar entry, and created if the slot is free. A failure on
//! one message is logged and recorded; it never stops the batch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{MailcalError, MailcalResult};
use crate::event::EventRecord;
use crate::extract::{EventExtractor, ExtractionOutcome};
use crate::message::RawMessage;
use crate::provider::CalendarBackend;
use crate::retry::RetryPolicy;

const DEFAULT_PACING: StdDuration = StdDuration::from_secs(1);
const DEFAULT_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Why a message was passed over without touching the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoBody,
    NoDate,
}

/// Final state of one message after a sync pass
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Created { link: String, attempts: u32 },
    Skipped(SkipReason),
    /// The calendar already had something in the event's window
    Conflict { summary: String },
    Failed { reason: String, attempts: u32 },
}

/// Per-message outcomes of a sync pass, in processing order
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<(String, MessageOutcome)>,
    /// The pass was stopped before every message was processed
    pub interrupted: bool,
}

impl SyncReport {
    pub fn outcome_for(&self, message_id: &str) -> Option<&MessageOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == message_id)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&MessageOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Created { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Skipped(_)))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Conflict { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Failed { .. }))
    }
}

/// Knobs for [`SyncOrchestrator`]
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub calendar_id: String,
    pub conflict_window: Duration,
    pub retry: RetryPolicy,
    /// Pause after each message that reached the calendar
    pub pacing: StdDuration,
    /// Upper bound on a single calendar call
    pub call_timeout: StdDuration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            calendar_id: "primary".to_string(),
            conflict_window: Duration::minutes(30),
            retry: RetryPolicy::default(),
            pacing: DEFAULT_PACING,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl SyncOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        SyncOptions {
            calendar_id: settings.calendar_id.clone(),
            conflict_window: settings.conflict_window,
            ..Default::default()
        }
    }
}

/// What the calendar step did with an extracted event
enum Scheduled {
    Created(Option<String>),
    Conflict,
}

pub struct SyncOrchestrator {
    extractor: EventExtractor,
    calendar: Arc<dyn CalendarBackend>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(extractor: EventExtractor, calendar: Arc<dyn CalendarBackend>, options: SyncOptions) -> Self {
        SyncOrchestrator {
            extractor,
            calendar,
            options,
        }
    }

    /// Process `messages` in order.
    ///
    /// `cancel` is checked between messages; a message that has started is
    /// always finished.
    pub async fn run(&self, messages: &[RawMessage], cancel: &CancellationToken) -> SyncReport {
        let mut report = SyncReport::default();

        for (index, message) in messages.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    remaining = messages.len() - index,
                    "sync interrupted, skipping remaining messages"
                );
                report.interrupted = true;
                break;
            }

            let (outcome, reached_calendar) = self.process_message(message).await;
            report.outcomes.push((message.id.clone(), outcome));

            if reached_calendar && !self.options.pacing.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.options.pacing) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        info!(
            processed = report.outcomes.len(),
            created = report.created(),
            skipped = report.skipped(),
            conflicts = report.conflicts(),
            failed = report.failed(),
            "sync finished"
        );

        report
    }

    /// Returns the outcome and whether the calendar was called successfully.
    async fn process_message(&self, message: &RawMessage) -> (MessageOutcome, bool) {
        let message_id = message.id.as_str();
        info!(message_id, "processing message");

        let event = match self.extractor.extract(message) {
            ExtractionOutcome::Extracted(event) => event,
            ExtractionOutcome::NoBody => {
                info!(message_id, reason = "no_body", "skipping: no plain-text body");
                return (MessageOutcome::Skipped(SkipReason::NoBody), false);
            }
            ExtractionOutcome::NoDate => {
                info!(message_id, reason = "no_date", "skipping: no valid date found");
                return (MessageOutcome::Skipped(SkipReason::NoDate), false);
            }
            ExtractionOutcome::Error(reason) => {
                error!(message_id, error = %reason, "failed to extract event");
                return (MessageOutcome::Failed { reason, attempts: 1 }, false);
            }
        };

        debug!(
            message_id,
            summary = %event.summary,
            start = %event.start,
            location = %event.location,
            "extracted event"
        );

        let event = &event;
        let retried = self
            .options
            .retry
            .execute("schedule event", move || self.schedule(event))
            .await;
        let attempts = retried.attempts;

        match retried.result {
            Ok(Scheduled::Conflict) => {
                warn!(
                    message_id,
                    summary = %event.summary,
                    start = %event.start,
                    "conflict detected, event not created"
                );
                (
                    MessageOutcome::Conflict {
                        summary: event.summary.clone(),
                    },
                    true,
                )
            }
            Ok(Scheduled::Created(Some(link))) => {
                info!(message_id, %link, attempts, "created event");
                (MessageOutcome::Created { link, attempts }, true)
            }
            Ok(Scheduled::Created(None)) => {
                error!(message_id, attempts, "calendar did not create the event");
                (
                    MessageOutcome::Failed {
                        reason: "calendar returned no event link".to_string(),
                        attempts,
                    },
                    true,
                )
            }
            Err(e) => {
                error!(message_id, attempts, error = %e, "failed processing message");
                (
                    MessageOutcome::Failed {
                        reason: e.to_string(),
                        attempts,
                    },
                    false,
                )
            }
        }
    }

    /// Conflict check followed by creation. Deliberate skips return `Ok`.
    async fn schedule(&self, event: &EventRecord) -> MailcalResult<Scheduled> {
        let calendar_id = self.options.calendar_id.as_str();

        let conflict = self
            .bounded(
                "conflict check",
                self.calendar
                    .has_conflict(event.start, self.options.conflict_window, calendar_id),
            )
            .await?;
        if conflict {
            return Ok(Scheduled::Conflict);
        }

        let link = self
            .bounded("create event", self.calendar.create_event(event, calendar_id))
            .await?;

        Ok(Scheduled::Created(link.filter(|l| !l.is_empty())))
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = MailcalResult<T>>,
    ) -> MailcalResult<T> {
        tokio::time::timeout(self.options.call_timeout, call)
            .await
            .map_err(|_| {
                MailcalError::Provider(format!(
                    "{what} timed out after {}s",
                    self.options.call_timeout.as_secs()
                ))
            })?
    }
}
