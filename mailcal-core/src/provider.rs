//! Interfaces to the mailbox and calendar services.
//!
//! The core never talks to a service directly. Implementations are handed to
//! the sync pipeline by the caller, which lets tests substitute in-memory
//! fakes. Any error an implementation returns is treated as transient.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::MailcalResult;
use crate::event::EventRecord;
use crate::message::{MessageFilter, RawMessage};

/// Source of messages to scan for events
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Fetch up to `max_results` messages matching `filter`, following
    /// pagination internally.
    async fn list_messages(
        &self,
        filter: &MessageFilter,
        max_results: usize,
    ) -> MailcalResult<Vec<RawMessage>>;
}

/// Calendar that events are written to
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Whether any existing event overlaps `[start, start + window)`.
    async fn has_conflict(
        &self,
        start: DateTime<Utc>,
        window: Duration,
        calendar_id: &str,
    ) -> MailcalResult<bool>;

    /// Insert `event` and return a link to it. `None` means the service
    /// accepted the call but did not create anything.
    async fn create_event(
        &self,
        event: &EventRecord,
        calendar_id: &str,
    ) -> MailcalResult<Option<String>>;
}
