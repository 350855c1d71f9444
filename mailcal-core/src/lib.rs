//! Core of mailcal: turning announcement emails into calendar events.
//!
//! This crate holds everything that does not talk to a service:
//! - `message` and `event` types shared with the provider adapters
//! - `extract` for finding the date, location and title in a message
//! - `sync` for driving extraction, conflict checks and creation over a batch
//! - `provider` traits the adapters implement

pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod message;
pub mod provider;
pub mod retry;
pub mod sync;

pub use config::{FilePaths, Settings};
pub use error::{MailcalError, MailcalResult};
pub use event::EventRecord;
pub use extract::{EventExtractor, ExtractionOutcome, ExtractorSettings};
pub use message::{Header, MessageFilter, MessagePart, RawMessage};
pub use provider::{CalendarBackend, Mailbox};
pub use retry::RetryPolicy;
pub use sync::{MessageOutcome, SkipReason, SyncOptions, SyncOrchestrator, SyncReport};
