//! Error types for mailcal.

use thiserror::Error;

/// Errors that can occur in mailcal operations.
///
/// Messages that cannot be turned into an event are not errors; they are
/// reported through [`crate::extract::ExtractionOutcome`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MailcalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Body decode error: {0}")]
    Decode(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl MailcalError {
    /// Errors returned by mailbox or calendar collaborators. These are the only
    /// ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, MailcalError::Provider(_))
    }
}

/// Result type alias for mailcal operations.
pub type MailcalResult<T> = Result<T, MailcalError>;
