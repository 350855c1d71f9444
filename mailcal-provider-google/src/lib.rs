//! Google adapters for mailcal: Gmail as the mailbox, Google Calendar as the
//! calendar backend, plus the OAuth credentials both share.

pub mod calendar;
pub mod convert;
pub mod credentials;
pub mod gmail;

pub use calendar::GoogleCalendar;
pub use credentials::{ClientSecrets, Credentials, SCOPES};
pub use gmail::GmailMailbox;

use mailcal_core::MailcalError;

/// Service failures surface to the core as retryable provider errors
pub(crate) fn provider_error(err: anyhow::Error) -> MailcalError {
    MailcalError::Provider(format!("{err:#}"))
}
