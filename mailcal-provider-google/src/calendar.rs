//! Google Calendar adapter: conflict lookups and event creation.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use google_calendar::Client;
use google_calendar::types::{OrderBy, SendUpdates};
use mailcal_core::{CalendarBackend, EventRecord, MailcalResult};
use tracing::debug;

use crate::convert::ToGoogle;
use crate::credentials::Credentials;
use crate::provider_error;

pub struct GoogleCalendar {
    client: Client,
}

impl GoogleCalendar {
    pub fn new(client: Client) -> Self {
        GoogleCalendar { client }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(credentials.calendar_client())
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn has_conflict(
        &self,
        start: DateTime<Utc>,
        window: Duration,
        calendar_id: &str,
    ) -> MailcalResult<bool> {
        let time_min = start.to_rfc3339();
        let time_max = (start + window).to_rfc3339();

        let response = self
            .client
            .events()
            .list_all(
                calendar_id,
                "",
                0,
                OrderBy::default(),
                &[],
                "",
                &[],
                false,
                false,
                true, // expand recurring events into instances
                &time_max,
                &time_min,
                "",
                "",
            )
            .await
            .context("Failed to fetch events")
            .map_err(provider_error)?;

        debug!(%time_min, %time_max, found = response.body.len(), "checked for conflicts");
        Ok(!response.body.is_empty())
    }

    async fn create_event(
        &self,
        event: &EventRecord,
        calendar_id: &str,
    ) -> MailcalResult<Option<String>> {
        let google_event = event.to_google();

        let response = self
            .client
            .events()
            .insert(
                calendar_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &google_event,
            )
            .await
            .with_context(|| format!("Failed to create event: {}", event.summary))
            .map_err(provider_error)?;

        let link = response.body.html_link;
        Ok((!link.is_empty()).then_some(link))
    }
}
