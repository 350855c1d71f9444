//! Gmail REST adapter: lists matching messages and fetches them in full.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use mailcal_core::{Header, Mailbox, MailcalResult, MessageFilter, MessagePart, RawMessage};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider_error;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Gmail caps `maxResults` on a list call at this
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct GmailMessageList {
    messages: Option<Vec<GmailMessageStub>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    payload: Option<GmailPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct GmailPayload {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPayload>>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

impl GmailPayload {
    fn to_part(&self) -> MessagePart {
        MessagePart {
            mime_type: self.mime_type.clone().unwrap_or_default(),
            data: self
                .body
                .as_ref()
                .and_then(|b| b.data.clone())
                .unwrap_or_default(),
        }
    }
}

impl From<GmailMessage> for RawMessage {
    fn from(message: GmailMessage) -> Self {
        let payload = message.payload.unwrap_or_default();

        let headers = payload
            .headers
            .iter()
            .flatten()
            .map(|h| Header {
                name: h.name.clone(),
                value: h.value.clone(),
            })
            .collect();

        // Single-part messages carry the body on the payload itself
        let parts = match payload.parts.as_deref() {
            Some(parts) if !parts.is_empty() => parts.iter().map(GmailPayload::to_part).collect(),
            _ => vec![payload.to_part()],
        };

        RawMessage {
            id: message.id,
            headers,
            parts,
        }
    }
}

pub struct GmailMailbox {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GmailMailbox {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, GMAIL_API_BASE)
    }

    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        GmailMailbox {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("gmail api request: {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("read gmail api response body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "gmail api request failed: status={} body={}",
                status,
                body
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("decode gmail response from {url}"))
    }

    async fn list_message_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base_url);
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < max_results {
            let page_size = (max_results - ids.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![("q", query.to_string()), ("maxResults", page_size.to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: GmailMessageList = self.get(&url, &params).await?;
            ids.extend(page.messages.into_iter().flatten().map(|m| m.id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        ids.truncate(max_results);
        Ok(ids)
    }

    async fn get_message(&self, message_id: &str) -> Result<GmailMessage> {
        let url = format!("{}/users/me/messages/{}", self.base_url, message_id);
        self.get(&url, &[("format", "full".to_string())]).await
    }

    async fn fetch(&self, filter: &MessageFilter, max_results: usize) -> Result<Vec<RawMessage>> {
        let query = filter.to_query();
        let ids = self.list_message_ids(&query, max_results).await?;
        debug!(%query, count = ids.len(), "listed messages");

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_message(&id).await {
                Ok(message) => messages.push(message.into()),
                Err(e) => warn!(message_id = %id, error = %format!("{e:#}"), "skipping message that could not be fetched"),
            }
        }

        Ok(messages)
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_messages(
        &self,
        filter: &MessageFilter,
        max_results: usize,
    ) -> MailcalResult<Vec<RawMessage>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        self.fetch(filter, max_results).await.map_err(provider_error)
    }
}
