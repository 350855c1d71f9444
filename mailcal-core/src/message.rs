//! Provider-neutral mail message types.
//!
//! Mailbox adapters convert their API responses into these types. The core only
//! ever reads them.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{MailcalError, MailcalResult};

/// A message as fetched from the mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Mailbox-specific message ID
    pub id: String,
    /// Headers in the order the mailbox returned them
    pub headers: Vec<Header>,
    /// Body parts; content is base64url encoded
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub mime_type: String,
    /// base64url encoded content, padding optional
    pub data: String,
}

impl RawMessage {
    /// Value of the first header whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// The first `text/plain` part that carries data.
    pub fn plain_text_part(&self) -> Option<&MessagePart> {
        self.parts
            .iter()
            .find(|p| p.mime_type == "text/plain" && !p.data.is_empty())
    }
}

impl MessagePart {
    /// Decode the part content as UTF-8 text.
    pub fn decode_text(&self) -> MailcalResult<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.data.trim_end_matches('='))
            .map_err(|e| MailcalError::Decode(format!("base64url: {e}")))?;

        String::from_utf8(bytes).map_err(|e| MailcalError::Decode(format!("utf-8: {e}")))
    }
}

/// Which messages a sync run should pick up
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFilter {
    pub sender: String,
    pub unread_only: bool,
}

impl MessageFilter {
    /// Unread messages from `sender`.
    pub fn unread_from(sender: impl Into<String>) -> Self {
        MessageFilter {
            sender: sender.into(),
            unread_only: true,
        }
    }

    /// Render as a Gmail-style search query.
    pub fn to_query(&self) -> String {
        if self.unread_only {
            format!("from:{} is:unread", self.sender)
        } else {
            format!("from:{}", self.sender)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE.encode(text)
    }

    fn message(parts: Vec<MessagePart>) -> RawMessage {
        RawMessage {
            id: "m1".to_string(),
            headers: vec![Header {
                name: "SUBJECT".to_string(),
                value: "Hello".to_string(),
            }],
            parts,
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let msg = message(vec![]);
        assert_eq!(msg.header("subject"), Some("Hello"));
        assert_eq!(msg.header("from"), None);
    }

    #[test]
    fn test_plain_text_part_skips_html_and_empty_parts() {
        let msg = message(vec![
            MessagePart {
                mime_type: "text/html".to_string(),
                data: encode("<p>hi</p>"),
            },
            MessagePart {
                mime_type: "text/plain".to_string(),
                data: String::new(),
            },
            MessagePart {
                mime_type: "text/plain".to_string(),
                data: encode("hi"),
            },
        ]);

        let part = msg.plain_text_part().expect("Should find plain part");
        assert_eq!(part.decode_text().unwrap(), "hi");
    }

    #[test]
    fn test_mime_type_must_match_exactly() {
        let msg = message(vec![MessagePart {
            mime_type: "text/plain; charset=utf-8".to_string(),
            data: encode("hi"),
        }]);
        assert!(msg.plain_text_part().is_none());
    }

    #[test]
    fn test_decode_accepts_padded_and_unpadded() {
        let padded = MessagePart {
            mime_type: "text/plain".to_string(),
            data: encode("ab"),
        };
        assert!(padded.data.ends_with('='));
        assert_eq!(padded.decode_text().unwrap(), "ab");

        let unpadded = MessagePart {
            mime_type: "text/plain".to_string(),
            data: URL_SAFE_NO_PAD.encode("ab"),
        };
        assert_eq!(unpadded.decode_text().unwrap(), "ab");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let part = MessagePart {
            mime_type: "text/plain".to_string(),
            data: URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]),
        };
        assert!(matches!(part.decode_text(), Err(MailcalError::Decode(_))));
    }

    #[test]
    fn test_filter_query() {
        assert_eq!(
            MessageFilter::unread_from("events@example.com").to_query(),
            "from:events@example.com is:unread"
        );
    }
}
