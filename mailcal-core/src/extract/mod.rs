//! Turning a raw message into an [`EventRecord`].

mod date;
mod location;

use std::sync::LazyLock;

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::MailcalResult;
use crate::event::EventRecord;
use crate::message::RawMessage;

pub use date::{DateLocator, parse_civil};
pub use location::{DEFAULT_LOCATION, LocationLocator};

/// Summary used when a message has no usable subject
pub const UNTITLED_EVENT: &str = "Untitled Event";

static REPLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Re|Fw):\s*").expect("reply prefix pattern must compile"));

/// What extraction produced for one message
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(EventRecord),
    /// No non-empty `text/plain` part
    NoBody,
    /// The body has no recognizable date
    NoDate,
    Error(String),
}

/// Settings the extractor needs from the run configuration
#[derive(Debug, Clone, Copy)]
pub struct ExtractorSettings {
    /// Zone used to read dates that carry no offset
    pub timezone: Tz,
    pub event_duration: Duration,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        ExtractorSettings {
            timezone: Tz::UTC,
            event_duration: Duration::minutes(60),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventExtractor {
    settings: ExtractorSettings,
    dates: DateLocator,
    locations: LocationLocator,
}

impl EventExtractor {
    pub fn new(settings: ExtractorSettings) -> Self {
        EventExtractor {
            settings,
            dates: DateLocator::new(),
            locations: LocationLocator::new(),
        }
    }

    pub fn settings(&self) -> &ExtractorSettings {
        &self.settings
    }

    /// Extract the event announced in `message`. Never fails; every problem is
    /// reported as an [`ExtractionOutcome`] variant.
    pub fn extract(&self, message: &RawMessage) -> ExtractionOutcome {
        match self.try_extract(message) {
            Ok(outcome) => outcome,
            Err(e) => ExtractionOutcome::Error(e.to_string()),
        }
    }

    fn try_extract(&self, message: &RawMessage) -> MailcalResult<ExtractionOutcome> {
        let Some(part) = message.plain_text_part() else {
            return Ok(ExtractionOutcome::NoBody);
        };
        let body = part.decode_text()?;

        let subject = message
            .header("subject")
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED_EVENT);

        let Some(start) = self.dates.locate(&body, self.settings.timezone, true) else {
            return Ok(ExtractionOutcome::NoDate);
        };

        let location = self.locations.locate(&body);

        let mut summary = clean_subject(subject);
        if summary.is_empty() {
            summary = UNTITLED_EVENT.to_string();
        }

        let event = EventRecord::new(
            summary,
            start.with_timezone(&Utc),
            self.settings.event_duration,
            collapse_whitespace(&location),
        )?;

        Ok(ExtractionOutcome::Extracted(event))
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and drop one leading `Re:` or `Fw:` marker.
pub fn clean_subject(subject: &str) -> String {
    let collapsed = collapse_whitespace(subject);
    REPLY_PREFIX.replace(&collapsed, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Header, MessagePart};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE;
    use chrono::TimeZone;

    fn message(subject: Option<&str>, body: Option<&str>) -> RawMessage {
        RawMessage {
            id: "msg-1".to_string(),
            headers: subject
                .map(|s| {
                    vec![
                        Header {
                            name: "From".to_string(),
                            value: "events@example.com".to_string(),
                        },
                        Header {
                            name: "Subject".to_string(),
                            value: s.to_string(),
                        },
                    ]
                })
                .unwrap_or_default(),
            parts: body
                .map(|b| {
                    vec![MessagePart {
                        mime_type: "text/plain".to_string(),
                        data: URL_SAFE.encode(b),
                    }]
                })
                .unwrap_or_default(),
        }
    }

    fn extracted(outcome: ExtractionOutcome) -> EventRecord {
        match outcome {
            ExtractionOutcome::Extracted(event) => event,
            other => panic!("Expected Extracted, got {:?}", other),
        }
    }

    #[test]
    fn test_extracts_full_event() {
        let msg = message(
            Some("Re:   Team   Sync"),
            Some("Meeting on 12/25/2025 3:00 PM\nLocation: Room 204\n"),
        );
        let event = extracted(EventExtractor::default().extract(&msg));

        assert_eq!(event.summary, "Team Sync");
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 12, 25, 15, 0, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 12, 25, 16, 0, 0).unwrap());
        assert_eq!(event.location, "Room 204");
    }

    #[test]
    fn test_no_body() {
        let msg = message(Some("Hi"), None);
        assert_eq!(EventExtractor::default().extract(&msg), ExtractionOutcome::NoBody);
    }

    #[test]
    fn test_no_date() {
        let msg = message(Some("Hi"), Some("No dates in here, Location: Room 9"));
        assert_eq!(EventExtractor::default().extract(&msg), ExtractionOutcome::NoDate);
    }

    #[test]
    fn test_undecodable_body_is_error() {
        let mut msg = message(Some("Hi"), Some("x"));
        msg.parts[0].data = "!!not base64!!".to_string();

        assert!(matches!(
            EventExtractor::default().extract(&msg),
            ExtractionOutcome::Error(_)
        ));
    }

    #[test]
    fn test_missing_or_empty_subject_is_untitled() {
        let event = extracted(EventExtractor::default().extract(&message(None, Some("1/2/2026"))));
        assert_eq!(event.summary, UNTITLED_EVENT);

        let event = extracted(EventExtractor::default().extract(&message(Some(""), Some("1/2/2026"))));
        assert_eq!(event.summary, UNTITLED_EVENT);

        let event = extracted(EventExtractor::default().extract(&message(Some("Re:"), Some("1/2/2026"))));
        assert_eq!(event.summary, UNTITLED_EVENT);
    }

    #[test]
    fn test_default_location_and_configured_duration() {
        let extractor = EventExtractor::new(ExtractorSettings {
            timezone: "Europe/Berlin".parse().unwrap(),
            event_duration: Duration::minutes(45),
        });
        let event = extracted(extractor.extract(&message(Some("Fw: Demo"), Some("Demo 03-02-2026 10:00"))));

        assert_eq!(event.summary, "Demo");
        assert_eq!(event.location, DEFAULT_LOCATION);
        assert_eq!(event.start, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        assert_eq!(event.end - event.start, Duration::minutes(45));
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let msg = message(Some("Lunch"), Some("Lunch on Jan 9, 2026 at 12:30 PM. Where: Cafe  Nero"));
        let extractor = EventExtractor::default();

        let first = extracted(extractor.extract(&msg));
        let second = extracted(extractor.extract(&msg));
        assert_eq!(first, second);
        assert_eq!(first.location, "Cafe Nero");
    }

    #[test]
    fn test_clean_subject() {
        assert_eq!(clean_subject("Re: Team Sync"), "Team Sync");
        assert_eq!(clean_subject("FW:Quarterly  review "), "Quarterly review");
        assert_eq!(clean_subject("  re:\tPlanning\n"), "Planning");
        // Only one prefix is removed.
        assert_eq!(clean_subject("Re: Fw: Offsite"), "Fw: Offsite");
        // Not a prefix when it is not at the start.
        assert_eq!(clean_subject("Reminder: Re: x"), "Reminder: Re: x");
    }
}
