//! The canonical event produced from a message.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MailcalError, MailcalResult};

/// A calendar event extracted from a message, ready to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
}

impl EventRecord {
    /// Build a record lasting `duration` from `start`. The duration must be positive.
    pub fn new(
        summary: impl Into<String>,
        start: DateTime<Utc>,
        duration: Duration,
        location: impl Into<String>,
    ) -> MailcalResult<Self> {
        if duration <= Duration::zero() {
            return Err(MailcalError::InvalidEvent(format!(
                "duration must be positive, got {} minutes",
                duration.num_minutes()
            )));
        }

        let end = start
            .checked_add_signed(duration)
            .ok_or_else(|| MailcalError::InvalidEvent(format!("end time out of range for {start}")))?;

        Ok(EventRecord {
            summary: summary.into(),
            start,
            end,
            location: location.into(),
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_end_is_start_plus_duration() {
        let start = Utc.with_ymd_and_hms(2025, 12, 25, 15, 0, 0).unwrap();
        let event = EventRecord::new("Party", start, Duration::minutes(90), "Online").unwrap();

        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 12, 25, 16, 30, 0).unwrap());
        assert_eq!(event.duration(), Duration::minutes(90));
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let start = Utc.with_ymd_and_hms(2025, 12, 25, 15, 0, 0).unwrap();
        assert!(EventRecord::new("x", start, Duration::zero(), "Online").is_err());
        assert!(EventRecord::new("x", start, Duration::minutes(-5), "Online").is_err());
    }
}
