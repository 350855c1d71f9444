use mailcal_core::EventRecord;

/// Convert to Google API types from mailcal types
pub trait ToGoogle<T> {
    fn to_google(&self) -> T;
}

impl ToGoogle<google_calendar::types::Event> for EventRecord {
    fn to_google(&self) -> google_calendar::types::Event {
        google_calendar::types::Event {
            summary: self.summary.clone(),
            location: self.location.clone(),
            start: Some(utc_to_google(self.start)),
            end: Some(utc_to_google(self.end)),
            ..Default::default()
        }
    }
}

fn utc_to_google(dt: chrono::DateTime<chrono::Utc>) -> google_calendar::types::EventDateTime {
    google_calendar::types::EventDateTime {
        date: None,
        date_time: Some(dt),
        time_zone: "UTC".to_string(),
    }
}
