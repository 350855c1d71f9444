//! Finding the event date inside free-form message text.
//!
//! The text is scanned with an ordered list of patterns. The first pattern that
//! matches anywhere decides the result: its first occurrence is parsed, and if
//! that fails the lookup fails. Later patterns are never consulted.

use std::sync::LazyLock;

use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;

const MONTH: &str = "(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*";
const WEEKDAY: &str = "(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)[a-z]*";

/// Most specific first: date with time, then bare dates, then weekday dates.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2} (?:AM|PM)".to_string(),
        r"\d{1,2}-\d{1,2}-\d{4} \d{1,2}:\d{2}".to_string(),
        format!(r"\b{MONTH} \d{{1,2}}, \d{{4}} at \d{{1,2}}:\d{{2}} (?:AM|PM)\b"),
        r"\d{1,2}/\d{1,2}/\d{4}".to_string(),
        r"\d{1,2}-\d{1,2}-\d{4}".to_string(),
        format!(r"\b{WEEKDAY}, \d{{1,2}} {MONTH} \d{{4}}\b"),
    ]
    .iter()
    .map(|src| Regex::new(&format!("(?i){src}")).expect("date pattern must compile"))
    .collect()
});

const MONTHS: [(&str, &str); 12] = [
    ("jan", "january"),
    ("feb", "february"),
    ("mar", "march"),
    ("apr", "april"),
    ("may", "may"),
    ("jun", "june"),
    ("jul", "july"),
    ("aug", "august"),
    ("sep", "september"),
    ("oct", "october"),
    ("nov", "november"),
    ("dec", "december"),
];

const WEEKDAYS: [(&str, &str); 7] = [
    ("mon", "monday"),
    ("tue", "tuesday"),
    ("wed", "wednesday"),
    ("thu", "thursday"),
    ("fri", "friday"),
    ("sat", "saturday"),
    ("sun", "sunday"),
];

/// Locates the first date-like substring in a text and resolves it to an
/// absolute point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateLocator;

impl DateLocator {
    pub fn new() -> Self {
        DateLocator
    }

    /// Find the event date in `text`.
    ///
    /// Naive values are read as wall-clock time in `timezone`. With
    /// `prefer_future`, a wall-clock time that occurs twice (DST fold) resolves
    /// to the later instant.
    pub fn locate(&self, text: &str, timezone: Tz, prefer_future: bool) -> Option<DateTime<Tz>> {
        let matched = DATE_PATTERNS.iter().find_map(|re| re.find(text))?;
        let matched = matched.as_str();

        let Some(naive) = parse_civil(matched) else {
            tracing::debug!(matched, "date-like text did not parse");
            return None;
        };

        let resolved = resolve_local(&timezone, naive, prefer_future);
        if resolved.is_none() {
            tracing::debug!(matched, %timezone, "date does not exist in timezone");
        }
        resolved
    }
}

/// Parse a matched date string into a civil (wall-clock) date and time.
///
/// Understands numeric `M/D/YYYY` and `M-D-YYYY` dates (read day-first when the
/// first field cannot be a month), month and weekday names, `H:MM` times with an
/// optional AM/PM marker, and the connector word "at". Dates without a time
/// resolve to midnight. Any token it does not understand fails the parse.
pub fn parse_civil(text: &str) -> Option<NaiveDateTime> {
    let mut date: Option<NaiveDate> = None;
    let mut month: Option<u32> = None;
    let mut day: Option<u32> = None;
    let mut year: Option<i32> = None;
    let mut clock: Option<(u32, u32)> = None;
    let mut meridiem: Option<bool> = None;

    for token in text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let lower = token.to_lowercase();

        if lower == "at" || is_weekday(&lower) {
            continue;
        }
        if lower == "am" || lower == "pm" {
            meridiem = Some(lower == "pm");
        } else if let Some(m) = month_number(&lower) {
            month = Some(m);
        } else if token.contains('/') || token.contains('-') {
            date = Some(parse_numeric_date(token)?);
        } else if let Some((h, m)) = token.split_once(':') {
            clock = Some((h.parse().ok()?, m.parse().ok()?));
        } else if token.len() == 4 {
            year = Some(token.parse().ok()?);
        } else if token.len() <= 2 {
            day = Some(token.parse().ok()?);
        } else {
            return None;
        }
    }

    let date = match date {
        Some(d) => d,
        None => NaiveDate::from_ymd_opt(year?, month?, day?)?,
    };

    let time = match (clock, meridiem) {
        (None, None) => NaiveTime::from_hms_opt(0, 0, 0)?,
        (None, Some(_)) => return None,
        (Some((h, m)), None) => NaiveTime::from_hms_opt(h, m, 0)?,
        (Some((h, m)), Some(pm)) => {
            if !(1..=12).contains(&h) {
                return None;
            }
            let h = match (h, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            NaiveTime::from_hms_opt(h, m, 0)?
        }
    };

    Some(NaiveDateTime::new(date, time))
}

fn parse_numeric_date(token: &str) -> Option<NaiveDate> {
    let fields: Vec<&str> = token.split(['/', '-']).collect();
    let [first, second, year] = fields.as_slice() else {
        return None;
    };

    let first: u32 = first.parse().ok()?;
    let second: u32 = second.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    NaiveDate::from_ymd_opt(year, first, second).or_else(|| {
        if first > 12 {
            NaiveDate::from_ymd_opt(year, second, first)
        } else {
            None
        }
    })
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|(abbr, full)| token == *abbr || token == *full || (*abbr == "sep" && token == "sept"))
        .map(|i| i as u32 + 1)
}

/// Weekday words are accepted but not checked against the date.
fn is_weekday(token: &str) -> bool {
    WEEKDAYS.iter().any(|(abbr, full)| {
        token == *abbr
            || token == *full
            || matches!((*abbr, token), ("tue", "tues") | ("thu", "thur" | "thurs"))
    })
}

/// Attach a timezone to a wall-clock time.
///
/// Ambiguous times pick the later instant when `prefer_future` is set and the
/// earlier one otherwise. Times skipped by a DST gap move forward by the gap.
fn resolve_local<T: TimeZone>(tz: &T, naive: NaiveDateTime, prefer_future: bool) -> Option<DateTime<T>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, latest) => Some(if prefer_future { latest } else { earliest }),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    }
}
