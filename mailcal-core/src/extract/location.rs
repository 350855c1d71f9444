//! Finding where an event takes place.

use std::sync::LazyLock;

use regex::Regex;

/// Returned when the text has no location cue. Events without a venue are
/// assumed to be held online.
pub const DEFAULT_LOCATION: &str = "Online";

/// Labelled cues first, then bare room and building mentions.
static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Location:\s*(.+)",
        r"Where:\s*(.+)",
        r"Venue:\s*(.+)",
        r"(Room\s*\d+)",
        r"(Building\s*\w+)",
    ]
    .iter()
    .map(|src| Regex::new(&format!("(?i){src}")).expect("location pattern must compile"))
    .collect()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct LocationLocator;

impl LocationLocator {
    pub fn new() -> Self {
        LocationLocator
    }

    /// The first location cue in `text`, trimmed, or [`DEFAULT_LOCATION`].
    ///
    /// A labelled cue captures the rest of its line. A cue that matches but
    /// captures only whitespace yields an empty string, not the default.
    pub fn locate(&self, text: &str) -> String {
        LOCATION_PATTERNS
            .iter()
            .find_map(|re| re.captures(text))
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
    }
}
