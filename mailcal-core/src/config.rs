//! Run configuration, read from environment-style variables.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Duration;
use chrono_tz::Tz;
use config::{Config, Environment};
use serde::Deserialize;

use crate::error::{MailcalError, MailcalResult};
use crate::extract::ExtractorSettings;
use crate::message::MessageFilter;

const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_CONFLICT_WINDOW_MINUTES: i64 = 30;
const DEFAULT_EVENT_DURATION_MINUTES: i64 = 60;
const DEFAULT_MAX_RESULTS: usize = 50;
/// Google's alias for the user's main calendar
const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_TOKEN_PATH: &str = "token.json";
const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
const DEFAULT_LOG_FILE: &str = "sync.log";

/// Variables as they appear in the environment. Keys are lowercased by the
/// `config` crate, so `SENDER_EMAIL` lands in `sender_email`.
#[derive(Debug, Deserialize)]
struct RawSettings {
    sender_email: Option<String>,
    timezone: Option<String>,
    conflict_window: Option<i64>,
    event_duration: Option<i64>,
    max_results: Option<usize>,
    calendar_id: Option<String>,
    token_path: Option<String>,
    credentials_path: Option<String>,
    log_file: Option<String>,
}

impl RawSettings {
    fn from_source(source: Environment) -> MailcalResult<Self> {
        Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MailcalError::Config(e.to_string()))
    }

    fn file_paths(&self) -> FilePaths {
        FilePaths {
            token_path: expand(self.token_path.as_deref().unwrap_or(DEFAULT_TOKEN_PATH)),
            credentials_path: expand(
                self.credentials_path
                    .as_deref()
                    .unwrap_or(DEFAULT_CREDENTIALS_PATH),
            ),
            log_file: expand(self.log_file.as_deref().unwrap_or(DEFAULT_LOG_FILE)),
        }
    }
}

/// Files mailcal reads and writes. Available without a full valid
/// configuration, so `auth` and logging setup work before `SENDER_EMAIL` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePaths {
    pub token_path: PathBuf,
    pub credentials_path: PathBuf,
    pub log_file: PathBuf,
}

impl Default for FilePaths {
    fn default() -> Self {
        FilePaths {
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl FilePaths {
    pub fn from_env() -> MailcalResult<Self> {
        Ok(RawSettings::from_source(Environment::default())?.file_paths())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> MailcalResult<Self> {
        let source = Environment::default().source(Some(vars.into_iter().collect()));
        Ok(RawSettings::from_source(source)?.file_paths())
    }
}

/// Validated configuration for a sync run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Only unread mail from this sender is considered
    pub sender_email: String,
    pub timezone: Tz,
    pub conflict_window: Duration,
    pub event_duration: Duration,
    pub max_results: usize,
    pub calendar_id: String,
    pub token_path: PathBuf,
    pub credentials_path: PathBuf,
    pub log_file: PathBuf,
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> MailcalResult<Self> {
        Self::load(Environment::default())
    }

    /// Load from an explicit set of variables instead of the process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> MailcalResult<Self> {
        Self::load(Environment::default().source(Some(vars.into_iter().collect())))
    }

    fn load(source: Environment) -> MailcalResult<Self> {
        let raw = RawSettings::from_source(source)?;
        let files = raw.file_paths();

        let sender_email = raw
            .sender_email
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(MailcalError::MissingConfig("SENDER_EMAIL"))?;

        let timezone_name = raw.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .trim()
            .parse()
            .map_err(|_| MailcalError::Config(format!("Unknown TIMEZONE '{timezone_name}'")))?;

        let conflict_window = positive_minutes(
            "CONFLICT_WINDOW",
            raw.conflict_window.unwrap_or(DEFAULT_CONFLICT_WINDOW_MINUTES),
        )?;
        let event_duration = positive_minutes(
            "EVENT_DURATION",
            raw.event_duration.unwrap_or(DEFAULT_EVENT_DURATION_MINUTES),
        )?;

        let max_results = raw.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 {
            return Err(MailcalError::Config("MAX_RESULTS must be at least 1".into()));
        }

        Ok(Settings {
            sender_email,
            timezone,
            conflict_window,
            event_duration,
            max_results,
            calendar_id: raw
                .calendar_id
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            token_path: files.token_path,
            credentials_path: files.credentials_path,
            log_file: files.log_file,
        })
    }

    pub fn extractor_settings(&self) -> ExtractorSettings {
        ExtractorSettings {
            timezone: self.timezone,
            event_duration: self.event_duration,
        }
    }

    pub fn message_filter(&self) -> MessageFilter {
        MessageFilter::unread_from(&self.sender_email)
    }

    pub fn file_paths(&self) -> FilePaths {
        FilePaths {
            token_path: self.token_path.clone(),
            credentials_path: self.credentials_path.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

fn positive_minutes(key: &str, minutes: i64) -> MailcalResult<Duration> {
    if minutes <= 0 {
        return Err(MailcalError::Config(format!(
            "{key} must be a positive number of minutes, got {minutes}"
        )));
    }
    Ok(Duration::minutes(minutes))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
