use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scraping::RetryPolicy;
use crate::utils;

pub const DEFAULT_EVENTBRITE_URL: &str =
    "https://www.eventbrite.com/d/united-kingdom--london/tech-conferences/";
pub const DEFAULT_EVENTBRITE_API_URL: &str =
    "https://www.eventbrite.co.uk/api/v3/destination/events/";
pub const DEFAULT_MEETUP_URL: &str =
    "https://www.meetup.com/find/?location=gb--17--London&source=EVENTS&keywords=tech%20networking";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0:?}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to write config {0:?}: {1}")]
    Write(PathBuf, #[source] std::io::Error),
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid reference date {0:?}, expected YYYY-MM-DD")]
    ReferenceDate(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub eventbrite_url: String,
    pub eventbrite_api_url: String,
    pub meetup_url: String,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub tag_map_path: Option<PathBuf>,
    pub location_map_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    /// Fixes the date used to infer missing years; today when unset.
    pub reference_date: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            eventbrite_url: DEFAULT_EVENTBRITE_URL.to_string(),
            eventbrite_api_url: DEFAULT_EVENTBRITE_API_URL.to_string(),
            meetup_url: DEFAULT_MEETUP_URL.to_string(),
            retry_attempts: 3,
            retry_delay_ms: 3000,
            tag_map_path: None,
            location_map_path: None,
            database_path: None,
            output_path: None,
            reference_date: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        utils::ensure_parent(path);
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|err| ConfigError::Write(path.to_path_buf(), err))
    }

    /// `EVENTS_DB_PATH` and `EVENTS_REFERENCE_DATE` override the file.
    pub fn apply_env(mut self) -> Self {
        if let Ok(path) = std::env::var("EVENTS_DB_PATH") {
            if !path.trim().is_empty() {
                self.database_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(date) = std::env::var("EVENTS_REFERENCE_DATE") {
            if !date.trim().is_empty() {
                self.reference_date = Some(date);
            }
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts.max(1),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn reference_date(&self) -> Result<NaiveDate, ConfigError> {
        match self.reference_date.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| ConfigError::ReferenceDate(text.to_string())),
            _ => Ok(Local::now().date_naive()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = AppConfig::load(&dir.path().join("absent.json")).expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"retry_attempts": 5, "reference_date": "2025-12-20"}"#)
            .expect("write config");

        let config = AppConfig::load(&path).expect("load");
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.meetup_url, DEFAULT_MEETUP_URL);
        assert_eq!(
            config.reference_date().expect("date"),
            NaiveDate::from_ymd_opt(2025, 12, 20).expect("valid date")
        );
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            output_path: Some(PathBuf::from("events.json")),
            ..AppConfig::default()
        };
        config.save(&path).expect("save");
        assert_eq!(AppConfig::load(&path).expect("load"), config);
    }

    #[test]
    fn rejects_bad_reference_dates() {
        let config = AppConfig {
            reference_date: Some("20/12/2025".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.reference_date(),
            Err(ConfigError::ReferenceDate(_))
        ));
    }
}
