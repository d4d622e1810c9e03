use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Deserializer};
use snafu::{OptionExt as _, ResultExt as _};

use crate::error::{ApplicationError, ConfigLoadSnafu, MissingSpreadsheetIdSnafu};
use crate::schedule::WeeklyTrigger;

/// Everything read from the environment, collected once at start-up.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_videos_file")]
    pub videos_file: PathBuf,
    /// JSON list of `{"url": ..., "title": ...}` objects, only read by `serve`.
    #[serde(default)]
    pub videos_list: Option<String>,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(rename = "host_address", default = "default_host")]
    pub host: SocketAddr,

    #[serde(default = "default_weekday")]
    pub schedule_weekday: Weekday,
    #[serde(default = "default_time", deserialize_with = "time_of_day")]
    pub schedule_time: NaiveTime,
    #[serde(default = "default_poll_interval", deserialize_with = "human_duration")]
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn spreadsheet_id(&self) -> Result<&str, ApplicationError> {
        self.spreadsheet_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context(MissingSpreadsheetIdSnafu)
    }

    pub fn trigger(&self) -> WeeklyTrigger {
        WeeklyTrigger::new(self.schedule_weekday, self.schedule_time)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
            videos_file: default_videos_file(),
            videos_list: None,
            log_dir: default_log_dir(),
            host: default_host(),
            schedule_weekday: default_weekday(),
            schedule_time: default_time(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_videos_file() -> PathBuf {
    PathBuf::from("videos.txt")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_host() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_weekday() -> Weekday {
    Weekday::Mon
}

fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

/// Accepts `HH:MM` and `HH:MM:SS`.
fn time_of_day<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let text = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M:%S"))
        .map_err(serde::de::Error::custom)
}

/// Accepts humantime durations such as `60s` or `5m`.
fn human_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}
