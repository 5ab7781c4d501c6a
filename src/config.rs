//! Process configuration from the environment (`.env` honoured by main).

use chrono::FixedOffset;
use proclubs_api::{MatchType, DEFAULT_BASE_URL, DEFAULT_PLATFORM};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::export::ExportFormat;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub club_id:       String,
    pub match_type:    MatchType,
    pub max_results:   u32,
    pub platform:      String,
    pub base_url:      String,
    pub utc_offset:    FixedOffset,
    pub poll_interval: Duration,
    pub http_timeout:  Duration,
    pub script_url:    String,
    pub history_path:  PathBuf,
    pub log_dir:       PathBuf,
    pub export_dir:    Option<PathBuf>,
    pub export_format: ExportFormat,
    pub run_once:      bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let club_id = get("PROCLUBS_CLUB_ID").ok_or(ConfigError::Missing("PROCLUBS_CLUB_ID"))?;

        let script_url = get("SHEETS_SCRIPT_URL").ok_or(ConfigError::Missing("SHEETS_SCRIPT_URL"))?;
        if !script_url.starts_with("http") {
            return Err(invalid("SHEETS_SCRIPT_URL", "must be an http(s) URL"));
        }

        let match_type = parse_or("PROCLUBS_MATCH_TYPE", get("PROCLUBS_MATCH_TYPE"), MatchType::League)?;

        let max_results: u32 = parse_or("PROCLUBS_MAX_RESULTS", get("PROCLUBS_MAX_RESULTS"), 10)?;
        if max_results == 0 {
            return Err(invalid("PROCLUBS_MAX_RESULTS", "must be at least 1"));
        }

        let offset_hours: i32 = parse_or("PROCLUBS_UTC_OFFSET_HOURS", get("PROCLUBS_UTC_OFFSET_HOURS"), 2)?;
        let utc_offset = (-12..=14)
            .contains(&offset_hours)
            .then(|| FixedOffset::east_opt(offset_hours * 3600))
            .flatten()
            .ok_or_else(|| invalid("PROCLUBS_UTC_OFFSET_HOURS", "must be between -12 and 14"))?;

        let poll_secs: u64 = parse_or("POLL_INTERVAL_SECS", get("POLL_INTERVAL_SECS"), 30)?;
        if poll_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECS", "must be at least 1"));
        }

        let timeout_secs: u64 = parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 10)?;
        if timeout_secs == 0 {
            return Err(invalid("HTTP_TIMEOUT_SECS", "must be at least 1"));
        }

        let export_format = parse_or("EXPORT_FORMAT", get("EXPORT_FORMAT"), ExportFormat::Csv)?;

        let run_once = match get("RUN_ONCE") {
            None => false,
            Some(v) => parse_flag(&v).ok_or_else(|| invalid("RUN_ONCE", "expected true/false"))?,
        };

        Ok(Self {
            club_id,
            match_type,
            max_results,
            platform:      get("PROCLUBS_PLATFORM").unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            base_url:      get("PROCLUBS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            utc_offset,
            poll_interval: Duration::from_secs(poll_secs),
            http_timeout:  Duration::from_secs(timeout_secs),
            script_url,
            history_path:  get("HISTORY_PATH").unwrap_or_else(|| "most_recent_matches.csv".into()).into(),
            log_dir:       get("LOG_DIR").unwrap_or_else(|| "logs".into()).into(),
            export_dir:    get("EXPORT_DIR").map(PathBuf::from),
            export_format,
            run_once,
        })
    }

    /// Single-instance lock file, next to the history file.
    pub fn lock_path(&self) -> PathBuf {
        let mut p = self.history_path.clone().into_os_string();
        p.push(".lock");
        p.into()
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { key, reason: reason.into() }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|e| invalid(key, e.to_string())),
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"  => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
