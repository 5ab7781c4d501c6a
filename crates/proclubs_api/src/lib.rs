/// ProClubs Tracker: Pro Clubs API client
///
/// Read-only client for the EA Sports FC Pro Clubs endpoints:
///   GET {base}/clubs/matches?platform=..&clubIds=..&matchType=..&maxResultCount=..
///   GET {base}/clubs/info?platform=..&clubIds=..
///
/// Match records are returned raw; shaping them is the parser's job.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://proclubs.ea.com/api/fc";
pub const DEFAULT_PLATFORM: &str = "common-gen5";

// Endpoint odmítá requesty bez prohlížečového user-agenta
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unexpected envelope: {0}")]
    Envelope(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

// ── Match type filter ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    League,
    Friendly,
    Playoff,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::League   => "leagueMatch",
            MatchType::Friendly => "friendlyMatch",
            MatchType::Playoff  => "playoffMatch",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "leagueMatch" | "league"     => Ok(MatchType::League),
            "friendlyMatch" | "friendly" => Ok(MatchType::Friendly),
            "playoffMatch" | "playoff"   => Ok(MatchType::Playoff),
            other => Err(format!(
                "unknown match type {other:?} (expected leagueMatch, friendlyMatch or playoffMatch)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClubInfo {
    pub club_id: String,
    pub name:    String,
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct ProClubsClient {
    client:   reqwest::Client,
    base_url: String,
    platform: String,
}

impl ProClubsClient {
    pub fn new(base_url: impl Into<String>, platform: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            platform: platform.into(),
        })
    }

    /// Relative endpoints hang off the base URL, absolute ones pass through.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn get_text(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String> {
        let url = self.url(endpoint);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            warn!("Pro Clubs API {url} status {status}: {snippet}");
            return Err(ApiError::Api { status: status.as_u16(), message: snippet });
        }

        let raw = resp.text().await?;
        debug!("Pro Clubs API {url} raw (first 300): {}", raw.chars().take(300).collect::<String>());
        Ok(raw)
    }

    /// Latest matches of `club_id`, most recent first, as raw records.
    pub async fn fetch_matches(&self, club_id: &str, match_type: MatchType, limit: u32) -> Result<Vec<Value>> {
        let query = [
            ("platform", self.platform.clone()),
            ("clubIds", club_id.to_string()),
            ("matchType", match_type.as_str().to_string()),
            ("maxResultCount", limit.to_string()),
        ];
        let raw = self.get_text("clubs/matches", &query).await?;
        parse_matches_envelope(&raw)
    }

    pub async fn fetch_club_info(&self, club_id: &str) -> Result<Option<ClubInfo>> {
        let query = [
            ("platform", self.platform.clone()),
            ("clubIds", club_id.to_string()),
        ];
        let raw = self.get_text("clubs/info", &query).await?;
        parse_club_info(&raw, club_id)
    }
}

/// The matches endpoint answers with a JSON array; `null` means no matches.
pub fn parse_matches_envelope(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::Envelope(format!(
            "expected an array of matches, got {}",
            kind_of(&other)
        ))),
    }
}

/// `clubs/info` is keyed by club id: `{"3439844": {"name": "...", ...}}`.
pub fn parse_club_info(raw: &str, club_id: &str) -> Result<Option<ClubInfo>> {
    let data: Value = serde_json::from_str(raw)?;
    let Some(club) = data.get(club_id) else {
        return Ok(None);
    };
    let name = club
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    Ok(Some(ClubInfo { club_id: club_id.to_string(), name }))
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}
