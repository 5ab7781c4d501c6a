/// ProClubs Tracker: Sheets Sink
/// One plain-text POST per fact to a Google Apps Script `doPost` deployment.

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid script url {0:?}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sink rejected payload (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;

pub struct SheetsSink {
    client:     reqwest::Client,
    script_url: String,
}

impl SheetsSink {
    pub fn new(script_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let script_url = script_url.into();
        if !script_url.starts_with("http") {
            return Err(SinkError::InvalidUrl(script_url));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self { client, script_url })
    }

    /// Posts `payload` as the request body; returns the script's reply text.
    pub async fn send(&self, payload: &str) -> Result<String> {
        let resp = self.client
            .post(&self.script_url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(payload.to_string())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status:  status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        debug!("Sheets sink accepted {:?}: {}", payload, body);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_url() {
        assert!(matches!(
            SheetsSink::new("script.google.com/exec", Duration::from_secs(1)),
            Err(SinkError::InvalidUrl(_))
        ));
        assert!(SheetsSink::new("https://script.google.com/macros/s/abc/exec", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn unreachable_sink_is_a_network_error() {
        // Grab a free port, then release it so nothing is listening there
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let sink = SheetsSink::new(format!("http://127.0.0.1:{port}/exec"), Duration::from_secs(2)).unwrap();
        assert!(matches!(sink.send("Alice Goals 2").await, Err(SinkError::Network(_))));
    }
}
