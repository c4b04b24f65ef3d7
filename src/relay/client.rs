//! HTTP client for the relay
//!
//! Sessions hand wagers to a [`RelayClient`]. The HTTP implementation posts
//! them to the game routes served by [`super::server::RelayServer`].

use super::{
    errors::RelayError,
    models::{BetSubmission, ErrorResponse, PlayRequest, PlayResponse},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn submit_bet(&self, submission: &BetSubmission) -> Result<PlayResponse, RelayError>;
}

pub struct HttpRelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RelayError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn submit_bet(&self, submission: &BetSubmission) -> Result<PlayResponse, RelayError> {
        let url = format!("{}{}", self.base_url, submission.game().relay_path());
        let body = PlayRequest::from_submission(submission);
        debug!(%url, game = %submission.game(), "posting bet to relay");

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            // Non-JSON error bodies are reported verbatim
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<PlayResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::models::BetParams;

    #[test]
    fn test_base_url_drops_trailing_slash() {
        let client = HttpRelayClient::new("http://127.0.0.1:4000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:4000");
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_transport_error() {
        let client = HttpRelayClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let submission = BetSubmission {
            user_address: "0x0000000000000000000000000000000000000001".to_string(),
            wager: 1.0,
            params: BetParams::Slots,
        };
        let err = client.submit_bet(&submission).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }
}
