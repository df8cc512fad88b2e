// File: src/client/telegram.rs
// Notifier backed by the Telegram Bot API (`sendMessage`).
use crate::client::core::{HttpsClient, build_https_client};
use crate::error::DeliveryError;
use crate::notifier::Notifier;
use async_trait::async_trait;
use http::{Request, StatusCode, Uri, header};
use serde::Serialize;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    client: HttpsClient,
    endpoint: Uri,
}

impl TelegramNotifier {
    /// `api_url` is the Bot API base, e.g. `https://api.telegram.org`.
    pub fn new(api_url: &str, token: &str) -> anyhow::Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("Telegram bot token is empty");
        }
        let endpoint: Uri = format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token)
            .parse()
            .map_err(|e: http::uri::InvalidUri| anyhow::anyhow!("Invalid Bot API url: {}", e))?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, subscriber: &str, text: &str) -> Result<(), DeliveryError> {
        let body = serde_json::to_string(&SendMessage {
            chat_id: subscriber,
            text,
        })
        .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let request = Request::post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        // The endpoint embeds the token; never put the error's URL in the log.
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| DeliveryError::Transport(format!("sendMessage failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(DeliveryError::Rejected {
                subscriber: subscriber.to_string(),
                reason: status.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_token() {
        assert!(TelegramNotifier::new("https://api.telegram.org", "  ").is_err());
    }

    #[tokio::test]
    async fn test_endpoint_layout() {
        let n = TelegramNotifier::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(
            n.endpoint.to_string(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }
}
