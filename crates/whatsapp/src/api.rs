//! Cloud API client for sending messages.
//!
//! Wraps the `/{phone_number_id}/messages` endpoint with bearer token auth.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::RelayError;

/// WhatsApp Cloud API send client.
#[derive(Clone)]
pub struct CloudApiClient {
    client: reqwest::Client,
    token: String,
    phone_number_id: String,
    base_url: String,
}

/// Response from the send endpoint.
#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: Option<String>,
}

/// Receipt confirming a message was accepted by the platform.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub to: String,
    pub message_id: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

impl CloudApiClient {
    pub fn new(
        token: &str,
        phone_number_id: &str,
        base_url: &str,
    ) -> Result<Self, RelayError> {
        if token.is_empty() {
            return Err(RelayError::Config("send token cannot be empty".to_string()));
        }
        if phone_number_id.is_empty() {
            return Err(RelayError::Config(
                "phone number id cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| RelayError::Internal(format!("HTTP client init: {}", e)))?;

        Ok(Self {
            client,
            token: token.to_string(),
            phone_number_id: phone_number_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Push one text message to a recipient.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<SendReceipt, RelayError> {
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "text": { "body": body },
        });

        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::SendFailed(format!("send request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError::SendFailed(format!(
                "send rejected ({}): {}",
                status, text
            )));
        }

        let parsed: SendResponse = resp
            .json()
            .await
            .map_err(|e| RelayError::ParseError(format!("send response parse: {}", e)))?;

        Ok(SendReceipt {
            to: to.to_string(),
            message_id: parsed.messages.into_iter().next().and_then(|m| m.id),
            delivered_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_rejected() {
        let result = CloudApiClient::new("", "12345", "https://graph.facebook.com/v20.0");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn empty_phone_id_rejected() {
        let result = CloudApiClient::new("token", "", "https://graph.facebook.com/v20.0");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn trailing_slash_normalized() {
        let client = CloudApiClient::new("token", "12345", "http://localhost:9/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9");
    }

    #[test]
    fn send_response_deserialization() {
        let json = r#"{"messaging_product":"whatsapp","contacts":[{"wa_id":"15551234567"}],"messages":[{"id":"wamid.HBgL"}]}"#;
        let resp: SendResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.messages[0].id.as_deref(), Some("wamid.HBgL"));
    }

    #[test]
    fn send_response_without_messages() {
        let resp: SendResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.messages.is_empty());
    }
}
