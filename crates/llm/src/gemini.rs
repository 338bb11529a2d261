//! Client for the Google Generative Language REST API.
//!
//! Speaks `generateContent` for single-shot replies and
//! `streamGenerateContent?alt=sse` for streamed replies. Every request
//! carries the static system instruction plus the role-tagged history.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use counsel_core::config::{self, DEFAULT_MODEL};
use counsel_core::persona::SYSTEM_INSTRUCTION;
use counsel_core::Message;

use crate::backend::{ChatBackend, ReplyStream};
use crate::error::LlmError;
use crate::sse;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client.
///
/// Cheap to clone; construct once from configuration and share.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    system_instruction: String,
}

impl GeminiClient {
    /// Create a client with an explicit credential and model.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Unconfigured);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::Request {
                status: None,
                message: format!("HTTP client init: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: BASE_URL.to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        })
    }

    /// Build a client from the environment.
    ///
    /// Returns `None` when `GOOGLE_API_KEY` is unset so callers choose their
    /// own degradation: the chat path opens disconnected, the relay aborts.
    pub fn from_env() -> Option<Self> {
        let Some(api_key) = config::non_empty_env(config::GOOGLE_API_KEY) else {
            tracing::info!("GOOGLE_API_KEY not set, generation backend disabled");
            return None;
        };
        let model = config::env_or(config::GEMINI_MODEL, DEFAULT_MODEL);
        let client = Self::new(api_key, model).ok()?;
        tracing::info!(model = %client.model, "Gemini client initialized");
        Some(client)
    }

    /// Override the API base URL (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the default system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Model identifier this client sends requests for.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, history: &[Message], message: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|msg| Content {
                role: msg.sender.as_role().to_string(),
                parts: vec![Part {
                    text: msg.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: message.to_string(),
            }],
        });

        GenerateContentRequest {
            contents,
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            }),
        }
    }

    fn endpoint(&self, method: &str, query: &str) -> String {
        format!(
            "{}/{}:{}?{}key={}",
            self.base_url, self.model, method, query, self.api_key
        )
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn stream_reply(
        &self,
        history: &[Message],
        message: &str,
    ) -> Result<ReplyStream, LlmError> {
        let url = self.endpoint("streamGenerateContent", "alt=sse&");
        let body = self.build_request(history, message);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), text));
        }

        Ok(Box::pin(sse::fragment_stream(response.bytes_stream())))
    }

    async fn complete(&self, history: &[Message], message: &str) -> Result<String, LlmError> {
        let url = self.endpoint("generateContent", "");
        let body = self.build_request(history, message);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("malformed response body: {}", e)))?;

        let text = parsed.text();
        if text.is_empty() {
            return Err(LlmError::Parse(
                "no text in response candidates".to_string(),
            ));
        }

        tracing::info!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            reply_len = text.len(),
            "generation completed"
        );
        Ok(text)
    }
}

/// Map a non-2xx provider response to an adapter error.
///
/// The provider wraps failures as `{"error": {"message", "status"}}`; fall
/// back to the raw body when that shape is absent.
fn error_from_response(status: u16, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{}: {}", status_text, msg)
            }
        })
        .unwrap_or(body);

    LlmError::Request {
        status: Some(status),
        message,
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub(crate) fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::Message;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", "gemini-2.5-flash")
            .unwrap()
            .with_system_instruction("You are a test persona.")
    }

    #[test]
    fn request_maps_history_roles() {
        let history = vec![Message::user("hi"), Message::bot("hello!")];
        let request = client().build_request(&history, "next question");
        let json = serde_json::to_value(&request).unwrap();

        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "next question");
    }

    #[test]
    fn request_carries_system_instruction() {
        let request = client().build_request(&[], "hello");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a test persona."
        );
    }

    #[test]
    fn endpoint_includes_model_and_key() {
        let url = client().endpoint("generateContent", "");
        assert!(url.contains("/gemini-2.5-flash:generateContent?key=test-key"));

        let stream_url = client().endpoint("streamGenerateContent", "alt=sse&");
        assert!(stream_url.contains(":streamGenerateContent?alt=sse&key=test-key"));
    }

    #[test]
    fn response_text_concatenates_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text(), "Hello world");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn provider_error_body_is_unwrapped() {
        let body = r#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = error_from_response(429, body.to_string());
        match err {
            LlmError::Request { status, message } => {
                assert_eq!(status, Some(429));
                assert!(message.contains("RESOURCE_EXHAUSTED"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("expected Request, got: {:?}", other),
        }
    }

    #[test]
    fn opaque_error_body_passed_through() {
        let err = error_from_response(500, "upstream blew up".to_string());
        match err {
            LlmError::Request { message, .. } => assert_eq!(message, "upstream blew up"),
            other => panic!("expected Request, got: {:?}", other),
        }
    }

    #[test]
    fn empty_credential_rejected() {
        let result = GeminiClient::new("   ", "gemini-2.5-flash");
        assert!(matches!(result, Err(LlmError::Unconfigured)));
    }

    #[test]
    fn from_env_none_without_credential() {
        std::env::remove_var(counsel_core::config::GOOGLE_API_KEY);
        assert!(GeminiClient::from_env().is_none());
    }
}
