use thiserror::Error;

use counsel_llm::LlmError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("payload parse error: {0}")]
    ParseError(String),

    #[error("message send failed: {0}")]
    SendFailed(String),

    #[error("backend request failed: {0}")]
    Backend(#[from] LlmError),

    #[error("relay already running")]
    AlreadyRunning,

    #[error("relay not running")]
    NotRunning,

    #[error("internal error: {0}")]
    Internal(String),
}
