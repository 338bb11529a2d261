use thiserror::Error;

/// Failures surfaced by the backend adapter.
///
/// `Request` wraps the provider's own failure and always propagates to the
/// caller; no retry happens inside the adapter.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API credential is available.
    #[error("backend not configured: no API credential available")]
    Unconfigured,

    /// Transport or provider failure, at most one attempt per call.
    #[error("backend request failed: {message}")]
    Request {
        status: Option<u16>,
        message: String,
    },

    /// The provider replied but the body was not in the expected shape.
    #[error("backend response parse error: {0}")]
    Parse(String),
}

impl LlmError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        LlmError::Request {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
