//! Backend seam shared by the chat orchestrator and the webhook relay.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use counsel_core::Message;

use crate::error::LlmError;

/// A lazy, finite, non-restartable sequence of reply fragments.
///
/// Consuming the full stream yields the complete reply; dropping it early
/// abandons the in-flight request.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Generation backend behind both front doors.
///
/// `history` is the ordered prior conversation; the new user text is passed
/// separately as the current turn. Implementations make at most one provider
/// attempt per call and never retry internally.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a streaming generation request.
    async fn stream_reply(
        &self,
        history: &[Message],
        message: &str,
    ) -> Result<ReplyStream, LlmError>;

    /// Perform one non-streaming request and return the complete reply.
    async fn complete(&self, history: &[Message], message: &str) -> Result<String, LlmError>;
}
