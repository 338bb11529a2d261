//! One chat session and its turn state machine.
//!
//! A turn moves through: user message appended, empty bot placeholder
//! appended, fragments streamed into the placeholder, then a terminal
//! state (completed or failed) before the session is idle again. The busy
//! flag gates submissions so no turn begins while another is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;

use counsel_core::persona::{DISCONNECTED_MESSAGE, INITIAL_GREETING, STREAM_FAILURE_MESSAGE};
use counsel_core::Message;
use counsel_llm::ChatBackend;

use crate::voice::{NoSpeech, SpeechSynthesizer};

/// Result of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply streamed to completion.
    Completed,
    /// Setup or streaming failed; the placeholder holds the failure text.
    Failed,
    /// The submission was ignored and the session is unchanged.
    Rejected(RejectReason),
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or whitespace-only input.
    EmptyInput,
    /// A turn is already in flight.
    Busy,
    /// No backend credential is configured.
    Disconnected,
}

/// Clears the busy flag on every exit path, including panics.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// An ordered, in-memory conversation owned by one front end.
///
/// The session dies with its owner; there is no persistence and no
/// cross-session identity.
pub struct ChatSession {
    backend: Option<Arc<dyn ChatBackend>>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    messages: Vec<Message>,
    busy: Arc<AtomicBool>,
    voice_output: bool,
}

impl ChatSession {
    /// Open a session against a configured backend.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: Some(backend),
            synthesizer: Arc::new(NoSpeech),
            messages: vec![Message::bot(INITIAL_GREETING)],
            busy: Arc::new(AtomicBool::new(false)),
            voice_output: false,
        }
    }

    /// Open a session in the degraded no-credential state.
    ///
    /// The session shows a static offline notice and ignores submissions.
    pub fn disconnected() -> Self {
        Self {
            backend: None,
            synthesizer: Arc::new(NoSpeech),
            messages: vec![Message::bot(DISCONNECTED_MESSAGE)],
            busy: Arc::new(AtomicBool::new(false)),
            voice_output: false,
        }
    }

    /// Attach a speech synthesizer for voice output.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Toggle speaking replies aloud after each completed turn.
    pub fn set_voice_output(&mut self, enabled: bool) {
        self.voice_output = enabled;
    }

    pub fn voice_output(&self) -> bool {
        self.voice_output
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Ordered messages of this session, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Text of the most recent bot message.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == counsel_core::Sender::Bot)
            .map(|m| m.text.as_str())
    }

    /// Drop the conversation and return to the initial state.
    pub fn clear(&mut self) {
        let initial = if self.backend.is_some() {
            INITIAL_GREETING
        } else {
            DISCONNECTED_MESSAGE
        };
        self.messages = vec![Message::bot(initial)];
    }

    /// Run one conversation turn.
    ///
    /// Appends exactly one user message and one bot message, streams the
    /// reply into the bot placeholder by full-string replacement, and never
    /// lets a backend failure escape: the placeholder ends up holding either
    /// the complete reply or the fixed failure text.
    pub async fn submit(&mut self, text: &str) -> TurnOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return TurnOutcome::Rejected(RejectReason::EmptyInput);
        }
        let Some(backend) = self.backend.clone() else {
            return TurnOutcome::Rejected(RejectReason::Disconnected);
        };
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return TurnOutcome::Rejected(RejectReason::Busy);
        };

        self.messages.push(Message::user(trimmed));
        let placeholder = self.messages.len();
        self.messages.push(Message::bot(""));

        // History for the request excludes the turn being submitted.
        let history: Vec<Message> = self.messages[..placeholder - 1].to_vec();

        let outcome = self
            .stream_into_placeholder(backend.as_ref(), &history, trimmed, placeholder)
            .await;

        if outcome == TurnOutcome::Completed {
            self.speak_reply(placeholder);
        }
        outcome
    }

    async fn stream_into_placeholder(
        &mut self,
        backend: &dyn ChatBackend,
        history: &[Message],
        text: &str,
        placeholder: usize,
    ) -> TurnOutcome {
        let mut stream = match backend.stream_reply(history, text).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "failed to open reply stream");
                self.messages[placeholder].text = STREAM_FAILURE_MESSAGE.to_string();
                return TurnOutcome::Failed;
            }
        };

        let mut accumulated = String::new();
        while let Some(fragment) = stream.next().await {
            match fragment {
                Ok(fragment) => {
                    accumulated.push_str(&fragment);
                    // Full-string replacement: re-applying the same
                    // cumulative value is a no-op, so late renders converge.
                    self.messages[placeholder].text = accumulated.clone();
                }
                Err(err) => {
                    tracing::error!(error = %err, "reply stream failed mid-turn");
                    self.messages[placeholder].text = STREAM_FAILURE_MESSAGE.to_string();
                    return TurnOutcome::Failed;
                }
            }
        }

        TurnOutcome::Completed
    }

    /// Speak the finalized reply when voice output is on. Speech is best
    /// effort and never alters message state.
    fn speak_reply(&self, placeholder: usize) {
        if !self.voice_output || !self.synthesizer.is_available() {
            return;
        }
        let text = &self.messages[placeholder].text;
        if text.is_empty() {
            return;
        }
        if let Err(err) = self.synthesizer.speak(text) {
            tracing::warn!(error = %err, "voice output failed");
        }
    }

    #[cfg(test)]
    pub(crate) fn busy_handle(&self) -> Arc<AtomicBool> {
        self.busy.clone()
    }
}
