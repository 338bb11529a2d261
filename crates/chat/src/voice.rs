//! Speech capability adapters.
//!
//! Recognition and synthesis are platform capabilities probed at runtime.
//! Recognition is modeled as an explicit request: `start()` hands back a
//! [`ListeningSession`] whose transcript resolves once for a single
//! utterance, instead of a tangle of event callbacks. Implementations that
//! lack the capability report unavailable and reject starts.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{oneshot, watch};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech capability unavailable")]
    Unavailable,

    #[error("recognition already active")]
    AlreadyListening,

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

/// Speech-to-text capability.
pub trait SpeechRecognizer: Send + Sync {
    /// Whether the platform offers recognition at all.
    fn is_available(&self) -> bool;

    /// Begin listening for one utterance.
    ///
    /// The recognizer stops itself after one completed utterance or on
    /// error; the returned session resolves exactly once either way.
    fn start(&self) -> Result<ListeningSession, SpeechError>;
}

/// Text-to-speech capability.
///
/// At most one utterance is in progress at a time; `speak` replaces any
/// utterance already playing.
pub trait SpeechSynthesizer: Send + Sync {
    fn is_available(&self) -> bool;

    fn speak(&self, text: &str) -> Result<(), SpeechError>;

    fn cancel(&self);

    fn is_speaking(&self) -> bool;
}

/// Consumer half of one in-progress recognition.
pub struct ListeningSession {
    stop_tx: watch::Sender<bool>,
    transcript_rx: oneshot::Receiver<Result<String, SpeechError>>,
}

impl ListeningSession {
    /// Create a linked producer/consumer pair.
    ///
    /// Recognizer implementations hand the [`ListeningProducer`] to whatever
    /// drives the platform API and return the session to the caller.
    pub fn channel() -> (ListeningProducer, ListeningSession) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (transcript_tx, transcript_rx) = oneshot::channel();
        (
            ListeningProducer {
                stop_rx,
                transcript_tx,
            },
            ListeningSession {
                stop_tx,
                transcript_rx,
            },
        )
    }

    /// Request that listening end early. The transcript future still
    /// resolves (with whatever was captured, or an error).
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Resolve to the final transcript of the utterance.
    pub async fn transcript(self) -> Result<String, SpeechError> {
        self.transcript_rx
            .await
            .map_err(|_| SpeechError::Recognition("recognizer went away".to_string()))?
    }
}

/// Producer half held by a recognizer implementation.
pub struct ListeningProducer {
    stop_rx: watch::Receiver<bool>,
    transcript_tx: oneshot::Sender<Result<String, SpeechError>>,
}

impl ListeningProducer {
    /// Whether the consumer asked to stop early.
    pub fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Wait until the consumer asks to stop.
    pub async fn stopped(&mut self) {
        while !*self.stop_rx.borrow() {
            if self.stop_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Deliver the single-shot result, consuming the producer.
    pub fn finish(self, result: Result<String, SpeechError>) {
        let _ = self.transcript_tx.send(result);
    }
}

/// Adapter for platforms with no speech support: probes report unavailable
/// and every operation refuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

impl SpeechRecognizer for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&self) -> Result<ListeningSession, SpeechError> {
        Err(SpeechError::Unavailable)
    }
}

impl SpeechSynthesizer for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Coordinates the two capabilities for one session.
///
/// Enforces at most one active recognition, and cancels in-progress speech
/// before listening starts so the microphone does not pick up the bot.
pub struct VoiceController {
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    active: Option<ListeningSession>,
}

impl VoiceController {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            recognizer,
            synthesizer,
            active: None,
        }
    }

    pub fn recognition_available(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    /// Start capturing one utterance.
    pub fn begin_capture(&mut self) -> Result<(), SpeechError> {
        if self.active.is_some() {
            return Err(SpeechError::AlreadyListening);
        }
        if self.synthesizer.is_speaking() {
            self.synthesizer.cancel();
        }
        self.active = Some(self.recognizer.start()?);
        Ok(())
    }

    /// Stop capturing early, discarding the utterance.
    pub fn end_capture(&mut self) {
        if let Some(session) = self.active.take() {
            session.stop();
        }
    }

    /// Await the transcript of the active capture, if any.
    ///
    /// Resolving clears the listening indicator; the caller decides what to
    /// do with the text (it is never auto-submitted).
    pub async fn transcript(&mut self) -> Option<Result<String, SpeechError>> {
        let session = self.active.take()?;
        Some(session.transcript().await)
    }
}
