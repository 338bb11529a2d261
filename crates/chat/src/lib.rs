//! Chat session orchestration.
//!
//! Drives one conversation turn at a time: append the user message, stream
//! the reply into a placeholder bot message, and settle the turn in a
//! terminal state. Speech input and output are optional capabilities modeled
//! as explicit adapters so headless deployments run without them.

pub mod session;
pub mod voice;

pub use session::{ChatSession, RejectReason, TurnOutcome};
pub use voice::{
    ListeningProducer, ListeningSession, NoSpeech, SpeechError, SpeechRecognizer,
    SpeechSynthesizer, VoiceController,
};
