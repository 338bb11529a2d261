//! Gemini backend adapter.
//!
//! Translates session history plus one new message into Generative Language
//! API requests and exposes the reply either as a lazy stream of text
//! fragments (chat path) or as one complete string (relay path). The
//! [`ChatBackend`] trait is the seam both consumers program against, so tests
//! substitute a scripted fake.

pub mod backend;
pub mod error;
pub mod gemini;
mod sse;

pub use backend::{ChatBackend, ReplyStream};
pub use error::LlmError;
pub use gemini::GeminiClient;
