//! Shared foundation for the counsel assistant.
//!
//! Holds the message data model used by both front doors (interactive chat
//! and the WhatsApp relay), the counselor persona strings, and environment
//! configuration helpers.

pub mod config;
pub mod persona;
pub mod types;

pub use types::{Message, MessageId, Sender};
