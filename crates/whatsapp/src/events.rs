//! Inbound delivery payload parsing.
//!
//! Deliveries arrive as a nested entry/changes/value envelope. Only the
//! first message of a delivery is relayed; status-only deliveries (read and
//! delivery receipts) carry no messages and are ignored.

use serde::Deserialize;

/// Top-level webhook delivery payload.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    /// Delivery/read receipts; present on status-only deliveries.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

/// One user-originated message within a delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender phone identifier; replies are addressed here.
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl InboundMessage {
    /// Body text when this is a text message, `None` for any other kind.
    pub fn text_body(&self) -> Option<&str> {
        if self.kind == "text" {
            self.text.as_ref().map(|t| t.body.as_str())
        } else {
            None
        }
    }
}

/// First message of a delivery, if any.
pub fn first_message(payload: &DeliveryPayload) -> Option<&InboundMessage> {
    payload
        .entry
        .first()?
        .changes
        .first()?
        .value
        .messages
        .first()
}
