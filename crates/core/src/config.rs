//! Environment-style process configuration.
//!
//! Both front doors read plain environment variables; the binary loads a
//! local `.env` file first via dotenvy. Variable names mirror the deployment
//! environment of the original service.

/// Backend credential for the Gemini API.
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Model override; defaults to [`DEFAULT_MODEL`] when unset.
pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
/// Bearer token for the WhatsApp Cloud API send endpoint.
pub const WHATSAPP_TOKEN: &str = "WHATSAPP_TOKEN";
/// Phone number id the relay sends from.
pub const WHATSAPP_PHONE_ID: &str = "WHATSAPP_PHONE_ID";
/// Pre-shared token for the webhook verification handshake.
pub const VERIFY_TOKEN: &str = "VERIFY_TOKEN";
/// Shared secret for webhook signature verification.
pub const META_APP_SECRET: &str = "META_APP_SECRET";
/// Relay listening port; defaults to 8080.
pub const PORT: &str = "PORT";
/// Relay bind address; defaults to 0.0.0.0.
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Read an environment variable, treating empty values as unset.
pub fn non_empty_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

/// Read an environment variable or fall back to a default.
pub fn env_or(name: &str, default: &str) -> String {
    non_empty_env(name).unwrap_or_else(|| default.to_string())
}
