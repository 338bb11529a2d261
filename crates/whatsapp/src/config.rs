//! Relay process configuration.
//!
//! All values come from the environment. Unlike the chat path, a missing
//! backend credential or platform secret is fatal here: an unauthenticated
//! or mute relay is worse than no relay.

use counsel_core::config;

use crate::error::RelayError;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v20.0";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Configuration for the webhook relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bearer token for the Cloud API send endpoint.
    pub whatsapp_token: String,
    /// Phone number id the relay sends from.
    pub phone_number_id: String,
    /// Pre-shared token echoed during the verification handshake.
    pub verify_token: String,
    /// Shared secret for delivery signature verification.
    pub app_secret: String,
    /// Listening port.
    pub port: u16,
    /// Bind address for the webhook server.
    pub bind_address: String,
    /// Graph API base URL; tests point this at a local server.
    pub graph_base_url: String,
}

impl RelayConfig {
    /// Load the relay configuration from the environment.
    pub fn from_env() -> Result<Self, RelayError> {
        let whatsapp_token = required(config::WHATSAPP_TOKEN)?;
        let phone_number_id = required(config::WHATSAPP_PHONE_ID)?;
        let verify_token = required(config::VERIFY_TOKEN)?;
        let app_secret = required(config::META_APP_SECRET)?;

        let port_raw = config::env_or(config::PORT, DEFAULT_PORT);
        let port: u16 = port_raw
            .parse()
            .map_err(|_| RelayError::Config(format!("{} is not a valid port: {}", config::PORT, port_raw)))?;

        Ok(Self {
            whatsapp_token,
            phone_number_id,
            verify_token,
            app_secret,
            port,
            bind_address: config::env_or(config::BIND_ADDRESS, DEFAULT_BIND_ADDRESS),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
        })
    }
}

fn required(name: &str) -> Result<String, RelayError> {
    config::non_empty_env(name)
        .ok_or_else(|| RelayError::Config(format!("{} environment variable not set", name)))
}
