//! `counsel relay` subcommand: run the WhatsApp webhook relay.

use std::sync::Arc;

use clap::ArgMatches;

use counsel_llm::GeminiClient;
use counsel_whatsapp::{RelayConfig, WhatsAppRelay};

pub async fn run(matches: &ArgMatches) {
    // A relay without a backend credential cannot do anything useful, so
    // this is fatal here even though the chat path degrades.
    let Some(backend) = GeminiClient::from_env() else {
        eprintln!("Error: GOOGLE_API_KEY environment variable not set.");
        std::process::exit(1);
    };

    let mut config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(port) = matches.get_one::<String>("port") {
        match port.parse() {
            Ok(port) => config.port = port,
            Err(_) => {
                eprintln!("Error: invalid port: {}", port);
                std::process::exit(1);
            }
        }
    }

    let relay = match WhatsAppRelay::new(config, Arc::new(backend)) {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = relay.start().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Serve until interrupted.
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = relay.stop().await;
    }
}
