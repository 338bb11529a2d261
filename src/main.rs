use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // Local .env first, then the real environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("counsel")
        .version(VERSION)
        .about("AI career counselor - interactive chat and WhatsApp webhook relay")
        .subcommand(
            Command::new("relay")
                .about("Run the WhatsApp webhook relay server")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Listening port (overrides the PORT environment variable)"),
                ),
        )
        .subcommand(
            Command::new("chat")
                .about("Start an interactive chat session")
                .arg(
                    Arg::new("voice")
                        .long("voice")
                        .action(ArgAction::SetTrue)
                        .help("Speak replies aloud when a synthesizer is available"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("relay", sub)) => commands::relay::run(sub).await,
        Some(("chat", sub)) => commands::chat::run(sub).await,
        _ => {
            println!("counsel v{}", VERSION);
            println!("Use --help for available commands");
        }
    }
}
