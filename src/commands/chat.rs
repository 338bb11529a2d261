//! `counsel chat` subcommand: interactive terminal session.

use std::sync::Arc;

use clap::ArgMatches;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use counsel_chat::{ChatSession, TurnOutcome};
use counsel_llm::GeminiClient;

pub async fn run(matches: &ArgMatches) {
    let mut session = match GeminiClient::from_env() {
        Some(client) => ChatSession::new(Arc::new(client)),
        None => ChatSession::disconnected(),
    };
    // Voice output only takes effect when an embedder attaches a synthesizer;
    // the terminal front end ships without one.
    session.set_voice_output(matches.get_flag("voice"));

    if let Some(greeting) = session.last_reply() {
        println!("counselor> {}", greeting);
    }
    if !session.is_connected() {
        return;
    }
    println!("(/clear resets the conversation, /quit exits)");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if stdout.write_all(b"you> ").await.is_err() {
            break;
        }
        let _ = stdout.flush().await;

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                if let Some(greeting) = session.last_reply() {
                    println!("counselor> {}", greeting);
                }
                continue;
            }
            input => match session.submit(input).await {
                TurnOutcome::Completed | TurnOutcome::Failed => {
                    if let Some(reply) = session.last_reply() {
                        println!("counselor> {}", reply);
                    }
                }
                TurnOutcome::Rejected(reason) => {
                    tracing::debug!(?reason, "submission ignored");
                }
            },
        }
    }
}
