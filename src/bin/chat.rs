//! Terminal chat driver
//!
//! Reads one message per line and prints the model's reply together with the
//! session's context usage. Lines starting with `/` are commands:
//! `/status`, `/continue`, `/new`, `/list`, `/quit`.

use std::sync::Arc;

use anyhow::{Context, Result};
use chat_context::remote::{DEFAULT_API_KEY_VAR, DEFAULT_BASE_URL, OpenAiClient, RemoteConfig};
use chat_context::{Config, SessionManager};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Multi-turn chat with a bounded context window")]
struct Args {
    /// Model name (qwen-coder, qwen-instruct, deepseek, llama)
    #[arg(long, env = "CHAT_MODEL", default_value = "qwen-coder")]
    model: String,

    /// Role preset (assistant, programmer, translator, teacher)
    #[arg(long, env = "CHAT_ROLE", default_value = "assistant")]
    role: String,

    /// Ceiling on the estimated size of one request
    #[arg(long, env = "CHAT_MAX_CONTEXT_TOKENS", default_value_t = 28_000)]
    max_context_tokens: usize,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = OpenAiClient::new(RemoteConfig::from_env(DEFAULT_API_KEY_VAR, &args.base_url))
        .context("failed to build HTTP client")?;
    let config = Config::new().with_max_context_tokens(args.max_context_tokens);
    let manager = SessionManager::new(Arc::new(client), config)?;

    let mut session_id = Uuid::new_v4();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/status" => match manager.context_status(&session_id).await {
                Ok(status) => println!("{}", status.to_json()?),
                Err(e) => println!("{}", e),
            },
            "/continue" => match manager.continue_session(&session_id).await {
                Ok(next) => {
                    println!("Continued in session {}", next);
                    session_id = next;
                }
                Err(e) => println!("{}", e),
            },
            "/new" => {
                session_id = manager.new_session(&args.model, &args.role)?;
                println!("Started session {}", session_id);
            }
            "/list" => {
                for info in manager.list_sessions().await? {
                    let marker = if info.id == session_id { "*" } else { " " };
                    println!(
                        "{} {} {:<40} turns={} summaries={}",
                        marker,
                        info.id,
                        info.title.as_deref().unwrap_or("(untitled)"),
                        info.turn_count,
                        info.summary_count
                    );
                }
            }
            text => {
                let turn = manager
                    .handle_turn(session_id, text, &args.model, &args.role)
                    .await?;
                println!("{}", turn.reply);
                println!(
                    "[{} turns, ~{} tokens, {}% of budget{}]",
                    turn.status.turn_count,
                    turn.status.estimated_tokens,
                    turn.status.percent_of_budget,
                    if turn.status.is_compressed { ", compressed" } else { "" }
                );
            }
        }
    }

    Ok(())
}
