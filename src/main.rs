use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use toolbridge::agent::{invoked_tool_names, latest_assistant_text, ChatOrchestrator};
use toolbridge::llm::{ChatMessage, OpenAiClient, RequestConfig};
use toolbridge::mcp::{McpClientConfig, McpServerManager};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = McpClientConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load '{config_path}'"))?;

    let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let model = env::var("MODEL_NAME").unwrap_or_else(|_| "gpt-4o".to_string());

    tracing::info!("Connecting to {} configured provider(s)", config.servers.len());

    let manager = Arc::new(McpServerManager::new(config.clone()));
    manager.connect_many(&config.server_names()).await?;

    let llm = Arc::new(OpenAiClient::new(api_key));
    let orchestrator = ChatOrchestrator::new(manager.clone(), llm, RequestConfig::new(model));

    println!(
        "{}",
        "Connected. Type a message, or 'exit' to quit.".dimmed()
    );

    let stdin = io::stdin();
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        print!("{} ", "you>".green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        history.push(ChatMessage::user(line));
        let tools_before = invoked_tool_names(&history).len();

        // Keep the pre-turn history so a failed turn stays retryable
        match orchestrator.process_messages(history.clone(), None).await {
            Ok(updated) => {
                history = updated;

                let tools_used = invoked_tool_names(&history);
                if tools_used.len() > tools_before {
                    println!(
                        "{} {}",
                        "tools used:".yellow(),
                        tools_used[tools_before..].join(", ")
                    );
                }
                if let Some(text) = latest_assistant_text(&history) {
                    println!("{text}");
                }
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                history.pop();
            }
        }
    }

    manager.shutdown().await?;

    Ok(())
}
