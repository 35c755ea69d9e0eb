use anyhow::{Context, Result, bail};
use ollama_chat::{ChatBackend, ChatError, Config, ConversationClient, OllamaClient, Role};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::slash::{ParsedCommand, SlashCommand, get_help_text, parse_slash_command};

/// Whether the chat loop keeps going after a command
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub async fn list_models(config: &Config) -> Result<()> {
    let client = OllamaClient::new(config);
    let models = client.list_models().await?;

    if models.is_empty() {
        println!("No models installed. Pull one with: ollama pull llama3.2");
        return Ok(());
    }

    println!("📋 Models on {}:\n", client.endpoint());
    for model in models {
        let marker = if config.default_model.as_deref() == Some(model.as_str()) {
            "*"
        } else {
            " "
        };
        println!("  {} {}", marker, model);
    }

    Ok(())
}

/// One stateless completion; nothing is remembered between invocations
pub async fn ask(config: &Config, prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!("Nothing to ask: the prompt is empty");
    }

    let client = OllamaClient::new(config);
    let model = match &config.default_model {
        Some(model) => model.clone(),
        None => client
            .list_models()
            .await?
            .into_iter()
            .next()
            .context("No models installed. Pull one with: ollama pull llama3.2")?,
    };

    let reply = client.complete(&model, &[], prompt).await?;
    println!("{}", reply);
    Ok(())
}

/// End-to-end smoke test: discover, select, send one message
pub async fn check(config: &Config) -> Result<()> {
    println!("Testing connection to {}...", config.base_url());
    println!("{}", "-".repeat(50));

    let mut client = ConversationClient::new(config);
    println!("[OK] Client initialized");

    let models = client.discover_models().await?;
    println!("[OK] Found {} models: {:?}", models.len(), models);

    let model = match config.default_model.clone().or_else(|| models.first().cloned()) {
        Some(model) => model,
        None => bail!("No models found. Run: ollama pull llama3.2"),
    };
    client.select_model(model.as_str());
    println!("[OK] Using model: {}", model);

    println!("\nSending test message...");
    println!("(This may take 1-2 minutes on first run)");
    let reply = client.send_message("Say 'Hello' in one word").await?;
    println!("[OK] Got response: {}", reply);
    println!("\n[SUCCESS] All checks passed!");

    Ok(())
}

/// Interactive chat over stdin
pub async fn chat(config: &Config) -> Result<()> {
    let mut client = ConversationClient::connect(config).await;

    println!("💬 Chatting with {}", client.endpoint());
    match client.active_model() {
        Some(model) => println!("🤖 Model: {}", model),
        None => println!("⚠️  No model selected. Use /models, then /model <name>."),
    }
    println!("Type /help for commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        if line.trim_start().starts_with('/') {
            match parse_slash_command(&line) {
                Some(command) => {
                    if handle_slash_command(&mut client, command).await == Flow::Exit {
                        break;
                    }
                }
                None => println!("Unknown command. Type /help for the list."),
            }
            continue;
        }

        match client.send_message(&line).await {
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) => print_error(&e),
        }
    }

    println!("👋 Bye!");
    Ok(())
}

async fn handle_slash_command(client: &mut ConversationClient, command: ParsedCommand) -> Flow {
    match command.command {
        SlashCommand::Model => match command.argument() {
            Some(name) => {
                client.select_model(name);
                println!("🔄 Switched to {} (history cleared)", name);
            }
            None => print_models(client).await,
        },
        SlashCommand::Models => print_models(client).await,
        SlashCommand::Clear => {
            client.clear_history();
            println!("🧹 Chat cleared");
        }
        SlashCommand::History => {
            if client.history().is_empty() {
                println!("(no messages yet)");
            }
            for turn in client.history() {
                let who = match turn.role {
                    Role::User => "You",
                    Role::Assistant => "Assistant",
                };
                println!("{}: {}", who, turn.content);
            }
        }
        SlashCommand::Help => println!("{}", get_help_text()),
        SlashCommand::Bye => return Flow::Exit,
    }
    Flow::Continue
}

async fn print_models(client: &ConversationClient) {
    match client.discover_models().await {
        Ok(models) if models.is_empty() => {
            println!("No models installed. Pull one with: ollama pull llama3.2")
        }
        Ok(models) => {
            for model in models {
                let marker = if client.active_model() == Some(model.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("  {} {}", marker, model);
            }
        }
        Err(e) => print_error(&e),
    }
}

fn print_error(err: &ChatError) {
    eprintln!("❌ {}", err);
    if err.is_retryable() {
        eprintln!("   You can send the message again.");
    }
}
