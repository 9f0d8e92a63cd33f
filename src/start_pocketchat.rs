//! Terminal front-end for the chat session.
//!
//! Reads commands and messages from stdin and prints replies to stdout.
//! Logs go to stderr, filtered by `RUST_LOG`.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ChatSession, ConversationId, ModelId, SendOutcome, StoreOutcome};
use crate::config::ChatConfig;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::llm::catalog::{self, AVAILABLE_MODELS};
use crate::llm::{CompletionClient, validate_api_key_with_config};

const HELP: &str = "\
Commands:
  /new               start a new conversation
  /list              list conversations
  /switch <n>        make conversation <n> current
  /delete <n>        delete conversation <n>
  /clear             clear the current conversation
  /models            list available models
  /model <id>        select a model
  /image <url> [text] send an image with optional text
  /logout            forget the stored API key and quit
  /quit              exit
Anything else is sent as a message.";

/// Run the terminal chat (used by the `pocketchat` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on normal exit, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting pocketchat v{}", env!("CARGO_PKG_VERSION"));

    let config = ChatConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::from(1);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(run_terminal(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[allow(clippy::cognitive_complexity)]
async fn run_terminal(config: &ChatConfig) -> Result<()> {
    let credentials = FileCredentialStore::new(&config.credentials_path);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let api_key = match credentials.load().context("reading stored API key")? {
        Some(key) => key,
        None => {
            say("Enter your API key:")?;
            let key = lines
                .next_line()
                .await?
                .map(|line| line.trim().to_string())
                .unwrap_or_default();
            if !validate_api_key_with_config(&key, config).await {
                anyhow::bail!("API key was rejected or the service is unreachable");
            }
            credentials.save(&key).context("saving API key")?;
            key
        }
    };

    let client = CompletionClient::with_config(api_key, config)?;
    let session = ChatSession::new(client, config.default_model_id()?)
        .with_max_tokens(config.max_tokens);
    session.create_conversation().await;
    say(HELP)?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "/quit" | "/exit" => break,
            "/help" => say(HELP)?,
            "/new" => {
                session.create_conversation().await;
                say("Started a new conversation.")?;
            }
            "/list" => list_conversations(&session).await?,
            "/switch" => match conversation_at(&session, rest).await {
                Some(id) => {
                    report(session.select_conversation(id).await)?;
                    print_transcript(&session).await?;
                }
                None => say("No such conversation.")?,
            },
            "/delete" => match conversation_at(&session, rest).await {
                Some(id) => report(session.delete_conversation(id).await)?,
                None => say("No such conversation.")?,
            },
            "/clear" => report(session.clear_current_conversation().await)?,
            "/models" => {
                let selected = session.selected_model().await;
                for option in AVAILABLE_MODELS {
                    let marker = if option.id == selected.as_str() { "*" } else { " " };
                    say(&format!("{marker} {:<16} {}", option.id, option.name))?;
                }
            }
            "/model" => match ModelId::new(rest) {
                Ok(model) => {
                    say(&format!("Model: {}", catalog::display_name(&model)))?;
                    session.set_selected_model(model).await;
                }
                Err(e) => say(&format!("Invalid model: {e}"))?,
            },
            "/image" => {
                let (url, text) = rest.split_once(' ').unwrap_or((rest, ""));
                if url.is_empty() {
                    say("Usage: /image <url> [text]")?;
                } else {
                    let outcome = session.send_message(text, &[url.to_string()]).await;
                    print_outcome(&session, outcome).await?;
                }
            }
            "/logout" => {
                credentials.clear().context("clearing API key")?;
                say("API key removed.")?;
                break;
            }
            _ => {
                let outcome = session.send_message(line, &[]).await;
                print_outcome(&session, outcome).await?;
            }
        }
    }

    Ok(())
}

fn say(text: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}

fn report(outcome: StoreOutcome) -> Result<()> {
    match outcome {
        StoreOutcome::Applied => say("Done."),
        StoreOutcome::NoCurrentConversation => say("No current conversation; use /new."),
        StoreOutcome::NoMessages => say("The conversation is empty."),
        StoreOutcome::UnknownConversation => say("No such conversation."),
    }
}

async fn conversation_at(
    session: &ChatSession<CompletionClient>,
    index: &str,
) -> Option<ConversationId> {
    let index: usize = index.parse().ok()?;
    session
        .conversations()
        .await
        .get(index.checked_sub(1)?)
        .map(|c| c.id)
}

async fn list_conversations(session: &ChatSession<CompletionClient>) -> Result<()> {
    let current = session.current().await.map(|c| c.id);
    let conversations = session.conversations().await;
    if conversations.is_empty() {
        return say("No conversations.");
    }
    for (i, conversation) in conversations.iter().enumerate() {
        let marker = if Some(conversation.id) == current { "*" } else { " " };
        say(&format!(
            "{marker} {:>2}. {} [{}] ({} messages)",
            i + 1,
            conversation.title,
            conversation.model,
            conversation.messages.len()
        ))?;
    }
    Ok(())
}

async fn print_transcript(session: &ChatSession<CompletionClient>) -> Result<()> {
    let Some(conversation) = session.current().await else {
        return Ok(());
    };
    for message in &conversation.messages {
        say(&format!(
            "{}: {}",
            message.role(),
            message.text().unwrap_or("[image]")
        ))?;
    }
    Ok(())
}

async fn print_outcome(session: &ChatSession<CompletionClient>, outcome: SendOutcome) -> Result<()> {
    match outcome {
        SendOutcome::Replied { .. } => {
            let current = session.current().await;
            let text = current
                .as_ref()
                .and_then(|c| c.last_message())
                .and_then(|m| m.text())
                .unwrap_or_default();
            say(&format!("assistant: {text}"))
        }
        SendOutcome::Failed { reply, .. } => say(&reply),
        SendOutcome::Discarded { reason, .. } => say(&format!("(reply dropped: {reason})")),
        SendOutcome::NoCurrentConversation => say("No current conversation; use /new."),
        SendOutcome::EmptyInput => Ok(()),
    }
}
