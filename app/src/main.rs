#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use confab_config::Config;
use confab_conversation::{ConversationManager, HistoryStore};
use confab_core::Content;
use confab_providers::backend_from_config;

#[derive(Parser)]
#[command(name = "confab")]
#[command(about = "Multi-turn conversations with a pluggable language model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the configured backend
    Chat {
        /// Single message to send (interactive mode when omitted)
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Backend to use (mock, ollama, openai)
        #[arg(short = 'p', long)]
        provider: Option<String>,

        /// Model override for the chosen backend
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// Conversation to resume (a new one is started when omitted)
        #[arg(short = 'c', long)]
        conversation: Option<String>,

        /// System prompt for a fresh conversation
        #[arg(short = 's', long)]
        system: Option<String>,

        /// Export the conversation to the save directory on exit
        #[arg(long)]
        save: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            provider,
            model,
            conversation,
            system,
            save,
        } => {
            let mut config = Config::from_env();
            if let Some(provider) = provider {
                config.provider = provider;
            }
            if let Some(model) = model {
                config.ollama.model.clone_from(&model);
                config.openai.model = model;
            }

            let backend = backend_from_config(&config)?;
            let store = Arc::new(HistoryStore::new(config.history.save_dir.clone()));
            let manager =
                ConversationManager::new(backend, store, config.max_concurrent_turns);

            info!("Using provider: {}", config.provider);

            if let Some(text) = message {
                run_once(&manager, conversation, system.as_deref(), &text, save).await?;
            } else {
                run_interactive(&manager, conversation, system.as_deref(), save).await?;
            }
        }
        Commands::Version => {
            println!("confab {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn run_once(
    manager: &ConversationManager,
    conversation: Option<String>,
    system: Option<&str>,
    text: &str,
    save: bool,
) -> anyhow::Result<()> {
    let outcome = manager
        .chat(conversation, system, Some(Content::text(text)))
        .await?;

    if let Some(reply) = outcome.reply {
        println!("{reply}");
    }

    finish(manager, &outcome.conversation_id, save).await
}

async fn run_interactive(
    manager: &ConversationManager,
    conversation: Option<String>,
    system: Option<&str>,
    save: bool,
) -> anyhow::Result<()> {
    println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

    let mut conversation_id = conversation;
    let mut first_turn = true;

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if matches!(input, "exit" | "quit" | "q") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let system = if first_turn { system } else { None };
        match manager
            .chat(conversation_id.clone(), system, Some(Content::text(input)))
            .await
        {
            Ok(outcome) => {
                if let Some(reply) = &outcome.reply {
                    println!("\n{reply}\n");
                }
                conversation_id = Some(outcome.conversation_id);
                first_turn = false;
            }
            Err(err) => {
                eprintln!("Error: {err}");
            }
        }
    }

    match conversation_id {
        Some(id) => finish(manager, &id, save).await,
        None => Ok(()),
    }
}

async fn finish(
    manager: &ConversationManager,
    conversation_id: &str,
    save: bool,
) -> anyhow::Result<()> {
    if let Some(path) = manager.end(conversation_id, save).await? {
        println!("Conversation saved to: {}", path.display());
    }
    Ok(())
}
