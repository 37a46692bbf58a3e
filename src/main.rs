use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod agent;
mod config;
mod events;
mod logging;
mod session;
#[cfg(test)]
mod testing;
mod tui;
mod ui;

use agent::{AgentClient, HttpAgentClient};
use config::Config;
use session::ChatSession;
use ui::conversation::{ConversationAction, ConversationManager};

#[derive(Parser)]
#[command(name = "arxiv-chat")]
#[command(version)]
#[command(about = "Chat with the Arxiv Research Agent from your terminal", long_about = None)]
struct Cli {
    /// Agent chat endpoint, overriding config and environment
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Config file to use instead of ~/.arxiv-chat/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
    },
    /// Show the effective configuration
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    logging::init(&config)?;
    tracing::info!(endpoint = %config.endpoint, "arxiv-chat starting");

    match cli.command {
        None => run_tui(&config).await,
        Some(Commands::Ask { question }) => {
            let client = HttpAgentClient::new(&config.endpoint)?;
            ask(&client, &question, &mut io::stdout().lock()).await
        }
        Some(Commands::Config { init }) => {
            show_config(&config, &config_path, init, &mut io::stdout().lock())
        }
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    let client: Arc<dyn AgentClient> = Arc::new(HttpAgentClient::new(&config.endpoint)?);

    tui::install_panic_hook();
    let mut terminal = tui::init(config.ui.mouse_capture).context("Failed to set up terminal")?;
    let mut events = tui::EventHandler::new(Duration::from_millis(config.ui.tick_rate_ms.max(16)));
    let mut manager = ConversationManager::new(client, events.sender())
        .with_timestamps(config.ui.show_timestamps);

    let result = async {
        loop {
            terminal.draw(|frame| manager.render(frame.size(), frame.buffer_mut()))?;

            let Some(event) = events.next().await else {
                break;
            };
            if manager.handle_event(event) == ConversationAction::Exit {
                break;
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!(
        session = %manager.session().id(),
        messages = manager.session().len(),
        "session ended"
    );
    result
}

/// Send one question and write every message that came back
async fn ask(client: &dyn AgentClient, question: &str, out: &mut impl Write) -> Result<()> {
    let mut session = ChatSession::new();

    let before = session.len();
    if session.submit(question, client).await.is_none() {
        writeln!(out, "Nothing to ask: the question is empty.")?;
        return Ok(());
    }

    // Skip the user's own message
    for message in &session.messages()[before + 1..] {
        writeln!(out, "{}", message.content)?;
    }
    Ok(())
}

fn show_config(config: &Config, path: &Path, init: bool, out: &mut impl Write) -> Result<()> {
    if init {
        if path.exists() {
            writeln!(out, "Config already exists at {}", path.display())?;
        } else {
            Config::default().save_to(path)?;
            writeln!(out, "Wrote default config to {}", path.display())?;
        }
    }

    writeln!(out, "# {}", path.display())?;
    write!(out, "{}", config.to_toml()?)?;
    writeln!(out, "# log file: {}", config.log_file().display())?;
    Ok(())
}
