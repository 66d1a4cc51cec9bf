//! Sticky Notes - operator CLI
//!
//! Inspect the note store and the session the server would currently see.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sticky_notes::history::ProviderRegistry;
use sticky_notes::{AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sticky-notes")]
#[command(about = "Inspect sticky notes and agent session history")]
#[command(version)]
struct Cli {
    /// YAML config file (defaults to ./sticky-notes.yaml when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every stored sticky note
    List,

    /// Print the normalized snippets of the current session
    Session {
        /// Only show the last N snippets
        #[arg(short, long)]
        tail: Option<usize>,
    },

    /// Show which unseen notes match the current session, without marking them seen
    Check,

    /// List the registered history providers
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing (stderr, so command output stays pipeable)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sticky_notes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Providers => {
            for name in ProviderRegistry::with_defaults().names() {
                println!("{}", name);
            }
        }
        Commands::List => {
            let state = load_state(cli.config.as_deref()).await?;
            let notes = state.manager.list_notes().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else {
                for note in &notes {
                    println!("{}  /{}/  {}", note.id, note.pattern, note.message);
                }
                tracing::info!(
                    count = notes.len(),
                    path = %state.config.notes_file().display(),
                    "Listed notes"
                );
            }
        }
        Commands::Session { tail } => {
            let state = load_state(cli.config.as_deref()).await?;
            let context = state.manager.current_session().await?;
            let skip = tail
                .map(|n| context.snippets.len().saturating_sub(n))
                .unwrap_or(0);
            let snippets = &context.snippets[skip..];
            if cli.json {
                println!("{}", serde_json::to_string_pretty(snippets)?);
            } else {
                println!("session {} ({} snippets)", context.session_id, context.snippets.len());
                for snippet in snippets {
                    println!("[{}:{}] {}", snippet.kind, snippet.source, snippet.text);
                }
            }
        }
        Commands::Check => {
            let state = load_state(cli.config.as_deref()).await?;
            let matches = state.manager.preview_relevant().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No unseen notes match the current session");
            } else {
                for m in &matches {
                    println!("{}: {}", m.note_id, m.message);
                    for snippet in &m.trigger_snippets {
                        println!("    > {}", snippet);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn load_state(config_path: Option<&Path>) -> Result<AppState> {
    let config = Config::from_yaml_and_env(config_path)?;
    AppState::new(config).await
}
