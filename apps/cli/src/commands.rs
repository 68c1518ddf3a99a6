//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use bankchat_core::{ChatSession, PipelineState, TurnOutcome, loader};
use bankchat_shared::{
    AppConfig, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
use bankchat_storage::VectorStore;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BankChat: a retrieval-augmented banking assistant.
#[derive(Parser)]
#[command(
    name = "bankchat",
    version,
    about = "Ask banking questions answered from a local vector store and Gemini.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.bankchat/bankchat.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ask one question and print the answer with its sources.
    Ask {
        /// The question to ask.
        question: String,

        /// Collection to retrieve from (overrides config).
        #[arg(long)]
        collection: Option<String>,

        /// Vector database file (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print only the answer.
        #[arg(long)]
        no_sources: bool,
    },

    /// List collections in the vector database.
    Collections {
        /// Vector database file (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
    /// Print the config file location.
    Path,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so answers on
/// stdout stay clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bankchat=warn",
        1 => "bankchat=info",
        2 => "bankchat=debug",
        _ => "bankchat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Ask {
            question,
            collection,
            db,
            no_sources,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(collection) = collection {
                config.vector_store.collection = collection;
            }
            if let Some(db) = db {
                config.vector_store.path = db.to_string_lossy().into_owned();
            }
            cmd_ask(&config, &question, !no_sources).await
        }
        Command::Collections { db } => {
            let config = resolve_config(config_path)?;
            let db = db.unwrap_or_else(|| PathBuf::from(&config.vector_store.path));
            cmd_collections(&db).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
            ConfigAction::Path => cmd_config_path(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_ask(config: &AppConfig, question: &str, show_sources: bool) -> Result<ExitCode> {
    let spinner = spinner("Loading RAG system...");
    let state: &PipelineState = loader::global().get_or_build(config).await;
    if let Some(reason) = state.failure() {
        spinner.suspend(|| eprintln!("RAG system unavailable: {reason}"));
    }

    spinner.set_message("Thinking...");
    let mut session = ChatSession::new();
    let outcome = session.ask(state, question).await;
    spinner.finish_and_clear();

    let Some(reply) = session.history().last() else {
        return Ok(ExitCode::FAILURE);
    };

    if outcome != TurnOutcome::Answered {
        eprintln!("{}", reply.content);
        return Ok(ExitCode::FAILURE);
    }

    println!("{}", reply.content.trim());
    if show_sources && reply.has_sources() {
        println!();
        println!("Source documents:");
        for (i, source) in reply.sources.iter().enumerate() {
            println!("  {}. {source}", i + 1);
        }
    }
    info!(sources = reply.sources.len(), "answer printed");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_collections(db: &Path) -> Result<ExitCode> {
    let store = VectorStore::open_readonly(db).await?;
    let collections = store.list_collections().await?;

    if collections.is_empty() {
        println!("No collections in {}", db.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("  {:<28} {:<44} {:>5} {:>9}", "NAME", "MODEL", "DIM", "DOCUMENTS");
    for c in collections {
        println!(
            "  {:<28} {:<44} {:>5} {:>9}",
            c.name,
            c.embedding_model.as_deref().unwrap_or("-"),
            c.dimension,
            c.document_count
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(path: Option<&Path>) -> Result<ExitCode> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    match validate_api_key(&config) {
        Ok(()) => println!("# {} is set", config.llm.api_key_env),
        Err(e) => println!("# {e}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_path(path: Option<&Path>) -> Result<ExitCode> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
