//! # Lexica CLI (`lexica`)
//!
//! Command-line client for a Lexica backend: ingest a chat-archive export,
//! then search it.
//!
//! ## Usage
//!
//! ```bash
//! lexica --config ./lexica.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lexica ping` | Check that the backend is reachable |
//! | `lexica ingest <file>` | Upload, parse, and index an export; prints the dataset id |
//! | `lexica search "<query>" --dataset <id>` | Search an ingested dataset |
//! | `lexica show <dataset> <conversation>` | Print a conversation around a hit |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest an export
//! lexica ingest ./conversations.json
//!
//! # Search it
//! lexica search "borrow checker" --dataset ds1 --role user --has-code true
//!
//! # Pull up the surrounding conversation
//! lexica show ds1 abc123 --center 42
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use lexica_client::config::{self, Config};
use lexica_client::intake::IntakeHandle;
use lexica_client::models::{CodeFilter, RoleFilter, SearchFilters};
use lexica_client::progress::ProgressMode;
use lexica_client::{
    present, IngestionPipeline, LexicaClient, SearchDispatcher, SearchOutcome,
};

/// Lexica CLI — ingest and search personal chat-archive exports through a
/// Lexica backend.
#[derive(Parser)]
#[command(
    name = "lexica",
    about = "Lexica — upload a chat-archive export and search it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./lexica.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable.
    Ping,

    /// Ingest an export file: upload, parse, and build the search index.
    ///
    /// With no file argument, export paths are read from stdin one per line
    /// and ingested in turn.
    Ingest {
        /// Path to a ChatGPT export `.zip` or a `conversations.json`.
        file: Option<PathBuf>,

        /// Progress output: `off`, `human`, or `json` (stderr).
        /// Defaults to `human` when stderr is a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Search an ingested dataset.
    Search {
        /// The search query string.
        query: String,

        /// Dataset id printed by `lexica ingest`.
        #[arg(long)]
        dataset: String,

        /// Maximum number of results (1–100).
        #[arg(long)]
        top_k: Option<u32>,

        /// Restrict hits to one role.
        #[arg(long, value_enum, default_value_t = RoleFilter::Any)]
        role: RoleFilter,

        /// Restrict hits by code presence.
        #[arg(long, value_enum, default_value_t = CodeFilter::Either)]
        has_code: CodeFilter,

        /// Only hits on or after this date (YYYY-MM-DD).
        #[arg(long)]
        after: Option<String>,

        /// Only hits on or before this date (YYYY-MM-DD).
        #[arg(long)]
        before: Option<String>,

        /// Restrict hits to a single conversation id.
        #[arg(long)]
        conversation: Option<String>,

        /// Print the raw normalized result set as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a conversation from an ingested dataset.
    Show {
        /// Dataset id.
        dataset: String,

        /// Conversation id (from a search result).
        conversation: String,

        /// Center the window on this message index.
        #[arg(long)]
        center: Option<i64>,

        /// Number of messages either side of the center.
        #[arg(long)]
        window: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        Config::minimal()
    };

    let client = LexicaClient::new(&cfg.service)?;

    match cli.command {
        Commands::Ping => {
            client.ping().await?;
            println!("ok: {}", cfg.service.base_url);
        }
        Commands::Ingest { file, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let pipeline = IngestionPipeline::new(client);
            match file {
                Some(path) => {
                    ingest_one(&pipeline, &path, mode).await?;
                }
                None => {
                    ingest_from_stdin(&pipeline, mode).await?;
                }
            }
        }
        Commands::Search {
            query,
            dataset,
            top_k,
            role,
            has_code,
            after,
            before,
            conversation,
            json,
        } => {
            let filters = SearchFilters {
                query,
                top_k,
                role,
                has_code,
                after: parse_date(after.as_deref())?,
                before: parse_date(before.as_deref())?,
                conversation,
            };
            let dispatcher = SearchDispatcher::new(client, cfg.search.top_k);
            let outcome = dispatcher.search(Some(&dataset), &filters).await;
            let SearchOutcome::Fresh(set) = outcome else {
                // A single CLI search cannot be superseded; nothing to render.
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                print_results(&present(&set));
            }
        }
        Commands::Show {
            dataset,
            conversation,
            center,
            window,
        } => {
            let view = client
                .conversation(&dataset, &conversation, center, window)
                .await?;
            println!("conversation {}", view.conv_id);
            for msg in &view.messages {
                let role = msg.role.as_deref().unwrap_or("?");
                let ts = msg.ts.as_deref().unwrap_or("");
                println!("[{}] {} {}", role, ts, msg.msg.unwrap_or_default());
                if let Some(text) = &msg.text {
                    for line in text.lines() {
                        println!("    {}", line);
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}

/// Run one export through the pipeline and print the outcome.
async fn ingest_one(
    pipeline: &IngestionPipeline,
    path: &PathBuf,
    mode: ProgressMode,
) -> Result<()> {
    match pipeline.start(path, mode.reporter()).await {
        Ok(dataset_id) => {
            println!("dataset ready: {}", dataset_id);
            println!("search it with: lexica search \"<query>\" --dataset {}", dataset_id);
            Ok(())
        }
        Err(e) => {
            // Failed runs need an explicit reset before the next attempt.
            pipeline.reset();
            Err(anyhow::anyhow!("{}: {}", path.display(), e))
        }
    }
}

/// Stdin intake: one export path per line, validated at the intake boundary
/// and ingested sequentially. A bad path rejects that line, not the session.
async fn ingest_from_stdin(pipeline: &IngestionPipeline, mode: ProgressMode) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let intake = IntakeHandle::attach(move |path| {
        let _ = tx.send(path);
    });

    eprintln!("reading export paths from stdin (one per line, Ctrl-D to finish)");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => {
                        if let Err(e) = intake.submit(line.trim()) {
                            eprintln!("skipped: {}", e);
                        }
                    }
                    None => break,
                }
            }
            Some(path) = rx.recv() => {
                if let Err(e) = ingest_one(pipeline, &path, mode).await {
                    eprintln!("{:#}", e);
                }
            }
        }
    }

    // Detach the intake, then drain anything already accepted.
    drop(intake);
    while let Ok(path) = rx.try_recv() {
        if let Err(e) = ingest_one(pipeline, &path, mode).await {
            eprintln!("{:#}", e);
        }
    }

    Ok(())
}

fn parse_date(value: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    match value {
        None => Ok(None),
        Some(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s)),
    }
}

/// Print a display model the way `lexica search` renders it.
fn print_results(model: &lexica_client::DisplayModel) {
    println!("{}", model.header);
    for (i, row) in model.rows.iter().enumerate() {
        let title = row.title.as_deref().unwrap_or("(untitled)");
        let score = if row.score.is_empty() { "-" } else { &row.score };
        println!("{}. [{}] {}", i + 1, score, title);
        if let Some(conv) = &row.conversation_id {
            println!("    conversation: {} (message {})", conv, row.message_index);
        }
        if !row.timestamp.is_empty() {
            println!("    when: {}", row.timestamp);
        }
        if let Some(role) = &row.role {
            println!("    role: {}", role);
        }
        if let Some(snippet) = &row.snippet {
            println!("    excerpt: \"{}\"", snippet.replace('\n', " ").trim());
        }
        println!();
    }
}
