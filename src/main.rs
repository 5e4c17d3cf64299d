//! # Story Context CLI (`sctx`)
//!
//! The `sctx` binary creates the story database, imports a story bible,
//! and prints assembled context blocks ready to paste into a prompt.
//!
//! ## Usage
//!
//! ```bash
//! sctx --config ./config/sctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sctx init` | Create the SQLite database and schema |
//! | `sctx import <path>` | Upsert a story-bible JSON file |
//! | `sctx context chapter <id>` | Context for writing one chapter |
//! | `sctx context global` | Story-wide context (`--summary` for headlines) |
//! | `sctx character <id>` | One character profile |
//! | `sctx relationships <id>...` | Relationships among characters |
//! | `sctx estimate <text>` | Token estimate for a string |
//!
//! ## Examples
//!
//! ```bash
//! sctx init --config ./config/sctx.toml
//! sctx import ./bible.json
//! sctx context chapter ch-12 --budget 3000 --exclude chapter_content
//! sctx context global --summary --json
//! ```

mod config;
mod context_cmd;
mod db;
mod import;
mod migrate;
mod sqlite_store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Story Context CLI: token-budgeted writing context from a story bible.
///
/// All database commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/sctx.example.toml`.
#[derive(Parser)]
#[command(
    name = "sctx",
    about = "Story Context: assemble token-budgeted writing context from a story bible",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sctx.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it again leaves existing data untouched.
    Init,

    /// Import a story-bible JSON file.
    ///
    /// Entities are upserted by id in a single transaction. References to
    /// unknown entities are skipped with a warning.
    Import {
        /// Path to the JSON file.
        path: PathBuf,
    },

    /// Build and print a context block.
    Context {
        #[command(subcommand)]
        scope: ContextScope,
    },

    /// Print one character's profile.
    Character {
        /// Character id.
        id: String,
    },

    /// Print the relationships whose both ends are among the given characters.
    Relationships {
        /// Character ids.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print items as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Estimate the token count of a string.
    Estimate {
        text: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ContextScope {
    /// Context for writing a specific chapter.
    Chapter {
        /// Chapter id.
        id: String,

        /// Token budget (defaults to `[context].token_budget`).
        #[arg(long)]
        budget: Option<usize>,

        /// Item type to leave out, e.g. `chapter_content`. Repeatable.
        #[arg(long)]
        exclude: Vec<String>,

        /// Free-text note appended at the lowest priority. Repeatable.
        #[arg(long)]
        extra: Vec<String>,

        /// Print the built context as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Story-wide context.
    Global {
        /// Headlines only.
        #[arg(long)]
        summary: bool,

        /// Token budget; unbounded when omitted.
        #[arg(long)]
        budget: Option<usize>,

        /// Print the built context as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Commands that don't require config
    if let Commands::Estimate { text, json } = &cli.command {
        return context_cmd::run_estimate(text, *json);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { path } => {
            import::run_import(&cfg, &path).await?;
        }
        Commands::Context { scope } => match scope {
            ContextScope::Chapter {
                id,
                budget,
                exclude,
                extra,
                json,
            } => {
                context_cmd::run_chapter_context(&cfg, &id, budget, &exclude, extra, json).await?;
            }
            ContextScope::Global {
                summary,
                budget,
                json,
            } => {
                context_cmd::run_global_context(&cfg, summary, budget, json).await?;
            }
        },
        Commands::Character { id } => {
            context_cmd::run_character(&cfg, &id).await?;
        }
        Commands::Relationships { ids, json } => {
            context_cmd::run_relationships(&cfg, &ids, json).await?;
        }
        Commands::Estimate { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
