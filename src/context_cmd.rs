//! Context assembly commands.
//!
//! Each handler opens the configured database, wraps it in a
//! [`SqliteStore`], runs one of the core builders, and prints the result to
//! stdout. Plain output is the `<story_context>` block produced by
//! [`format_context`]; `--json` prints the [`BuiltContext`] itself.
//! Build statistics go to the log on stderr so stdout stays pipeable.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use story_context_core::{
    estimate_tokens, format_context, BuiltContext, ChapterBuildOptions, ChapterContextBuilder,
    ContextItemType, GlobalContextBuilder, GlobalMode,
};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    Ok(SqliteStore::new(pool))
}

fn report(built: &BuiltContext) {
    let stats = built.stats();
    info!(
        tokens_used = stats.tokens_used,
        item_count = stats.item_count,
        truncated = stats.truncated,
        "context assembled"
    );
    if stats.truncated {
        warn!(
            dropped = built.dropped(),
            "context exceeded the token budget; lowest-priority items were dropped"
        );
    }
}

fn print_built(built: &BuiltContext, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(built)?);
    } else {
        println!("{}", format_context(built.items()));
    }
    Ok(())
}

/// Parses `--exclude` values into item types.
pub fn parse_excludes(values: &[String]) -> Result<Vec<ContextItemType>> {
    values.iter().map(|v| v.parse()).collect()
}

/// `sctx context chapter <id>`
pub async fn run_chapter_context(
    config: &Config,
    chapter_id: &str,
    budget: Option<usize>,
    exclude: &[String],
    extra: Vec<String>,
    json: bool,
) -> Result<()> {
    let exclude = parse_excludes(exclude)?;
    let mut opts = ChapterBuildOptions::with_budget(budget.unwrap_or(config.context.token_budget));
    opts.tail_paragraphs = config.context.tail_paragraphs;
    opts.exclude = exclude;
    opts.extra = extra;

    let store = open_store(config).await?;
    let built = ChapterContextBuilder::new(&store)
        .build(chapter_id, &opts)
        .await?;
    report(&built);
    print_built(&built, json)?;
    store.pool().close().await;
    Ok(())
}

/// `sctx context global`
pub async fn run_global_context(
    config: &Config,
    summary: bool,
    budget: Option<usize>,
    json: bool,
) -> Result<()> {
    let mode = if summary {
        GlobalMode::Summary
    } else {
        GlobalMode::Full
    };
    let store = open_store(config).await?;
    let built = GlobalContextBuilder::new(&store).build(mode, budget).await?;
    report(&built);
    print_built(&built, json)?;
    store.pool().close().await;
    Ok(())
}

/// `sctx character <id>`
pub async fn run_character(config: &Config, character_id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let profile = ChapterContextBuilder::new(&store)
        .character_profile(character_id)
        .await?;
    println!("{}", profile);
    store.pool().close().await;
    Ok(())
}

/// `sctx relationships <id>...`
pub async fn run_relationships(config: &Config, character_ids: &[String], json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let items = ChapterContextBuilder::new(&store)
        .relationships_among(character_ids)
        .await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No relationships among the given characters.");
    } else {
        for item in &items {
            println!("{}", item.content);
        }
    }
    store.pool().close().await;
    Ok(())
}

#[derive(Serialize)]
struct Estimate<'a> {
    text: &'a str,
    tokens: usize,
}

/// `sctx estimate <text>`. Needs no config or database.
pub fn run_estimate(text: &str, json: bool) -> Result<()> {
    let tokens = estimate_tokens(text);
    if json {
        println!("{}", serde_json::to_string(&Estimate { text, tokens })?);
    } else {
        println!("{}", tokens);
    }
    Ok(())
}
