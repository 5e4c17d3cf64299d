//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/story.sqlite"
//!
//! [context]
//! token_budget = 4000
//! tail_paragraphs = 3
//! ```
//!
//! `[context]` is optional. The command line can override the budget per
//! call with `--budget`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use story_context_core::chapter::DEFAULT_TAIL_PARAGRAPHS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Upper bound on estimated tokens in an assembled context.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    /// Trailing paragraphs carried over from the previous chapter.
    #[serde(default = "default_tail_paragraphs")]
    pub tail_paragraphs: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            tail_paragraphs: default_tail_paragraphs(),
        }
    }
}

fn default_token_budget() -> usize {
    4000
}
fn default_tail_paragraphs() -> usize {
    DEFAULT_TAIL_PARAGRAPHS
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.context.token_budget == 0 {
        anyhow::bail!("context.token_budget must be > 0");
    }
    if config.context.tail_paragraphs == 0 {
        anyhow::bail!("context.tail_paragraphs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_context_missing() {
        let cfg = parse_config("[db]\npath = \"story.sqlite\"\n").unwrap();
        assert_eq!(cfg.context.token_budget, 4000);
        assert_eq!(cfg.context.tail_paragraphs, 3);
    }

    #[test]
    fn test_explicit_values() {
        let cfg = parse_config(
            "[db]\npath = \"x.sqlite\"\n\n[context]\ntoken_budget = 1200\ntail_paragraphs = 5\n",
        )
        .unwrap();
        assert_eq!(cfg.context.token_budget, 1200);
        assert_eq!(cfg.context.tail_paragraphs, 5);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = parse_config("[db]\npath = \"x\"\n[context]\ntoken_budget = 0\n").unwrap_err();
        assert!(err.to_string().contains("token_budget"));
    }

    #[test]
    fn test_missing_db_rejected() {
        assert!(parse_config("[context]\ntoken_budget = 10\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
