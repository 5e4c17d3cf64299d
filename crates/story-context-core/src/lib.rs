//! # Story Context Core
//!
//! Shared logic for Story Context: story-bible models, token estimation,
//! the layered context item model, per-entity renderers, the store
//! abstraction, chapter-scoped and story-wide context builders, budget
//! truncation, and formatting.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Storage backends
//! plug in through the [`store::StoryStore`] trait.
//!
//! ## Pipeline
//!
//! ```text
//! chapter id ──▶ StoryStore (FK traversal) ──▶ ContextItems (typed, prioritized)
//!                                                   │
//!                     format_context ◀── BuiltContext ◀── truncate(budget)
//! ```

pub mod budget;
pub mod chapter;
pub mod error;
pub mod format;
pub mod global;
pub mod item;
pub mod models;
pub mod render;
mod sink;
pub mod store;
pub mod tokens;

pub use budget::truncate;
pub use chapter::{ChapterBuildOptions, ChapterContextBuilder};
pub use error::NotFound;
pub use format::{format_context, format_items_excluding};
pub use global::{GlobalContextBuilder, GlobalMode};
pub use item::{BuiltContext, ContextItem, ContextItemType, ContextStats, Layer};
pub use tokens::estimate_tokens;
