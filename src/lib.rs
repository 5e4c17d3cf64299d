//! # Story Context
//!
//! Assembles token-budgeted writing context from a story bible stored in
//! SQLite: the chapter being written, the characters, places, and arcs it
//! touches, open foreshadowing, and world rules.
//!
//! The builders, renderers, truncation, and formatting live in
//! [`story_context_core`]; this crate adds configuration, the SQLite
//! schema and store, the JSON importer, and the `sctx` command handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ bible.json │──▶│ import (tx)  │──▶│ SQLite (FK schema) │
//! └────────────┘   └──────────────┘   └─────────┬──────────┘
//!                                               │ SqliteStore
//!                                               ▼
//!                          ┌─────────────────────────────────┐
//!                          │ Chapter / Global builders (core) │
//!                          └────────────────┬────────────────┘
//!                                           ▼
//!                                <story_context> … </story_context>
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sctx init
//! sctx import ./bible.json
//! sctx context chapter ch-12 --budget 3000
//! sctx context global --summary
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | `StoryStore` over SQLite |
//! | [`import`] | Story-bible JSON import |
//! | [`context_cmd`] | CLI command handlers |

pub mod config;
pub mod context_cmd;
pub mod db;
pub mod import;
pub mod migrate;
pub mod sqlite_store;
