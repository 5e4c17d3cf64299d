//! Read-only storage abstraction over the story bible.
//!
//! The [`StoryStore`] trait is everything the context builders need from a
//! persistence layer: lookups by id, by containing entity, and "all".
//! Backends (SQLite, in-memory) implement it; the builders never write.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Ordering
//!
//! `list_*` methods and [`relationships_among`](StoryStore::relationships_among)
//! return entities sorted by id. [`get_characters`](StoryStore::get_characters)
//! and [`get_locations`](StoryStore::get_locations) preserve the order of
//! the ids passed in and skip ids that do not resolve. Together these keep
//! context assembly deterministic for a fixed store state.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Arc, Chapter, Character, Faction, Foreshadowing, Hook, Location, Relationship, WorldSetting,
};

/// Abstract read interface for the story bible.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_chapter`](StoryStore::get_chapter) | Chapter by id, with FK lists |
/// | [`previous_chapter`](StoryStore::previous_chapter) | Chronologically previous chapter |
/// | [`get_characters`](StoryStore::get_characters) | Characters by id, in the given order |
/// | [`relationships_among`](StoryStore::relationships_among) | Relationships with both ends in a set |
/// | [`hooks_for_chapter`](StoryStore::hooks_for_chapter) | Hooks attached to a chapter |
/// | [`get_world`](StoryStore::get_world) | The story-wide world setting |
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn get_chapter(&self, id: &str) -> Result<Option<Chapter>>;

    /// The chapter with the greatest `number` strictly below `number`.
    async fn previous_chapter(&self, number: i64) -> Result<Option<Chapter>>;

    async fn get_character(&self, id: &str) -> Result<Option<Character>>;

    /// Characters for `ids`, in the order given; unknown ids are skipped.
    async fn get_characters(&self, ids: &[String]) -> Result<Vec<Character>>;

    async fn list_characters(&self) -> Result<Vec<Character>>;

    /// Locations for `ids`, in the order given; unknown ids are skipped.
    async fn get_locations(&self, ids: &[String]) -> Result<Vec<Location>>;

    async fn list_locations(&self) -> Result<Vec<Location>>;

    async fn get_arc(&self, id: &str) -> Result<Option<Arc>>;

    async fn list_arcs(&self) -> Result<Vec<Arc>>;

    /// Relationships whose two endpoints are both in `character_ids`.
    async fn relationships_among(&self, character_ids: &[String]) -> Result<Vec<Relationship>>;

    async fn list_relationships(&self) -> Result<Vec<Relationship>>;

    async fn list_factions(&self) -> Result<Vec<Faction>>;

    async fn list_foreshadowing(&self) -> Result<Vec<Foreshadowing>>;

    async fn hooks_for_chapter(&self, chapter_id: &str) -> Result<Vec<Hook>>;

    async fn get_world(&self) -> Result<Option<WorldSetting>>;
}
