//! Story-wide context for queries not anchored to a chapter.
//!
//! Two fidelity modes read the same entity set:
//!
//! - [`GlobalMode::Full`]: every entity at [`Detail::Full`], all
//!   foreshadowing regardless of status, and the world rules.
//! - [`GlobalMode::Summary`]: headlines only (`name(role)`,
//!   `name(status)`, …), active foreshadowing only, no world rules.
//!
//! Each summary item is the first line of the matching full item, and the
//! token estimator is additive across lines, so a summary never costs more
//! than the full build of the same bible.

use anyhow::Result;
use tracing::debug;

use crate::budget::truncate;
use crate::chapter::relationship_items_with;
use crate::item::{BuiltContext, ContextItem, ContextItemType};
use crate::sink::ItemSink;
use crate::render::{
    render_arc, render_character, render_faction, render_foreshadowing, render_location,
    render_power_system, render_social_rules, Detail,
};
use crate::store::StoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalMode {
    Full,
    Summary,
}

impl GlobalMode {
    fn detail(self) -> Detail {
        match self {
            GlobalMode::Full => Detail::Full,
            GlobalMode::Summary => Detail::Summary,
        }
    }
}

/// Builds story-wide context from a [`StoryStore`].
pub struct GlobalContextBuilder<'a, S: StoryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: StoryStore + ?Sized> GlobalContextBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Everything, verbose, untruncated.
    pub async fn build_full(&self) -> Result<BuiltContext> {
        self.build(GlobalMode::Full, None).await
    }

    /// Headlines only, untruncated.
    pub async fn build_summary(&self) -> Result<BuiltContext> {
        self.build(GlobalMode::Summary, None).await
    }

    /// Builds in `mode`, applying `budget` when given.
    pub async fn build(&self, mode: GlobalMode, budget: Option<usize>) -> Result<BuiltContext> {
        let items = self.collect_items(mode).await?;
        let built = truncate(items, budget.unwrap_or(usize::MAX));
        debug!(
            ?mode,
            tokens_used = built.total_tokens(),
            item_count = built.items().len(),
            truncated = built.truncated(),
            "built global context"
        );
        Ok(built)
    }

    /// All items for `mode` in layer order, before truncation.
    pub async fn collect_items(&self, mode: GlobalMode) -> Result<Vec<ContextItem>> {
        let detail = mode.detail();
        let mut sink = ItemSink::new(&[]);

        let characters = self.store.list_characters().await?;
        for c in &characters {
            sink.push(
                ContextItemType::Character,
                Some(&c.id),
                render_character(c, detail),
            );
        }

        let rels = self.store.list_relationships().await?;
        for item in relationship_items_with(&rels, &characters, detail) {
            sink.push_item(item);
        }

        for loc in self.store.list_locations().await? {
            sink.push(
                ContextItemType::Location,
                Some(&loc.id),
                render_location(&loc, detail),
            );
        }

        for arc in self.store.list_arcs().await? {
            sink.push(ContextItemType::Arc, Some(&arc.id), render_arc(&arc, detail));
        }

        for f in self.store.list_factions().await? {
            sink.push(
                ContextItemType::Faction,
                Some(&f.id),
                render_faction(&f, detail),
            );
        }

        for f in self.store.list_foreshadowing().await? {
            if mode == GlobalMode::Summary && !f.is_active() {
                continue;
            }
            sink.push(
                ContextItemType::Foreshadowing,
                Some(&f.id),
                render_foreshadowing(&f, detail),
            );
        }

        if mode == GlobalMode::Full {
            if let Some(world) = self.store.get_world().await? {
                sink.push(
                    ContextItemType::PowerSystem,
                    None,
                    render_power_system(&world.power_system),
                );
                sink.push(
                    ContextItemType::SocialRules,
                    None,
                    render_social_rules(&world.social_rules),
                );
            }
        }

        Ok(sink.into_items())
    }
}
