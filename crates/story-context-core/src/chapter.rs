//! Chapter-scoped context assembly.
//!
//! Starting from one chapter, [`ChapterContextBuilder::build`] follows the
//! chapter's foreign keys outward and emits items layer by layer:
//!
//! 1. **L1** the chapter body, its outline, and the tail of the
//!    chronologically previous chapter.
//! 2. **L2** profiles of the chapter's characters, the relationships among
//!    them, its locations, and its arc.
//! 3. **L3** active foreshadowing already planted or hinted by this
//!    chapter, and the hooks left open by the previous chapter.
//! 4. **L4** the story-wide power system and social rules.
//! 5. **L5** caller-supplied notes.
//!
//! The item list then goes through [`truncate`](crate::budget::truncate).
//! Reads are issued one after another; the builder never writes.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use crate::budget::truncate;
use crate::error::NotFound;
use crate::item::{BuiltContext, ContextItem, ContextItemType};
use crate::models::{Chapter, Character, Relationship};
use crate::render::{
    chapter_tail, present, render_arc, render_character_profile, render_foreshadowing_at,
    render_hook, render_location, render_outline, render_power_system, render_relationship,
    render_social_rules, Detail,
};
use crate::sink::{unique_ids, ItemSink};
use crate::store::StoryStore;

/// Default number of trailing paragraphs taken from the previous chapter.
pub const DEFAULT_TAIL_PARAGRAPHS: usize = 3;

/// Inputs for a single chapter build.
#[derive(Debug, Clone)]
pub struct ChapterBuildOptions {
    /// Upper bound on total estimated tokens.
    pub budget: usize,
    /// Item types never constructed for this build.
    pub exclude: Vec<ContextItemType>,
    /// Caller-supplied free text, appended as L5 items.
    pub extra: Vec<String>,
    /// Paragraphs taken from the end of the previous chapter.
    pub tail_paragraphs: usize,
}

impl ChapterBuildOptions {
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget,
            exclude: Vec::new(),
            extra: Vec::new(),
            tail_paragraphs: DEFAULT_TAIL_PARAGRAPHS,
        }
    }

    pub fn exclude(mut self, item_type: ContextItemType) -> Self {
        if !self.exclude.contains(&item_type) {
            self.exclude.push(item_type);
        }
        self
    }

    pub fn extra(mut self, text: impl Into<String>) -> Self {
        self.extra.push(text.into());
        self
    }
}

/// Builds chapter-anchored context from a [`StoryStore`].
pub struct ChapterContextBuilder<'a, S: StoryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: StoryStore + ?Sized> ChapterContextBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Assembles and truncates the context for `chapter_id`.
    ///
    /// Returns a [`NotFound`] error if the chapter does not exist; no item
    /// is built in that case. Store errors propagate unchanged.
    pub async fn build(&self, chapter_id: &str, opts: &ChapterBuildOptions) -> Result<BuiltContext> {
        let items = self.collect_items(chapter_id, opts).await?;
        let built = truncate(items, opts.budget);
        debug!(
            chapter_id,
            tokens_used = built.total_tokens(),
            item_count = built.items().len(),
            truncated = built.truncated(),
            "built chapter context"
        );
        Ok(built)
    }

    /// All items for `chapter_id` in layer order, before truncation.
    pub async fn collect_items(
        &self,
        chapter_id: &str,
        opts: &ChapterBuildOptions,
    ) -> Result<Vec<ContextItem>> {
        let chapter = self
            .store
            .get_chapter(chapter_id)
            .await?
            .ok_or_else(|| NotFound::chapter(chapter_id))?;

        let mut sink = ItemSink::new(&opts.exclude);

        let previous = self.store.previous_chapter(chapter.number).await?;

        self.chapter_local(&chapter, previous.as_ref(), opts, &mut sink);
        self.entity_profiles(&chapter, &mut sink).await?;
        self.plot_devices(&chapter, previous.as_ref(), &mut sink)
            .await?;
        self.world_rules(&mut sink).await?;

        for text in &opts.extra {
            sink.push(ContextItemType::Custom, None, text.clone());
        }

        Ok(sink.into_items())
    }

    fn chapter_local(
        &self,
        chapter: &Chapter,
        previous: Option<&Chapter>,
        opts: &ChapterBuildOptions,
        sink: &mut ItemSink<'_>,
    ) {
        if let Some(body) = present(chapter.content.as_deref()) {
            sink.push(
                ContextItemType::ChapterContent,
                Some(&chapter.id),
                body.to_string(),
            );
        }
        sink.push(
            ContextItemType::ChapterOutline,
            Some(&chapter.id),
            render_outline(&chapter.outline),
        );
        if let Some(prev) = previous {
            if let Some(tail) = chapter_tail(prev, opts.tail_paragraphs) {
                sink.push(ContextItemType::PreviousChapterTail, Some(&prev.id), tail);
            }
        }
    }

    async fn entity_profiles(&self, chapter: &Chapter, sink: &mut ItemSink<'_>) -> Result<()> {
        let character_ids = unique_ids(&chapter.character_ids);
        let characters = self.store.get_characters(&character_ids).await?;
        if characters.len() < character_ids.len() {
            debug!(
                chapter_id = %chapter.id,
                missing = character_ids.len() - characters.len(),
                "chapter references unknown characters"
            );
        }
        for c in &characters {
            sink.push(
                ContextItemType::Character,
                Some(&c.id),
                render_character_profile(c),
            );
        }

        if sink.wants(ContextItemType::Relationship) {
            let ids: Vec<String> = characters.iter().map(|c| c.id.clone()).collect();
            let rels = self.store.relationships_among(&ids).await?;
            for item in relationship_items(&rels, &characters) {
                sink.push_item(item);
            }
        }

        if sink.wants(ContextItemType::Location) {
            let location_ids = unique_ids(&chapter.location_ids);
            for loc in self.store.get_locations(&location_ids).await? {
                sink.push(
                    ContextItemType::Location,
                    Some(&loc.id),
                    render_location(&loc, Detail::Standard),
                );
            }
        }

        if let Some(arc_id) = &chapter.arc_id {
            if sink.wants(ContextItemType::Arc) {
                if let Some(arc) = self.store.get_arc(arc_id).await? {
                    sink.push(
                        ContextItemType::Arc,
                        Some(&arc.id),
                        render_arc(&arc, Detail::Standard),
                    );
                }
            }
        }
        Ok(())
    }

    async fn plot_devices(
        &self,
        chapter: &Chapter,
        previous: Option<&Chapter>,
        sink: &mut ItemSink<'_>,
    ) -> Result<()> {
        if sink.wants(ContextItemType::Foreshadowing) {
            for f in self.store.list_foreshadowing().await? {
                if f.is_active() && f.visible_at(chapter.number) {
                    sink.push(
                        ContextItemType::Foreshadowing,
                        Some(&f.id),
                        render_foreshadowing_at(&f, chapter.number),
                    );
                }
            }
        }

        if let Some(prev) = previous {
            if sink.wants(ContextItemType::Hook) {
                for h in self.store.hooks_for_chapter(&prev.id).await? {
                    sink.push(ContextItemType::Hook, Some(&h.id), render_hook(&h));
                }
            }
        }
        Ok(())
    }

    async fn world_rules(&self, sink: &mut ItemSink<'_>) -> Result<()> {
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
        Ok(())
    }

    /// Renders one character's profile on its own.
    pub async fn character_profile(&self, character_id: &str) -> Result<String> {
        let c = self
            .store
            .get_character(character_id)
            .await?
            .ok_or_else(|| NotFound::character(character_id))?;
        Ok(render_character_profile(&c))
    }

    /// Relationships among an arbitrary set of characters, bypassing the
    /// chapter's foreign keys.
    pub async fn relationships_among(&self, character_ids: &[String]) -> Result<Vec<ContextItem>> {
        let characters = self.store.get_characters(&unique_ids(character_ids)).await?;
        let ids: Vec<String> = characters.iter().map(|c| c.id.clone()).collect();
        let rels = self.store.relationships_among(&ids).await?;
        Ok(relationship_items(&rels, &characters))
    }
}

/// One item per relationship whose endpoints both resolve to a name.
pub(crate) fn relationship_items(
    rels: &[Relationship],
    characters: &[Character],
) -> Vec<ContextItem> {
    relationship_items_with(rels, characters, Detail::Standard)
}

pub(crate) fn relationship_items_with(
    rels: &[Relationship],
    characters: &[Character],
    detail: Detail,
) -> Vec<ContextItem> {
    let names: HashMap<&str, &str> = characters
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    rels.iter()
        .filter_map(|r| {
            let from = names.get(r.from_character_id.as_str());
            let to = names.get(r.to_character_id.as_str());
            match (from, to) {
                (Some(from), Some(to)) => Some(ContextItem::new(
                    ContextItemType::Relationship,
                    Some(r.id.clone()),
                    render_relationship(r, from, to, detail),
                )),
                _ => {
                    debug!(relationship_id = %r.id, "skipping relationship with unknown character");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_not_found;
    use crate::models::{
        Arc, ChapterOutline, Foreshadowing, ForeshadowingHint, ForeshadowingStatus, Hook,
        Location, Motivation, PowerSystem, WorldSetting,
    };
    use crate::store::memory::InMemoryStore;

    fn chapter(id: &str, number: i64, content: Option<&str>) -> Chapter {
        Chapter {
            id: id.into(),
            number,
            title: None,
            content: content.map(str::to_string),
            outline: ChapterOutline::default(),
            character_ids: Vec::new(),
            location_ids: Vec::new(),
            arc_id: None,
        }
    }

    fn character(id: &str, name: &str, role: &str) -> Character {
        Character {
            id: id.into(),
            name: name.into(),
            role: Some(role.into()),
            appearance: Some(format!("{} appearance notes for the profile", name)),
            personality: None,
            background: None,
            motivation: Motivation {
                surface: Some("wants the sword back".into()),
                deep: None,
                core: None,
            },
            public_facet: None,
            private_facet: None,
            voice_samples: vec!["Not today.".into()],
        }
    }

    /// A store with two chapters and a little of everything linked to ch2.
    fn populated() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_chapter(chapter("ch1", 1, Some("Opening.\nThe gate closed.\nRain fell.")));
        let mut ch2 = chapter("ch2", 2, Some("从前有一座山"));
        ch2.outline = ChapterOutline {
            goal: Some("escape the city".into()),
            scenes: vec!["night watch".into(), "rooftop chase".into()],
            hook_ending: Some("a stranger waits".into()),
        };
        ch2.character_ids = vec!["c2".into(), "c1".into()];
        ch2.location_ids = vec!["l1".into()];
        ch2.arc_id = Some("a1".into());
        store.insert_chapter(ch2);

        store.insert_character(character("c1", "林舟", "主角"));
        store.insert_character(character("c2", "老周", "师父"));
        store.insert_character(character("c3", "阿七", "路人"));
        store.insert_relationship(Relationship {
            id: "r1".into(),
            from_character_id: "c1".into(),
            to_character_id: "c2".into(),
            kind: "师徒".into(),
            bond: Some("saved his life".into()),
            goals: Vec::new(),
            history: Some("met ten years ago".into()),
        });
        store.insert_relationship(Relationship {
            id: "r2".into(),
            from_character_id: "c1".into(),
            to_character_id: "c3".into(),
            kind: "rivals".into(),
            bond: None,
            goals: Vec::new(),
            history: None,
        });
        store.insert_location(Location {
            id: "l1".into(),
            name: "青石城".into(),
            kind: Some("city".into()),
            significance: Some("seat of the magistrate".into()),
            atmosphere: Some("damp, watchful".into()),
            description: None,
        });
        store.insert_arc(Arc {
            id: "a1".into(),
            name: "Flight".into(),
            kind: Some("escape".into()),
            status: Some("rising".into()),
            current_section: Some("the gate".into()),
            sections: Vec::new(),
            description: None,
        });
        store.insert_foreshadowing(Foreshadowing {
            id: "f1".into(),
            content: "the broken sword".into(),
            status: ForeshadowingStatus::Active,
            planted_chapter: Some(1),
            hints: vec![ForeshadowingHint {
                chapter: 5,
                text: "maker's mark".into(),
            }],
            payoff: Some("it was his father's".into()),
        });
        store.insert_foreshadowing(Foreshadowing {
            id: "f2".into(),
            content: "the sealed letter".into(),
            status: ForeshadowingStatus::Resolved,
            planted_chapter: Some(1),
            hints: Vec::new(),
            payoff: None,
        });
        store.insert_foreshadowing(Foreshadowing {
            id: "f3".into(),
            content: "the third moon".into(),
            status: ForeshadowingStatus::Active,
            planted_chapter: Some(8),
            hints: Vec::new(),
            payoff: None,
        });
        store.insert_hook(Hook {
            id: "h1".into(),
            chapter_id: "ch1".into(),
            kind: Some("cliffhanger".into()),
            content: "someone knocks".into(),
        });
        store.insert_hook(Hook {
            id: "h2".into(),
            chapter_id: "ch2".into(),
            kind: None,
            content: "not yet visible".into(),
        });
        store.set_world(WorldSetting {
            power_system: PowerSystem {
                name: Some("灵脉".into()),
                levels: vec!["炼气".into(), "筑基".into()],
                rules: Vec::new(),
            },
            social_rules: vec!["sects outrank the court".into()],
        });
        store
    }

    fn types(ctx: &BuiltContext) -> Vec<ContextItemType> {
        ctx.items().iter().map(|i| i.item_type).collect()
    }

    #[tokio::test]
    async fn test_cjk_body_only() {
        let store = InMemoryStore::new();
        store.insert_chapter(chapter("ch1", 1, Some("从前有一座山")));
        let ctx = ChapterContextBuilder::new(&store)
            .build("ch1", &ChapterBuildOptions::with_budget(10_000))
            .await
            .unwrap();
        assert_eq!(ctx.items().len(), 1);
        assert_eq!(ctx.items()[0].item_type, ContextItemType::ChapterContent);
        assert_eq!(ctx.items()[0].id.as_deref(), Some("ch1"));
        assert_eq!(ctx.total_tokens(), 9);
        assert!(!ctx.truncated());
    }

    #[tokio::test]
    async fn test_empty_chapter_yields_empty_context() {
        let store = InMemoryStore::new();
        store.insert_chapter(chapter("ch1", 1, None));
        let ctx = ChapterContextBuilder::new(&store)
            .build("ch1", &ChapterBuildOptions::with_budget(100))
            .await
            .unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.total_tokens(), 0);
        assert!(!ctx.truncated());
    }

    #[tokio::test]
    async fn test_missing_chapter_is_not_found() {
        let store = populated();
        let err = ChapterContextBuilder::new(&store)
            .build("nope", &ChapterBuildOptions::with_budget(100))
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
        assert_eq!(err.to_string(), "chapter not found: nope");
    }

    #[tokio::test]
    async fn test_layer_order() {
        let store = populated();
        let opts = ChapterBuildOptions::with_budget(100_000).extra("keep the tone bleak");
        let ctx = ChapterContextBuilder::new(&store)
            .build("ch2", &opts)
            .await
            .unwrap();
        use ContextItemType::*;
        assert_eq!(
            types(&ctx),
            vec![
                ChapterContent,
                ChapterOutline,
                PreviousChapterTail,
                Character,
                Character,
                Relationship,
                Location,
                Arc,
                Foreshadowing,
                Hook,
                PowerSystem,
                SocialRules,
                Custom,
            ]
        );
        // Characters follow the chapter's FK order.
        assert_eq!(ctx.items()[3].id.as_deref(), Some("c2"));
        assert_eq!(ctx.items()[4].id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_rendered_content() {
        let store = populated();
        let items = ChapterContextBuilder::new(&store)
            .collect_items("ch2", &ChapterBuildOptions::with_budget(100_000))
            .await
            .unwrap();
        let by_type = |t: ContextItemType| -> Vec<&str> {
            items
                .iter()
                .filter(|i| i.item_type == t)
                .map(|i| i.content.as_str())
                .collect()
        };

        assert_eq!(
            by_type(ContextItemType::ChapterOutline),
            vec!["Goal: escape the city\nScenes: night watch; rooftop chase\nHook ending: a stranger waits"]
        );
        assert_eq!(
            by_type(ContextItemType::PreviousChapterTail),
            vec!["Opening.\nThe gate closed.\nRain fell."]
        );
        assert_eq!(
            by_type(ContextItemType::Relationship),
            vec!["林舟 → 老周: 师徒\nBond: saved his life"]
        );
        assert_eq!(
            by_type(ContextItemType::Foreshadowing),
            vec!["the broken sword"]
        );
        assert_eq!(
            by_type(ContextItemType::Hook),
            vec!["[cliffhanger] someone knocks"]
        );
        assert_eq!(
            by_type(ContextItemType::Arc),
            vec!["Flight(rising)\nType: escape\nCurrent section: the gate"]
        );
        let all: String = items.iter().map(|i| i.content.as_str()).collect();
        assert!(!all.contains("c1"));
        assert!(!all.contains("it was his father's"));
        assert!(!all.contains("History"));
    }

    #[tokio::test]
    async fn test_tail_paragraphs_option() {
        let store = populated();
        let mut opts = ChapterBuildOptions::with_budget(100_000);
        opts.tail_paragraphs = 1;
        let items = ChapterContextBuilder::new(&store)
            .collect_items("ch2", &opts)
            .await
            .unwrap();
        let tail = items
            .iter()
            .find(|i| i.item_type == ContextItemType::PreviousChapterTail)
            .unwrap();
        assert_eq!(tail.content, "Rain fell.");
        assert_eq!(tail.id.as_deref(), Some("ch1"));
    }

    #[tokio::test]
    async fn test_first_chapter_has_no_tail_or_hooks() {
        let store = populated();
        let items = ChapterContextBuilder::new(&store)
            .collect_items("ch1", &ChapterBuildOptions::with_budget(100_000))
            .await
            .unwrap();
        assert!(items.iter().all(|i| i.item_type != ContextItemType::PreviousChapterTail
            && i.item_type != ContextItemType::Hook));
        // World rules are carried regardless of chapter.
        assert!(items.iter().any(|i| i.item_type == ContextItemType::PowerSystem));
    }

    #[tokio::test]
    async fn test_exclude_skips_construction() {
        let store = populated();
        let opts = ChapterBuildOptions::with_budget(100_000)
            .exclude(ContextItemType::ChapterContent)
            .exclude(ContextItemType::Relationship);
        let ctx = ChapterContextBuilder::new(&store)
            .build("ch2", &opts)
            .await
            .unwrap();
        assert!(ctx
            .items()
            .iter()
            .all(|i| i.item_type != ContextItemType::ChapterContent
                && i.item_type != ContextItemType::Relationship));
        assert_eq!(ctx.items()[0].item_type, ContextItemType::ChapterOutline);
    }

    #[tokio::test]
    async fn test_ten_profiles_over_budget_drop_from_the_end() {
        let store = InMemoryStore::new();
        let mut ch = chapter("ch1", 1, Some("从前有一座山"));
        for i in 0..10 {
            let id = format!("c{}", i);
            store.insert_character(character(&id, &format!("Hero{}", i), "ally"));
            ch.character_ids.push(id);
        }
        store.insert_chapter(ch);

        let builder = ChapterContextBuilder::new(&store);
        let all = builder
            .collect_items("ch1", &ChapterBuildOptions::with_budget(100))
            .await
            .unwrap();
        let profile_tokens: usize = all
            .iter()
            .filter(|i| i.item_type == ContextItemType::Character)
            .map(|i| i.tokens())
            .sum();
        assert!(profile_tokens > 100);

        let ctx = builder
            .build("ch1", &ChapterBuildOptions::with_budget(100))
            .await
            .unwrap();
        assert!(ctx.truncated());
        assert!(ctx.total_tokens() <= 100);
        assert_eq!(ctx.items()[0].item_type, ContextItemType::ChapterContent);
        let kept: Vec<&str> = ctx.items()[1..]
            .iter()
            .map(|i| i.id.as_deref().unwrap())
            .collect();
        let expected: Vec<String> = (0..kept.len()).map(|i| format!("c{}", i)).collect();
        assert_eq!(kept, expected);
        assert!(kept.len() < 10);
    }

    #[tokio::test]
    async fn test_repeat_builds_are_identical() {
        let store = populated();
        let builder = ChapterContextBuilder::new(&store);
        let opts = ChapterBuildOptions::with_budget(60);
        let first = builder.build("ch2", &opts).await.unwrap();
        let second = builder.build("ch2", &opts).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_character_profile_in_isolation() {
        let store = populated();
        let builder = ChapterContextBuilder::new(&store);
        let text = builder.character_profile("c1").await.unwrap();
        assert!(text.starts_with("林舟(主角)"));
        let err = builder.character_profile("ghost").await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_relationships_among_arbitrary_set() {
        let store = populated();
        let builder = ChapterContextBuilder::new(&store);
        let items = builder
            .relationships_among(&["c3".to_string(), "c1".to_string()])
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "林舟 → 阿七: rivals");
        assert_eq!(items[0].priority(), ContextItemType::Relationship.priority());
    }

    #[tokio::test]
    async fn test_repeated_fk_ids_build_one_item_each() {
        let store = InMemoryStore::new();
        let mut ch = chapter("ch1", 1, Some("Rain."));
        ch.character_ids = vec!["c1".into(), "c2".into(), "c1".into()];
        ch.location_ids = vec!["l1".into(), "l1".into()];
        store.insert_chapter(ch);
        store.insert_character(character("c1", "林舟", "lead"));
        store.insert_character(character("c2", "阿七", "rival"));
        store.insert_location(Location {
            id: "l1".into(),
            name: "青石城".into(),
            kind: None,
            significance: None,
            atmosphere: None,
            description: None,
        });

        let ctx = ChapterContextBuilder::new(&store)
            .build("ch1", &ChapterBuildOptions::with_budget(1000))
            .await
            .unwrap();
        let ids: Vec<(ContextItemType, Option<&str>)> = ctx
            .items()
            .iter()
            .filter(|i| {
                matches!(
                    i.item_type,
                    ContextItemType::Character | ContextItemType::Location
                )
            })
            .map(|i| (i.item_type, i.id.as_deref()))
            .collect();
        assert_eq!(
            ids,
            vec![
                (ContextItemType::Character, Some("c1")),
                (ContextItemType::Character, Some("c2")),
                (ContextItemType::Location, Some("l1")),
            ]
        );
    }

    #[tokio::test]
    async fn test_relationships_among_ignores_repeated_ids() {
        let store = InMemoryStore::new();
        store.insert_character(character("c1", "林舟", "lead"));
        store.insert_character(character("c2", "阿七", "rival"));
        store.insert_relationship(Relationship {
            id: "r1".into(),
            from_character_id: "c1".into(),
            to_character_id: "c2".into(),
            kind: "rivals".into(),
            bond: None,
            goals: Vec::new(),
            history: None,
        });
        let ids: Vec<String> = ["c1", "c2", "c1"].iter().map(|s| s.to_string()).collect();
        let items = ChapterContextBuilder::new(&store)
            .relationships_among(&ids)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }
}
