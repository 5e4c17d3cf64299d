//! In-memory [`StoryStore`] implementation for tests and embedding.
//!
//! Uses `BTreeMap`s behind `std::sync::RwLock`, so every listing comes out
//! sorted by id without an explicit sort.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Arc, Chapter, Character, Faction, Foreshadowing, Hook, Location, Relationship, StoryBible,
    WorldSetting,
};

use super::StoryStore;

/// In-memory story bible.
#[derive(Default)]
pub struct InMemoryStore {
    chapters: RwLock<BTreeMap<String, Chapter>>,
    characters: RwLock<BTreeMap<String, Character>>,
    relationships: RwLock<BTreeMap<String, Relationship>>,
    locations: RwLock<BTreeMap<String, Location>>,
    factions: RwLock<BTreeMap<String, Faction>>,
    arcs: RwLock<BTreeMap<String, Arc>>,
    foreshadowing: RwLock<BTreeMap<String, Foreshadowing>>,
    hooks: RwLock<BTreeMap<String, Hook>>,
    world: RwLock<Option<WorldSetting>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store holding every entity of `bible`.
    pub fn from_bible(bible: StoryBible) -> Self {
        let store = Self::new();
        for c in bible.chapters {
            store.insert_chapter(c);
        }
        for c in bible.characters {
            store.insert_character(c);
        }
        for r in bible.relationships {
            store.insert_relationship(r);
        }
        for l in bible.locations {
            store.insert_location(l);
        }
        for f in bible.factions {
            store.insert_faction(f);
        }
        for a in bible.arcs {
            store.insert_arc(a);
        }
        for f in bible.foreshadowing {
            store.insert_foreshadowing(f);
        }
        for h in bible.hooks {
            store.insert_hook(h);
        }
        if let Some(w) = bible.world {
            store.set_world(w);
        }
        store
    }

    pub fn insert_chapter(&self, chapter: Chapter) {
        self.chapters
            .write()
            .unwrap()
            .insert(chapter.id.clone(), chapter);
    }

    pub fn insert_character(&self, character: Character) {
        self.characters
            .write()
            .unwrap()
            .insert(character.id.clone(), character);
    }

    pub fn insert_relationship(&self, rel: Relationship) {
        self.relationships
            .write()
            .unwrap()
            .insert(rel.id.clone(), rel);
    }

    pub fn insert_location(&self, location: Location) {
        self.locations
            .write()
            .unwrap()
            .insert(location.id.clone(), location);
    }

    pub fn insert_faction(&self, faction: Faction) {
        self.factions
            .write()
            .unwrap()
            .insert(faction.id.clone(), faction);
    }

    pub fn insert_arc(&self, arc: Arc) {
        self.arcs.write().unwrap().insert(arc.id.clone(), arc);
    }

    pub fn insert_foreshadowing(&self, f: Foreshadowing) {
        self.foreshadowing
            .write()
            .unwrap()
            .insert(f.id.clone(), f);
    }

    pub fn insert_hook(&self, hook: Hook) {
        self.hooks.write().unwrap().insert(hook.id.clone(), hook);
    }

    pub fn set_world(&self, world: WorldSetting) {
        *self.world.write().unwrap() = Some(world);
    }
}

fn pick_in_order<T: Clone>(map: &BTreeMap<String, T>, ids: &[String]) -> Vec<T> {
    ids.iter().filter_map(|id| map.get(id).cloned()).collect()
}

#[async_trait]
impl StoryStore for InMemoryStore {
    async fn get_chapter(&self, id: &str) -> Result<Option<Chapter>> {
        Ok(self.chapters.read().unwrap().get(id).cloned())
    }

    async fn previous_chapter(&self, number: i64) -> Result<Option<Chapter>> {
        let chapters = self.chapters.read().unwrap();
        // Ties on number fall back to the smallest id.
        Ok(chapters
            .values()
            .filter(|c| c.number < number)
            .max_by(|a, b| a.number.cmp(&b.number).then_with(|| b.id.cmp(&a.id)))
            .cloned())
    }

    async fn get_character(&self, id: &str) -> Result<Option<Character>> {
        Ok(self.characters.read().unwrap().get(id).cloned())
    }

    async fn get_characters(&self, ids: &[String]) -> Result<Vec<Character>> {
        Ok(pick_in_order(&self.characters.read().unwrap(), ids))
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        Ok(self.characters.read().unwrap().values().cloned().collect())
    }

    async fn get_locations(&self, ids: &[String]) -> Result<Vec<Location>> {
        Ok(pick_in_order(&self.locations.read().unwrap(), ids))
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(self.locations.read().unwrap().values().cloned().collect())
    }

    async fn get_arc(&self, id: &str) -> Result<Option<Arc>> {
        Ok(self.arcs.read().unwrap().get(id).cloned())
    }

    async fn list_arcs(&self) -> Result<Vec<Arc>> {
        Ok(self.arcs.read().unwrap().values().cloned().collect())
    }

    async fn relationships_among(&self, character_ids: &[String]) -> Result<Vec<Relationship>> {
        let wanted: HashSet<&str> = character_ids.iter().map(String::as_str).collect();
        Ok(self
            .relationships
            .read()
            .unwrap()
            .values()
            .filter(|r| {
                wanted.contains(r.from_character_id.as_str())
                    && wanted.contains(r.to_character_id.as_str())
            })
            .cloned()
            .collect())
    }

    async fn list_relationships(&self) -> Result<Vec<Relationship>> {
        Ok(self.relationships.read().unwrap().values().cloned().collect())
    }

    async fn list_factions(&self) -> Result<Vec<Faction>> {
        Ok(self.factions.read().unwrap().values().cloned().collect())
    }

    async fn list_foreshadowing(&self) -> Result<Vec<Foreshadowing>> {
        Ok(self.foreshadowing.read().unwrap().values().cloned().collect())
    }

    async fn hooks_for_chapter(&self, chapter_id: &str) -> Result<Vec<Hook>> {
        Ok(self
            .hooks
            .read()
            .unwrap()
            .values()
            .filter(|h| h.chapter_id == chapter_id)
            .cloned()
            .collect())
    }

    async fn get_world(&self) -> Result<Option<WorldSetting>> {
        Ok(self.world.read().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChapterOutline;

    fn chapter(id: &str, number: i64) -> Chapter {
        Chapter {
            id: id.into(),
            number,
            title: None,
            content: None,
            outline: ChapterOutline::default(),
            character_ids: Vec::new(),
            location_ids: Vec::new(),
            arc_id: None,
        }
    }

    fn character(id: &str, name: &str) -> Character {
        Character {
            id: id.into(),
            name: name.into(),
            role: None,
            appearance: None,
            personality: None,
            background: None,
            motivation: Default::default(),
            public_facet: None,
            private_facet: None,
            voice_samples: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_previous_chapter_by_number() {
        let store = InMemoryStore::new();
        store.insert_chapter(chapter("b", 3));
        store.insert_chapter(chapter("a", 1));
        store.insert_chapter(chapter("c", 7));

        let prev = store.previous_chapter(7).await.unwrap().unwrap();
        assert_eq!(prev.id, "b");
        assert!(store.previous_chapter(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_characters_keeps_order_and_skips_missing() {
        let store = InMemoryStore::new();
        store.insert_character(character("c1", "A"));
        store.insert_character(character("c2", "B"));

        let ids = vec!["c2".to_string(), "ghost".to_string(), "c1".to_string()];
        let got = store.get_characters(&ids).await.unwrap();
        let names: Vec<&str> = got.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_relationships_among_requires_both_ends() {
        let store = InMemoryStore::new();
        for (id, from, to) in [("r1", "c1", "c2"), ("r2", "c1", "c3")] {
            store.insert_relationship(Relationship {
                id: id.into(),
                from_character_id: from.into(),
                to_character_id: to.into(),
                kind: "ally".into(),
                bond: None,
                goals: Vec::new(),
                history: None,
            });
        }
        let ids = vec!["c1".to_string(), "c2".to_string()];
        let rels = store.relationships_among(&ids).await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].id, "r1");
    }

    #[tokio::test]
    async fn test_listing_sorted_by_id() {
        let store = InMemoryStore::new();
        store.insert_character(character("z", "Z"));
        store.insert_character(character("a", "A"));
        let all = store.list_characters().await.unwrap();
        assert_eq!(all[0].id, "a");
        assert_eq!(all[1].id, "z");
    }
}
