//! SQLite-backed [`StoryStore`] implementation.
//!
//! Maps each read of the story bible onto the schema created by
//! [`migrate`](crate::migrate). List-valued columns hold JSON text and are
//! decoded here; every listing is ordered by id so context assembly stays
//! deterministic.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use story_context_core::models::{
    Arc, Chapter, ChapterOutline, Character, Faction, Foreshadowing, ForeshadowingStatus, Hook,
    Location, Motivation, Relationship, WorldSetting,
};
use story_context_core::store::StoryStore;

/// SQLite implementation of the [`StoryStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn chapter_links(&self, table: &str, column: &str, chapter_id: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {column} FROM {table} WHERE chapter_id = ? ORDER BY position ASC, {column} ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(chapter_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn load_chapter(&self, row: SqliteRow) -> Result<Chapter> {
        let id: String = row.get("id");
        let character_ids = self
            .chapter_links("chapter_characters", "character_id", &id)
            .await?;
        let location_ids = self
            .chapter_links("chapter_locations", "location_id", &id)
            .await?;
        Ok(Chapter {
            number: row.get("number"),
            title: row.get("title"),
            content: row.get("content"),
            outline: ChapterOutline {
                goal: row.get("outline_goal"),
                scenes: json_column(&row, "outline_scenes_json")?,
                hook_ending: row.get("outline_hook_ending"),
            },
            character_ids,
            location_ids,
            arc_id: row.get("arc_id"),
            id,
        })
    }
}

/// Decodes a JSON text column, naming the column on failure.
fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).with_context(|| format!("malformed JSON in column {}", column))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

const CHAPTER_COLUMNS: &str = "id, number, title, content, outline_goal, outline_scenes_json, \
                               outline_hook_ending, arc_id";

const CHARACTER_COLUMNS: &str = "id, name, role, appearance, personality, background, \
                                 motivation_surface, motivation_deep, motivation_core, \
                                 public_facet, private_facet, voice_samples_json";

fn row_to_character(row: &SqliteRow) -> Result<Character> {
    Ok(Character {
        id: row.get("id"),
        name: row.get("name"),
        role: row.get("role"),
        appearance: row.get("appearance"),
        personality: row.get("personality"),
        background: row.get("background"),
        motivation: Motivation {
            surface: row.get("motivation_surface"),
            deep: row.get("motivation_deep"),
            core: row.get("motivation_core"),
        },
        public_facet: row.get("public_facet"),
        private_facet: row.get("private_facet"),
        voice_samples: json_column(row, "voice_samples_json")?,
    })
}

fn row_to_location(row: &SqliteRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        kind: row.get("kind"),
        significance: row.get("significance"),
        atmosphere: row.get("atmosphere"),
        description: row.get("description"),
    }
}

fn row_to_arc(row: &SqliteRow) -> Result<Arc> {
    Ok(Arc {
        id: row.get("id"),
        name: row.get("name"),
        kind: row.get("kind"),
        status: row.get("status"),
        current_section: row.get("current_section"),
        sections: json_column(row, "sections_json")?,
        description: row.get("description"),
    })
}

fn row_to_relationship(row: &SqliteRow) -> Result<Relationship> {
    Ok(Relationship {
        id: row.get("id"),
        from_character_id: row.get("from_character_id"),
        to_character_id: row.get("to_character_id"),
        kind: row.get("kind"),
        bond: row.get("bond"),
        goals: json_column(row, "goals_json")?,
        history: row.get("history"),
    })
}

#[async_trait]
impl StoryStore for SqliteStore {
    async fn get_chapter(&self, id: &str) -> Result<Option<Chapter>> {
        let sql = format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.load_chapter(row).await?)),
            None => Ok(None),
        }
    }

    async fn previous_chapter(&self, number: i64) -> Result<Option<Chapter>> {
        let sql = format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE number < ? \
             ORDER BY number DESC, id ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.load_chapter(row).await?)),
            None => Ok(None),
        }
    }

    async fn get_character(&self, id: &str) -> Result<Option<Character>> {
        let sql = format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_character).transpose()
    }

    async fn get_characters(&self, ids: &[String]) -> Result<Vec<Character>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(c) = self.get_character(id).await? {
                out.push(c);
            }
        }
        Ok(out)
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        let sql = format!("SELECT {CHARACTER_COLUMNS} FROM characters ORDER BY id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_character).collect()
    }

    async fn get_locations(&self, ids: &[String]) -> Result<Vec<Location>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let row = sqlx::query("SELECT * FROM locations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                out.push(row_to_location(&row));
            }
        }
        Ok(out)
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let rows = sqlx::query("SELECT * FROM locations ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_location).collect())
    }

    async fn get_arc(&self, id: &str) -> Result<Option<Arc>> {
        let row = sqlx::query("SELECT * FROM arcs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_arc).transpose()
    }

    async fn list_arcs(&self) -> Result<Vec<Arc>> {
        let rows = sqlx::query("SELECT * FROM arcs ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_arc).collect()
    }

    async fn relationships_among(&self, character_ids: &[String]) -> Result<Vec<Relationship>> {
        if character_ids.is_empty() {
            return Ok(Vec::new());
        }
        let marks = placeholders(character_ids.len());
        let sql = format!(
            "SELECT * FROM relationships \
             WHERE from_character_id IN ({marks}) AND to_character_id IN ({marks}) \
             ORDER BY id ASC"
        );
        let mut query = sqlx::query(&sql);
        for id in character_ids.iter().chain(character_ids.iter()) {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_relationship).collect()
    }

    async fn list_relationships(&self) -> Result<Vec<Relationship>> {
        let rows = sqlx::query("SELECT * FROM relationships ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_relationship).collect()
    }

    async fn list_factions(&self) -> Result<Vec<Faction>> {
        let rows = sqlx::query("SELECT * FROM factions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(Faction {
                    id: row.get("id"),
                    name: row.get("name"),
                    kind: row.get("kind"),
                    ideology: row.get("ideology"),
                    goals: json_column(row, "goals_json")?,
                    description: row.get("description"),
                })
            })
            .collect()
    }

    async fn list_foreshadowing(&self) -> Result<Vec<Foreshadowing>> {
        let rows = sqlx::query("SELECT * FROM foreshadowing ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let status: String = row.get("status");
                Ok(Foreshadowing {
                    id: row.get("id"),
                    content: row.get("content"),
                    status: ForeshadowingStatus::parse(&status)?,
                    planted_chapter: row.get("planted_chapter"),
                    hints: json_column(row, "hints_json")?,
                    payoff: row.get("payoff"),
                })
            })
            .collect()
    }

    async fn hooks_for_chapter(&self, chapter_id: &str) -> Result<Vec<Hook>> {
        let rows = sqlx::query("SELECT * FROM hooks WHERE chapter_id = ? ORDER BY id ASC")
            .bind(chapter_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| Hook {
                id: row.get("id"),
                chapter_id: row.get("chapter_id"),
                kind: row.get("kind"),
                content: row.get("content"),
            })
            .collect())
    }

    async fn get_world(&self) -> Result<Option<WorldSetting>> {
        let row = sqlx::query("SELECT power_system_json, social_rules_json FROM world WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(WorldSetting {
                power_system: json_column(&row, "power_system_json")?,
                social_rules: json_column(&row, "social_rules_json")?,
            })),
            None => Ok(None),
        }
    }
}
