//! Story-bible import.
//!
//! Reads a [`StoryBible`] JSON document and upserts every entity into
//! SQLite inside a single transaction. Entities are written parents-first
//! (arcs, characters, locations, then chapters and their links, then
//! relationships and hooks) so foreign keys always resolve.
//!
//! References that point at unknown entities (a chapter listing a missing
//! character, a hook on a missing chapter) are skipped and counted, the
//! same way the context builders treat dangling ids.
//!
//! # Usage
//!
//! ```bash
//! sctx import ./bible.json
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use story_context_core::models::StoryBible;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Counts reported after an import.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub chapters: usize,
    pub characters: usize,
    pub relationships: usize,
    pub locations: usize,
    pub factions: usize,
    pub arcs: usize,
    pub foreshadowing: usize,
    pub hooks: usize,
    pub world: bool,
    /// References dropped because their target does not exist.
    pub skipped_links: usize,
}

/// Fills empty ids with fresh UUIDs.
fn assign_ids(bible: &mut StoryBible) {
    fn fill(id: &mut String) {
        if id.trim().is_empty() {
            *id = uuid::Uuid::new_v4().to_string();
        }
    }
    bible.chapters.iter_mut().for_each(|c| fill(&mut c.id));
    bible.characters.iter_mut().for_each(|c| fill(&mut c.id));
    bible.relationships.iter_mut().for_each(|r| fill(&mut r.id));
    bible.locations.iter_mut().for_each(|l| fill(&mut l.id));
    bible.factions.iter_mut().for_each(|f| fill(&mut f.id));
    bible.arcs.iter_mut().for_each(|a| fill(&mut a.id));
    bible.foreshadowing.iter_mut().for_each(|f| fill(&mut f.id));
    bible.hooks.iter_mut().for_each(|h| fill(&mut h.id));
}

pub fn read_bible(path: &Path) -> Result<StoryBible> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read story bible: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse story bible: {}", path.display()))
}

/// Upserts every entity of `bible` into the database behind `pool`.
pub async fn import_bible(pool: &SqlitePool, mut bible: StoryBible) -> Result<ImportReport> {
    assign_ids(&mut bible);
    let mut report = ImportReport::default();
    let mut tx = pool.begin().await?;

    for arc in &bible.arcs {
        sqlx::query(
            r#"
            INSERT INTO arcs (id, name, kind, status, current_section, sections_json, description)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                status = excluded.status,
                current_section = excluded.current_section,
                sections_json = excluded.sections_json,
                description = excluded.description
            "#,
        )
        .bind(&arc.id)
        .bind(&arc.name)
        .bind(&arc.kind)
        .bind(&arc.status)
        .bind(&arc.current_section)
        .bind(serde_json::to_string(&arc.sections)?)
        .bind(&arc.description)
        .execute(&mut *tx)
        .await?;
        report.arcs += 1;
    }

    for c in &bible.characters {
        sqlx::query(
            r#"
            INSERT INTO characters (id, name, role, appearance, personality, background,
                                    motivation_surface, motivation_deep, motivation_core,
                                    public_facet, private_facet, voice_samples_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                appearance = excluded.appearance,
                personality = excluded.personality,
                background = excluded.background,
                motivation_surface = excluded.motivation_surface,
                motivation_deep = excluded.motivation_deep,
                motivation_core = excluded.motivation_core,
                public_facet = excluded.public_facet,
                private_facet = excluded.private_facet,
                voice_samples_json = excluded.voice_samples_json
            "#,
        )
        .bind(&c.id)
        .bind(&c.name)
        .bind(&c.role)
        .bind(&c.appearance)
        .bind(&c.personality)
        .bind(&c.background)
        .bind(&c.motivation.surface)
        .bind(&c.motivation.deep)
        .bind(&c.motivation.core)
        .bind(&c.public_facet)
        .bind(&c.private_facet)
        .bind(serde_json::to_string(&c.voice_samples)?)
        .execute(&mut *tx)
        .await?;
        report.characters += 1;
    }

    for l in &bible.locations {
        sqlx::query(
            r#"
            INSERT INTO locations (id, name, kind, significance, atmosphere, description)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                significance = excluded.significance,
                atmosphere = excluded.atmosphere,
                description = excluded.description
            "#,
        )
        .bind(&l.id)
        .bind(&l.name)
        .bind(&l.kind)
        .bind(&l.significance)
        .bind(&l.atmosphere)
        .bind(&l.description)
        .execute(&mut *tx)
        .await?;
        report.locations += 1;
    }

    for f in &bible.factions {
        sqlx::query(
            r#"
            INSERT INTO factions (id, name, kind, ideology, goals_json, description)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                ideology = excluded.ideology,
                goals_json = excluded.goals_json,
                description = excluded.description
            "#,
        )
        .bind(&f.id)
        .bind(&f.name)
        .bind(&f.kind)
        .bind(&f.ideology)
        .bind(serde_json::to_string(&f.goals)?)
        .bind(&f.description)
        .execute(&mut *tx)
        .await?;
        report.factions += 1;
    }

    for ch in &bible.chapters {
        // A dangling arc id is stored as NULL.
        sqlx::query(
            r#"
            INSERT INTO chapters (id, number, title, content, outline_goal,
                                  outline_scenes_json, outline_hook_ending, arc_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, (SELECT id FROM arcs WHERE id = ?))
            ON CONFLICT(id) DO UPDATE SET
                number = excluded.number,
                title = excluded.title,
                content = excluded.content,
                outline_goal = excluded.outline_goal,
                outline_scenes_json = excluded.outline_scenes_json,
                outline_hook_ending = excluded.outline_hook_ending,
                arc_id = excluded.arc_id
            "#,
        )
        .bind(&ch.id)
        .bind(ch.number)
        .bind(&ch.title)
        .bind(&ch.content)
        .bind(&ch.outline.goal)
        .bind(serde_json::to_string(&ch.outline.scenes)?)
        .bind(&ch.outline.hook_ending)
        .bind(&ch.arc_id)
        .execute(&mut *tx)
        .await?;
        debug!(chapter_id = %ch.id, number = ch.number, "imported chapter");

        report.skipped_links += replace_links(
            &mut tx,
            "chapter_characters",
            "character_id",
            "characters",
            &ch.id,
            &ch.character_ids,
        )
        .await?;
        report.skipped_links += replace_links(
            &mut tx,
            "chapter_locations",
            "location_id",
            "locations",
            &ch.id,
            &ch.location_ids,
        )
        .await?;
        report.chapters += 1;
    }

    for r in &bible.relationships {
        let result = sqlx::query(
            r#"
            INSERT INTO relationships (id, from_character_id, to_character_id, kind,
                                       bond, goals_json, history)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM characters WHERE id = ?)
              AND EXISTS (SELECT 1 FROM characters WHERE id = ?)
            ON CONFLICT(id) DO UPDATE SET
                from_character_id = excluded.from_character_id,
                to_character_id = excluded.to_character_id,
                kind = excluded.kind,
                bond = excluded.bond,
                goals_json = excluded.goals_json,
                history = excluded.history
            "#,
        )
        .bind(&r.id)
        .bind(&r.from_character_id)
        .bind(&r.to_character_id)
        .bind(&r.kind)
        .bind(&r.bond)
        .bind(serde_json::to_string(&r.goals)?)
        .bind(&r.history)
        .bind(&r.from_character_id)
        .bind(&r.to_character_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            warn!(relationship_id = %r.id, "skipping relationship with unknown character");
            report.skipped_links += 1;
        } else {
            report.relationships += 1;
        }
    }

    for f in &bible.foreshadowing {
        sqlx::query(
            r#"
            INSERT INTO foreshadowing (id, content, status, planted_chapter, hints_json, payoff)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                status = excluded.status,
                planted_chapter = excluded.planted_chapter,
                hints_json = excluded.hints_json,
                payoff = excluded.payoff
            "#,
        )
        .bind(&f.id)
        .bind(&f.content)
        .bind(f.status.as_str())
        .bind(f.planted_chapter)
        .bind(serde_json::to_string(&f.hints)?)
        .bind(&f.payoff)
        .execute(&mut *tx)
        .await?;
        report.foreshadowing += 1;
    }

    for h in &bible.hooks {
        let result = sqlx::query(
            r#"
            INSERT INTO hooks (id, chapter_id, kind, content)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM chapters WHERE id = ?)
            ON CONFLICT(id) DO UPDATE SET
                chapter_id = excluded.chapter_id,
                kind = excluded.kind,
                content = excluded.content
            "#,
        )
        .bind(&h.id)
        .bind(&h.chapter_id)
        .bind(&h.kind)
        .bind(&h.content)
        .bind(&h.chapter_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            warn!(hook_id = %h.id, chapter_id = %h.chapter_id, "skipping hook on unknown chapter");
            report.skipped_links += 1;
        } else {
            report.hooks += 1;
        }
    }

    if let Some(world) = &bible.world {
        sqlx::query(
            r#"
            INSERT INTO world (id, power_system_json, social_rules_json)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                power_system_json = excluded.power_system_json,
                social_rules_json = excluded.social_rules_json
            "#,
        )
        .bind(serde_json::to_string(&world.power_system)?)
        .bind(serde_json::to_string(&world.social_rules)?)
        .execute(&mut *tx)
        .await?;
        report.world = true;
    }

    tx.commit().await?;
    Ok(report)
}

/// Rewrites a chapter's link rows, keeping list order in `position`.
/// Repeated ids keep their first position. Returns how many ids had no
/// target row.
async fn replace_links(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
    target: &str,
    chapter_id: &str,
    ids: &[String],
) -> Result<usize> {
    sqlx::query(&format!("DELETE FROM {table} WHERE chapter_id = ?"))
        .bind(chapter_id)
        .execute(&mut **tx)
        .await?;

    let insert = format!(
        "INSERT INTO {table} (chapter_id, {column}, position) \
         SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM {target} WHERE id = ?)"
    );
    let mut seen = HashSet::new();
    let mut skipped = 0;
    for (position, id) in ids.iter().filter(|id| seen.insert(id.as_str())).enumerate() {
        let result = sqlx::query(&insert)
            .bind(chapter_id)
            .bind(id)
            .bind(position as i64)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            warn!(chapter_id, id = %id, table, "skipping link to unknown entity");
            skipped += 1;
        }
    }
    Ok(skipped)
}

/// CLI entry point for `sctx import <path>`.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let bible = read_bible(path)?;
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let report = import_bible(&pool, bible).await?;
    pool.close().await;

    println!("Import complete: {}", path.display());
    println!("  chapters:       {}", report.chapters);
    println!("  characters:     {}", report.characters);
    println!("  relationships:  {}", report.relationships);
    println!("  locations:      {}", report.locations);
    println!("  factions:       {}", report.factions);
    println!("  arcs:           {}", report.arcs);
    println!("  foreshadowing:  {}", report.foreshadowing);
    println!("  hooks:          {}", report.hooks);
    println!("  world:          {}", if report.world { "yes" } else { "no" });
    if report.skipped_links > 0 {
        println!("  skipped links:  {}", report.skipped_links);
    }
    Ok(())
}
