//! Story-bible schema.
//!
//! Every statement is `IF NOT EXISTS`, so `sctx init` is idempotent.
//! List-valued fields (scenes, goals, voice samples, hints, …) are stored
//! as JSON text. Chapter→character and chapter→location links live in join
//! tables with a `position` column that preserves the chapter's own order.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS arcs (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT,
        status TEXT,
        current_section TEXT,
        sections_json TEXT NOT NULL DEFAULT '[]',
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chapters (
        id TEXT PRIMARY KEY,
        number INTEGER NOT NULL,
        title TEXT,
        content TEXT,
        outline_goal TEXT,
        outline_scenes_json TEXT NOT NULL DEFAULT '[]',
        outline_hook_ending TEXT,
        arc_id TEXT,
        FOREIGN KEY (arc_id) REFERENCES arcs(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT,
        appearance TEXT,
        personality TEXT,
        background TEXT,
        motivation_surface TEXT,
        motivation_deep TEXT,
        motivation_core TEXT,
        public_facet TEXT,
        private_facet TEXT,
        voice_samples_json TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT,
        significance TEXT,
        atmosphere TEXT,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chapter_characters (
        chapter_id TEXT NOT NULL,
        character_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (chapter_id, character_id),
        FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE,
        FOREIGN KEY (character_id) REFERENCES characters(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chapter_locations (
        chapter_id TEXT NOT NULL,
        location_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (chapter_id, location_id),
        FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE,
        FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS relationships (
        id TEXT PRIMARY KEY,
        from_character_id TEXT NOT NULL,
        to_character_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        bond TEXT,
        goals_json TEXT NOT NULL DEFAULT '[]',
        history TEXT,
        FOREIGN KEY (from_character_id) REFERENCES characters(id) ON DELETE CASCADE,
        FOREIGN KEY (to_character_id) REFERENCES characters(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS factions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT,
        ideology TEXT,
        goals_json TEXT NOT NULL DEFAULT '[]',
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS foreshadowing (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        planted_chapter INTEGER,
        hints_json TEXT NOT NULL DEFAULT '[]',
        payoff TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hooks (
        id TEXT PRIMARY KEY,
        chapter_id TEXT NOT NULL,
        kind TEXT,
        content TEXT NOT NULL,
        FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS world (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        power_system_json TEXT NOT NULL DEFAULT '{}',
        social_rules_json TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chapters_number ON chapters(number)",
    "CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_character_id)",
    "CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_character_id)",
    "CREATE INDEX IF NOT EXISTS idx_hooks_chapter_id ON hooks(chapter_id)",
];

/// Applies the schema to an open pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Creates the database if needed and applies the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}
