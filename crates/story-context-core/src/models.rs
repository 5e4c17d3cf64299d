//! Story-bible data models.
//!
//! These are the records the context builders read through
//! [`StoryStore`](crate::store::StoryStore). Optional text fields are
//! `Option<String>` and list fields default to empty, so partially filled
//! entities deserialize cleanly and render with the missing lines omitted.

use serde::{Deserialize, Serialize};

/// A chapter and its foreign keys into the rest of the bible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub id: String,
    /// Chronological position; the previous chapter is the greatest
    /// number below this one.
    pub number: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub outline: ChapterOutline,
    #[serde(default)]
    pub character_ids: Vec<String>,
    #[serde(default)]
    pub location_ids: Vec<String>,
    #[serde(default)]
    pub arc_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub scenes: Vec<String>,
    #[serde(default)]
    pub hook_ending: Option<String>,
}

/// Three layers of what drives a character, from visible to hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motivation {
    #[serde(default)]
    pub surface: Option<String>,
    #[serde(default)]
    pub deep: Option<String>,
    #[serde(default)]
    pub core: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub motivation: Motivation,
    #[serde(default)]
    pub public_facet: Option<String>,
    #[serde(default)]
    pub private_facet: Option<String>,
    #[serde(default)]
    pub voice_samples: Vec<String>,
}

/// A directed relationship between two characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub from_character_id: String,
    pub to_character_id: String,
    pub kind: String,
    #[serde(default)]
    pub bond: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub history: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub significance: Option<String>,
    #[serde(default)]
    pub atmosphere: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub ideology: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_section: Option<String>,
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeshadowingStatus {
    #[default]
    Active,
    Resolved,
    Abandoned,
}

impl ForeshadowingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ForeshadowingStatus::Active => "active",
            ForeshadowingStatus::Resolved => "resolved",
            ForeshadowingStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "active" => Ok(ForeshadowingStatus::Active),
            "resolved" => Ok(ForeshadowingStatus::Resolved),
            "abandoned" => Ok(ForeshadowingStatus::Abandoned),
            other => anyhow::bail!("unknown foreshadowing status: '{}'", other),
        }
    }
}

/// A hint dropped in a given chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowingHint {
    /// Chapter number the hint appears in.
    pub chapter: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foreshadowing {
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub status: ForeshadowingStatus,
    /// Chapter number where it was planted.
    #[serde(default)]
    pub planted_chapter: Option<i64>,
    #[serde(default)]
    pub hints: Vec<ForeshadowingHint>,
    #[serde(default)]
    pub payoff: Option<String>,
}

impl Foreshadowing {
    pub fn is_active(&self) -> bool {
        self.status == ForeshadowingStatus::Active
    }

    /// True if planted or hinted at in `chapter_number` or earlier.
    pub fn visible_at(&self, chapter_number: i64) -> bool {
        self.planted_chapter.is_some_and(|n| n <= chapter_number)
            || self.hints.iter().any(|h| h.chapter <= chapter_number)
    }
}

/// A narrative hook left open at the end of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default)]
    pub id: String,
    pub chapter_id: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSystem {
    #[serde(default)]
    pub name: Option<String>,
    /// Ranks from lowest to highest.
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl PowerSystem {
    pub fn is_empty(&self) -> bool {
        self.name.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.levels.is_empty()
            && self.rules.is_empty()
    }
}

/// Story-wide rules; one per story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSetting {
    #[serde(default)]
    pub power_system: PowerSystem,
    #[serde(default)]
    pub social_rules: Vec<String>,
}

/// A whole story bible in one document; the import format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBible {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub factions: Vec<Faction>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
    #[serde(default)]
    pub foreshadowing: Vec<Foreshadowing>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(default)]
    pub world: Option<WorldSetting>,
}
