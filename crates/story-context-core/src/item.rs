//! The context item model.
//!
//! Every entity category becomes a [`ContextItem`] tagged with a closed
//! [`ContextItemType`]. The type alone determines the item's [`Layer`] and
//! priority, so truncation order can be read straight off the table in
//! [`ContextItemType::priority`].
//!
//! | Layer | Types | Priority |
//! |-------|-------|----------|
//! | L1 chapter-local | content, outline, previous tail | 500, 490, 480 |
//! | L2 entity profiles | character, relationship, location, arc, faction | 400 – 360 |
//! | L3 plot devices | foreshadowing, hook | 300, 290 |
//! | L4 world rules | power system, social rules | 200, 190 |
//! | L5 caller-supplied | custom | 100 |
//!
//! Higher priority means kept longer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tokens::estimate_tokens;

/// One of the five priority bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Layer {
    ChapterLocal,
    EntityProfiles,
    PlotDevices,
    WorldRules,
    CallerSupplied,
}

impl Layer {
    fn base_priority(self) -> u32 {
        match self {
            Layer::ChapterLocal => 500,
            Layer::EntityProfiles => 400,
            Layer::PlotDevices => 300,
            Layer::WorldRules => 200,
            Layer::CallerSupplied => 100,
        }
    }
}

/// Closed set of context item categories.
///
/// Variant order is the fixed layer order used by the formatter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContextItemType {
    ChapterContent,
    ChapterOutline,
    PreviousChapterTail,
    Character,
    Relationship,
    Location,
    Arc,
    Faction,
    Foreshadowing,
    Hook,
    PowerSystem,
    SocialRules,
    Custom,
}

impl ContextItemType {
    /// All types in layer order.
    pub const ALL: [ContextItemType; 13] = [
        ContextItemType::ChapterContent,
        ContextItemType::ChapterOutline,
        ContextItemType::PreviousChapterTail,
        ContextItemType::Character,
        ContextItemType::Relationship,
        ContextItemType::Location,
        ContextItemType::Arc,
        ContextItemType::Faction,
        ContextItemType::Foreshadowing,
        ContextItemType::Hook,
        ContextItemType::PowerSystem,
        ContextItemType::SocialRules,
        ContextItemType::Custom,
    ];

    pub fn layer(self) -> Layer {
        use ContextItemType::*;
        match self {
            ChapterContent | ChapterOutline | PreviousChapterTail => Layer::ChapterLocal,
            Character | Relationship | Location | Arc | Faction => Layer::EntityProfiles,
            Foreshadowing | Hook => Layer::PlotDevices,
            PowerSystem | SocialRules => Layer::WorldRules,
            Custom => Layer::CallerSupplied,
        }
    }

    /// Position inside the layer; earlier positions outrank later ones.
    fn offset(self) -> u32 {
        use ContextItemType::*;
        match self {
            ChapterContent | Character | Foreshadowing | PowerSystem | Custom => 0,
            ChapterOutline | Relationship | Hook | SocialRules => 10,
            PreviousChapterTail | Location => 20,
            Arc => 30,
            Faction => 40,
        }
    }

    /// Static priority: layer base minus intra-layer offset.
    pub fn priority(self) -> u32 {
        self.layer().base_priority() - self.offset()
    }

    /// Stable snake_case name, used on the command line and in JSON.
    pub fn as_str(self) -> &'static str {
        use ContextItemType::*;
        match self {
            ChapterContent => "chapter_content",
            ChapterOutline => "chapter_outline",
            PreviousChapterTail => "previous_chapter_tail",
            Character => "character",
            Relationship => "relationship",
            Location => "location",
            Arc => "arc",
            Faction => "faction",
            Foreshadowing => "foreshadowing",
            Hook => "hook",
            PowerSystem => "power_system",
            SocialRules => "social_rules",
            Custom => "custom",
        }
    }

    /// Section heading used by the formatter.
    pub fn label(self) -> &'static str {
        use ContextItemType::*;
        match self {
            ChapterContent => "Current Chapter",
            ChapterOutline => "Chapter Outline",
            PreviousChapterTail => "Previous Chapter Ending",
            Character => "Characters",
            Relationship => "Relationships",
            Location => "Locations",
            Arc => "Story Arc",
            Faction => "Factions",
            Foreshadowing => "Foreshadowing",
            Hook => "Open Hooks",
            PowerSystem => "Power System",
            SocialRules => "Social Rules",
            Custom => "Notes",
        }
    }
}

impl fmt::Display for ContextItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextItemType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        ContextItemType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = ContextItemType::ALL.iter().map(|t| t.as_str()).collect();
                anyhow::anyhow!(
                    "unknown context item type '{}'. Must be one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

/// One unit of renderable text tagged with a category and priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextItem {
    #[serde(rename = "type")]
    pub item_type: ContextItemType,
    /// Source entity id; `None` for synthesized items.
    pub id: Option<String>,
    pub content: String,
    priority: u32,
}

impl ContextItem {
    /// Creates an item whose priority is taken from its type.
    pub fn new(item_type: ContextItemType, id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            item_type,
            id,
            content: content.into(),
            priority: item_type.priority(),
        }
    }

    /// A caller-supplied free-text item.
    pub fn custom(content: impl Into<String>) -> Self {
        Self::new(ContextItemType::Custom, None, content)
    }

    /// Always `item_type.priority()`.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn tokens(&self) -> usize {
        estimate_tokens(&self.content)
    }
}

/// Telemetry reported by the orchestrator after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub tokens_used: usize,
    pub item_count: usize,
    pub truncated: bool,
}

/// The final, post-truncation context.
///
/// Only [`crate::budget::truncate`] constructs this type, so `total_tokens`
/// always equals the sum of the item estimates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltContext {
    items: Vec<ContextItem>,
    total_tokens: usize,
    truncated: bool,
    dropped: usize,
}

impl BuiltContext {
    pub(crate) fn new(items: Vec<ContextItem>, total_tokens: usize, dropped: usize) -> Self {
        Self {
            items,
            total_tokens,
            truncated: dropped > 0,
            dropped,
        }
    }

    /// An empty context: no items, zero tokens, not truncated.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0)
    }

    pub fn items(&self) -> &[ContextItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ContextItem> {
        self.items
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Number of constructed items removed to satisfy the budget.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            tokens_used: self.total_tokens,
            item_count: self.items.len(),
            truncated: self.truncated,
        }
    }
}
