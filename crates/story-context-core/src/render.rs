//! Per-entity rendering shared by the chapter and global builders.
//!
//! Every renderer goes through [`ProfileLines`], which emits a line only
//! when its value is present and non-blank. A missing optional field is
//! never an error; it simply has no line.
//!
//! Each entity has a one-line headline (`name(role)`, `name(status)`, …).
//! Richer renderings always start with that exact headline, so a
//! [`Detail::Summary`] rendering is a prefix of every richer one.

use crate::models::{
    Arc, Chapter, ChapterOutline, Character, Faction, Foreshadowing, Hook, Location,
    PowerSystem, Relationship,
};

/// Separator for list-valued sub-fields.
pub const LIST_SEPARATOR: &str = "; ";

/// How much of an entity to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Headline only.
    Summary,
    /// What a chapter-scoped build carries.
    Standard,
    /// Everything stored.
    Full,
}

/// Returns the trimmed value if it is present and non-blank.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Accumulates labeled lines, omitting absent fields.
#[derive(Debug, Default)]
pub struct ProfileLines {
    lines: Vec<String>,
}

impl ProfileLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unlabeled first line.
    pub fn headline(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.lines.push(text);
        }
        self
    }

    /// `label: value`, or nothing if the value is absent.
    pub fn field(mut self, label: &str, value: Option<&str>) -> Self {
        if let Some(v) = present(value) {
            self.lines.push(format!("{}: {}", label, v));
        }
        self
    }

    /// `label: a; b; c`, skipping blank entries; nothing if none remain.
    pub fn list(self, label: &str, values: &[String]) -> Self {
        self.list_with(label, values, LIST_SEPARATOR)
    }

    pub fn list_with(mut self, label: &str, values: &[String], separator: &str) -> Self {
        let kept: Vec<&str> = values
            .iter()
            .filter_map(|v| present(Some(v.as_str())))
            .collect();
        if !kept.is_empty() {
            self.lines.push(format!("{}: {}", label, kept.join(separator)));
        }
        self
    }

    /// One `- entry` line per non-blank value.
    pub fn bullets(mut self, values: &[String]) -> Self {
        for v in values.iter().filter_map(|v| present(Some(v.as_str()))) {
            self.lines.push(format!("- {}", v));
        }
        self
    }

    /// Applies `f` only when `cond` holds.
    pub fn when(self, cond: bool, f: impl FnOnce(Self) -> Self) -> Self {
        if cond {
            f(self)
        } else {
            self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

fn with_qualifier(name: &str, qualifier: Option<&str>) -> String {
    match present(qualifier) {
        Some(q) => format!("{}({})", name.trim(), q),
        None => name.trim().to_string(),
    }
}

// ── Characters ──────────────────────────────────────────────────────────

pub fn character_headline(c: &Character) -> String {
    with_qualifier(&c.name, c.role.as_deref())
}

pub fn render_character(c: &Character, detail: Detail) -> String {
    let full = detail == Detail::Full;
    ProfileLines::new()
        .headline(character_headline(c))
        .when(detail != Detail::Summary, |p| {
            p.field("Appearance", c.appearance.as_deref())
                .when(full, |p| {
                    p.field("Personality", c.personality.as_deref())
                        .field("Background", c.background.as_deref())
                })
                .field("Surface motivation", c.motivation.surface.as_deref())
                .field("Deep motivation", c.motivation.deep.as_deref())
                .field("Core motivation", c.motivation.core.as_deref())
                .when(full, |p| {
                    p.field("Public facet", c.public_facet.as_deref())
                        .field("Private facet", c.private_facet.as_deref())
                })
                .list("Voice", &c.voice_samples)
        })
        .finish()
}

/// A character profile as carried in chapter context.
pub fn render_character_profile(c: &Character) -> String {
    render_character(c, Detail::Standard)
}

// ── Relationships ───────────────────────────────────────────────────────

pub fn relationship_headline(rel: &Relationship, from_name: &str, to_name: &str) -> String {
    format!("{} → {}: {}", from_name.trim(), to_name.trim(), rel.kind.trim())
}

/// Renders a relationship with both sides named. Callers resolve the
/// names; ids never appear in the output.
pub fn render_relationship(
    rel: &Relationship,
    from_name: &str,
    to_name: &str,
    detail: Detail,
) -> String {
    ProfileLines::new()
        .headline(relationship_headline(rel, from_name, to_name))
        .when(detail != Detail::Summary, |p| {
            p.field("Bond", rel.bond.as_deref())
                .list("Goals", &rel.goals)
                .when(detail == Detail::Full, |p| {
                    p.field("History", rel.history.as_deref())
                })
        })
        .finish()
}

// ── Locations, factions, arcs ───────────────────────────────────────────

pub fn location_headline(loc: &Location) -> String {
    with_qualifier(&loc.name, loc.kind.as_deref())
}

pub fn render_location(loc: &Location, detail: Detail) -> String {
    ProfileLines::new()
        .headline(location_headline(loc))
        .when(detail != Detail::Summary, |p| {
            p.field("Significance", loc.significance.as_deref())
                .field("Atmosphere", loc.atmosphere.as_deref())
                .when(detail == Detail::Full, |p| {
                    p.field("Description", loc.description.as_deref())
                })
        })
        .finish()
}

pub fn faction_headline(f: &Faction) -> String {
    with_qualifier(&f.name, f.kind.as_deref())
}

pub fn render_faction(f: &Faction, detail: Detail) -> String {
    ProfileLines::new()
        .headline(faction_headline(f))
        .when(detail != Detail::Summary, |p| {
            p.field("Ideology", f.ideology.as_deref())
                .list("Goals", &f.goals)
                .when(detail == Detail::Full, |p| {
                    p.field("Description", f.description.as_deref())
                })
        })
        .finish()
}

pub fn arc_headline(arc: &Arc) -> String {
    with_qualifier(&arc.name, arc.status.as_deref())
}

pub fn render_arc(arc: &Arc, detail: Detail) -> String {
    ProfileLines::new()
        .headline(arc_headline(arc))
        .when(detail != Detail::Summary, |p| {
            p.field("Type", arc.kind.as_deref())
                .field("Current section", arc.current_section.as_deref())
                .when(detail == Detail::Full, |p| {
                    p.list_with("Sections", &arc.sections, " > ")
                        .field("Description", arc.description.as_deref())
                })
        })
        .finish()
}

// ── Plot devices ────────────────────────────────────────────────────────

/// Foreshadowing as seen from `chapter_number`: only hints dropped so
/// far, and never the payoff.
pub fn render_foreshadowing_at(f: &Foreshadowing, chapter_number: i64) -> String {
    let hints: Vec<String> = f
        .hints
        .iter()
        .filter(|h| h.chapter <= chapter_number)
        .map(|h| h.text.clone())
        .collect();
    ProfileLines::new()
        .headline(f.content.trim())
        .list("Hints", &hints)
        .finish()
}

pub fn render_foreshadowing(f: &Foreshadowing, detail: Detail) -> String {
    let hints: Vec<String> = f
        .hints
        .iter()
        .map(|h| format!("ch.{} {}", h.chapter, h.text.trim()))
        .collect();
    let planted = f.planted_chapter.map(|n| n.to_string());
    ProfileLines::new()
        .headline(f.content.trim())
        .when(detail != Detail::Summary, |p| {
            p.field("Status", Some(f.status.as_str()))
                .field("Planted in chapter", planted.as_deref())
                .list("Hints", &hints)
                .when(detail == Detail::Full, |p| p.field("Payoff", f.payoff.as_deref()))
        })
        .finish()
}

pub fn render_hook(h: &Hook) -> String {
    match present(h.kind.as_deref()) {
        Some(kind) => format!("[{}] {}", kind, h.content.trim()),
        None => h.content.trim().to_string(),
    }
}

// ── World rules ─────────────────────────────────────────────────────────

pub fn render_power_system(ps: &PowerSystem) -> String {
    ProfileLines::new()
        .field("Name", ps.name.as_deref())
        .list_with("Levels", &ps.levels, " > ")
        .list("Rules", &ps.rules)
        .finish()
}

pub fn render_social_rules(rules: &[String]) -> String {
    ProfileLines::new().bullets(rules).finish()
}

// ── Chapters ────────────────────────────────────────────────────────────

pub fn render_outline(outline: &ChapterOutline) -> String {
    ProfileLines::new()
        .field("Goal", outline.goal.as_deref())
        .list("Scenes", &outline.scenes)
        .field("Hook ending", outline.hook_ending.as_deref())
        .finish()
}

/// The last `paragraphs` non-blank lines of a chapter body, or `None` if
/// the chapter has no body.
pub fn chapter_tail(chapter: &Chapter, paragraphs: usize) -> Option<String> {
    let body = present(chapter.content.as_deref())?;
    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(paragraphs);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        None
    } else {
        Some(tail)
    }
}
