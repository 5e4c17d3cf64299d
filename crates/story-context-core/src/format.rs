//! Serializes kept items into one annotated text block.
//!
//! ```text
//! <story_context>
//! ## Current Chapter
//! ...
//!
//! ## Characters
//! 林舟(主角)
//! Appearance: ...
//!
//! 老周(师父)
//! </story_context>
//! ```
//!
//! Items are grouped by type in layer order and, within a type, kept in
//! construction order. The formatter never drops or rewrites content.

use crate::item::{ContextItem, ContextItemType};

pub const CONTEXT_OPEN: &str = "<story_context>";
pub const CONTEXT_CLOSE: &str = "</story_context>";

/// Renders all `items` inside the context envelope.
pub fn format_context(items: &[ContextItem]) -> String {
    format_items_excluding(items, &[])
}

/// Renders `items` except those whose type is in `exclude`.
///
/// Used when a caller passes part of the context to the model separately,
/// e.g. the chapter body as the text being continued.
pub fn format_items_excluding(items: &[ContextItem], exclude: &[ContextItemType]) -> String {
    let mut sections: Vec<String> = Vec::new();

    for item_type in ContextItemType::ALL {
        if exclude.contains(&item_type) {
            continue;
        }
        let bodies: Vec<&str> = items
            .iter()
            .filter(|i| i.item_type == item_type)
            .map(|i| i.content.as_str())
            .collect();
        if bodies.is_empty() {
            continue;
        }
        sections.push(format!("## {}\n{}", item_type.label(), bodies.join("\n\n")));
    }

    let mut out = String::from(CONTEXT_OPEN);
    out.push('\n');
    for section in &sections {
        out.push_str(section);
        out.push_str("\n\n");
    }
    if !sections.is_empty() {
        // Keep a single newline before the closing marker.
        out.pop();
    }
    out.push_str(CONTEXT_CLOSE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(t: ContextItemType, content: &str) -> ContextItem {
        ContextItem::new(t, None, content)
    }

    #[test]
    fn test_empty_is_bare_envelope() {
        assert_eq!(format_context(&[]), "<story_context>\n</story_context>");
    }

    #[test]
    fn test_groups_in_layer_order() {
        let items = vec![
            item(ContextItemType::Custom, "remember the rain"),
            item(ContextItemType::Character, "林舟(主角)"),
            item(ContextItemType::ChapterContent, "从前有一座山"),
            item(ContextItemType::Character, "老周(师父)"),
        ];
        let text = format_context(&items);
        assert_eq!(
            text,
            "<story_context>\n\
             ## Current Chapter\n从前有一座山\n\n\
             ## Characters\n林舟(主角)\n\n老周(师父)\n\n\
             ## Notes\nremember the rain\n\
             </story_context>"
        );
    }

    #[test]
    fn test_excluding_chapter_content() {
        let items = vec![
            item(ContextItemType::ChapterContent, "BODY"),
            item(ContextItemType::ChapterOutline, "Goal: escape"),
        ];
        let text = format_items_excluding(&items, &[ContextItemType::ChapterContent]);
        assert!(!text.contains("BODY"));
        assert!(text.contains("## Chapter Outline\nGoal: escape"));
    }

    #[test]
    fn test_never_drops_content() {
        let items: Vec<ContextItem> = ContextItemType::ALL
            .iter()
            .map(|t| item(*t, &format!("content of {}", t)))
            .collect();
        let text = format_context(&items);
        for i in &items {
            assert!(text.contains(&i.content));
        }
        assert!(text.starts_with(CONTEXT_OPEN));
        assert!(text.ends_with(CONTEXT_CLOSE));
    }
}
