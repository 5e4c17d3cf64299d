//! Item collection shared by the chapter and global builders.

use crate::item::{ContextItem, ContextItemType};

/// Collects items in construction order.
///
/// Excluded types and blank content are dropped at the door, so every item
/// that reaches the truncator costs at least one token.
pub(crate) struct ItemSink<'o> {
    exclude: &'o [ContextItemType],
    items: Vec<ContextItem>,
}

impl<'o> ItemSink<'o> {
    pub(crate) fn new(exclude: &'o [ContextItemType]) -> Self {
        Self {
            exclude,
            items: Vec::new(),
        }
    }

    pub(crate) fn wants(&self, item_type: ContextItemType) -> bool {
        !self.exclude.contains(&item_type)
    }

    pub(crate) fn push(&mut self, item_type: ContextItemType, id: Option<&str>, content: String) {
        if !self.wants(item_type) || content.trim().is_empty() {
            return;
        }
        self.items
            .push(ContextItem::new(item_type, id.map(str::to_string), content));
    }

    pub(crate) fn push_item(&mut self, item: ContextItem) {
        let ContextItem {
            item_type,
            id,
            content,
            ..
        } = item;
        self.push(item_type, id.as_deref(), content);
    }

    pub(crate) fn into_items(self) -> Vec<ContextItem> {
        self.items
    }
}

/// `ids` with repeats removed, first occurrence kept.
pub(crate) fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content_skipped() {
        let mut sink = ItemSink::new(&[]);
        sink.push(ContextItemType::Character, Some("c1"), "   \n ".into());
        sink.push(ContextItemType::Character, Some("c2"), String::new());
        sink.push(ContextItemType::Character, Some("c3"), "Ada".into());
        let items = sink.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("c3"));
    }

    #[test]
    fn test_excluded_type_skipped() {
        let exclude = [ContextItemType::Hook];
        let mut sink = ItemSink::new(&exclude);
        assert!(!sink.wants(ContextItemType::Hook));
        sink.push_item(ContextItem::new(ContextItemType::Hook, None, "open door"));
        sink.push_item(ContextItem::custom("note"));
        let items = sink.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type, ContextItemType::Custom);
    }

    #[test]
    fn test_unique_ids_keeps_first_occurrence() {
        let ids: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_ids(&ids), vec!["b", "a", "c"]);
    }
}
