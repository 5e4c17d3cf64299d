//! Token budget enforcement.
//!
//! # Algorithm
//!
//! 1. Estimate each item's cost and sum the total.
//! 2. If the total fits the budget, keep everything.
//! 3. Otherwise build a removal queue ordered by `(priority, construction
//!    index)` so the lowest-priority, latest-constructed item comes off
//!    first, and drop items until the total fits or one item is left.
//! 4. Survivors keep their original order and content.
//!
//! A single remaining item is kept even if it alone exceeds the budget;
//! items are never split. Running out of budget is not an error; it sets
//! [`BuiltContext::truncated`].

use std::cmp::Reverse;

use tracing::debug;

use crate::item::{BuiltContext, ContextItem};

/// Applies `budget` to `items`, returning the kept set.
pub fn truncate(items: Vec<ContextItem>, budget: usize) -> BuiltContext {
    let costs: Vec<usize> = items.iter().map(ContextItem::tokens).collect();
    let mut total: usize = costs.iter().sum();

    if total <= budget {
        return BuiltContext::new(items, total, 0);
    }

    // Sorted so that `pop()` yields the next item to drop.
    let mut queue: Vec<usize> = (0..items.len()).collect();
    queue.sort_by_key(|&i| (Reverse(items[i].priority()), i));

    let mut keep = vec![true; items.len()];
    let mut remaining = items.len();
    while total > budget && remaining > 1 {
        let Some(i) = queue.pop() else { break };
        keep[i] = false;
        total -= costs[i];
        remaining -= 1;
        debug!(
            item_type = %items[i].item_type,
            id = items[i].id.as_deref().unwrap_or("-"),
            tokens = costs[i],
            total,
            budget,
            "dropped context item"
        );
    }

    let dropped = items.len() - remaining;
    let kept: Vec<ContextItem> = items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect();

    BuiltContext::new(kept, total, dropped)
}
