use std::collections::HashSet;

use crate::models::{Item, ItemKey};

/// Items in `current` whose identity key is absent from `previous`, in extraction order.
///
/// A brand with no previous state reports every item as new.
pub fn diff_new(previous: Option<&[Item]>, current: &[Item]) -> Vec<Item> {
    let seen: HashSet<ItemKey> = previous
        .unwrap_or_default()
        .iter()
        .map(Item::key)
        .collect();

    current
        .iter()
        .filter(|item| !seen.contains(&item.key()))
        .cloned()
        .collect()
}

/// Drop later duplicates by identity key, keeping first-seen order.
pub fn dedup_items(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.key()))
        .collect()
}
