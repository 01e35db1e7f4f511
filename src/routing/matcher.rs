use std::collections::HashMap;

use crate::digest::DigestItem;
use crate::page_index::PageIndex;

/// Items grouped by the known page they name, plus everything that named none.
#[derive(Debug, Clone, Default)]
pub struct EntityMatches {
    /// (page id, items) in first-match order.
    pub buckets: Vec<(String, Vec<DigestItem>)>,
    pub unmatched: Vec<DigestItem>,
}

impl EntityMatches {
    pub fn matched_pages(&self) -> usize {
        self.buckets.len()
    }
}

/// Route items tagged with a known page id straight to that page. No oracle involved.
///
/// An item naming several known pages lands in each of their buckets.
pub fn match_entities(items: &[DigestItem], index: &PageIndex) -> EntityMatches {
    let mut out = EntityMatches::default();
    let mut pos: HashMap<String, usize> = HashMap::new();

    for item in items {
        let mut matched = false;
        for (i, entity) in item.entities.iter().enumerate() {
            if !index.contains(entity) || item.entities[..i].contains(entity) {
                continue;
            }
            matched = true;
            let slot = *pos.entry(entity.clone()).or_insert_with(|| {
                out.buckets.push((entity.clone(), Vec::new()));
                out.buckets.len() - 1
            });
            out.buckets[slot].1.push(item.clone());
        }
        if !matched {
            out.unmatched.push(item.clone());
        }
    }

    tracing::debug!(
        target: "routing",
        pages = out.buckets.len(),
        unmatched = out.unmatched.len(),
        "entity match done"
    );
    out
}
