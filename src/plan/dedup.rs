use std::collections::HashMap;

use super::PageUpdate;

/// Collapse duplicate `page_id`s that survived merging.
///
/// First-seen order of distinct ids is preserved. The first occurrence is cloned, so the
/// caller's updates are never touched. Later duplicates append their news (no news
/// dedup), raise the tier only when strictly higher, and append directions on a new line
/// unless that exact text is already contained in the accumulated directions.
pub fn deduplicate_page_updates(updates: &[PageUpdate]) -> Vec<PageUpdate> {
    let mut out: Vec<PageUpdate> = Vec::with_capacity(updates.len());
    let mut pos: HashMap<&str, usize> = HashMap::new();

    for u in updates {
        match pos.get(u.page_id.as_str()) {
            None => {
                pos.insert(u.page_id.as_str(), out.len());
                out.push(u.clone());
            }
            Some(&i) => {
                let merged = &mut out[i];
                merged.relevant_news.extend(u.relevant_news.iter().cloned());
                merged.suggested_tier = merged.suggested_tier.raised_to(u.suggested_tier);
                if !u.directions.is_empty() && !merged.directions.contains(&u.directions) {
                    merged.directions.push('\n');
                    merged.directions.push_str(&u.directions);
                }
            }
        }
    }

    out
}
