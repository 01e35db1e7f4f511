use std::collections::HashMap;

use super::matcher::EntityMatches;
use super::router::RouterDecision;
use crate::digest::DigestItem;
use crate::page_index::PageIndex;
use crate::plan::{NewPageSuggestion, NewsRef, PageUpdate, SkippedReason, Tier};

/// Entity-matched pages get `standard` when any item scores at least this, else `polish`.
pub const STANDARD_TIER_MIN_SCORE: u8 = 70;

#[derive(Debug, Clone, Default)]
pub struct MergedRouting {
    pub page_updates: Vec<PageUpdate>,
    pub new_page_suggestions: Vec<NewPageSuggestion>,
    pub skipped_reasons: Vec<SkippedReason>,
}

fn news_ref(d: &DigestItem) -> NewsRef {
    NewsRef::new(&d.item.title, &d.item.url, &d.item.summary)
}

/// 1-based candidate indices -> news refs. Out-of-range indices are ignored.
fn resolve(indices: &[usize], candidates: &[DigestItem]) -> Vec<NewsRef> {
    indices
        .iter()
        .filter_map(|&i| candidates.get(i.checked_sub(1)?))
        .map(news_ref)
        .collect()
}

/// Seed one update per entity bucket, then fold in the router's decisions.
///
/// Folding into an existing page appends news without dedup, raises the tier only when
/// the router's tier outranks it, and always appends directions on a new line.
pub fn merge_routing(
    matches: &EntityMatches,
    candidates: &[DigestItem],
    decision: &RouterDecision,
    index: &PageIndex,
) -> MergedRouting {
    let mut updates: Vec<PageUpdate> = Vec::new();
    let mut pos: HashMap<String, usize> = HashMap::new();

    for (page_id, items) in &matches.buckets {
        let tier = if items.iter().any(|d| d.relevance_score >= STANDARD_TIER_MIN_SCORE) {
            Tier::Standard
        } else {
            Tier::Polish
        };
        let title = index
            .get(page_id)
            .map(|p| p.title.clone())
            .unwrap_or_else(|| page_id.clone());
        pos.insert(page_id.clone(), updates.len());
        updates.push(PageUpdate {
            page_id: page_id.clone(),
            page_title: title,
            reason: format!("Entity match: {} news item(s)", items.len()),
            suggested_tier: tier,
            relevant_news: items.iter().map(news_ref).collect(),
            directions: items
                .iter()
                .map(|d| d.item.title.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        });
    }

    for routed in &decision.page_updates {
        let news = resolve(&routed.relevant_items, candidates);
        match pos.get(&routed.page_id) {
            Some(&i) => {
                let existing = &mut updates[i];
                existing.relevant_news.extend(news);
                existing.suggested_tier = existing.suggested_tier.raised_to(routed.suggested_tier);
                existing.directions.push('\n');
                existing.directions.push_str(&routed.directions);
            }
            None => {
                let title = index
                    .get(&routed.page_id)
                    .map(|p| p.title.clone())
                    .unwrap_or_else(|| routed.page_id.clone());
                pos.insert(routed.page_id.clone(), updates.len());
                updates.push(PageUpdate {
                    page_id: routed.page_id.clone(),
                    page_title: title,
                    reason: routed.reason.clone(),
                    suggested_tier: routed.suggested_tier,
                    relevant_news: news,
                    directions: routed.directions.clone(),
                });
            }
        }
    }

    let new_page_suggestions = decision
        .new_pages
        .iter()
        .map(|p| NewPageSuggestion {
            suggested_title: p.suggested_title.clone(),
            suggested_id: p.suggested_id.clone(),
            reason: p.reason.clone(),
            relevant_news: resolve(&p.relevant_items, candidates),
            suggested_tier: p.suggested_tier,
        })
        .collect();

    let skipped_reasons = decision
        .skipped
        .iter()
        .map(|s| {
            let item = s
                .index
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .map(|d| d.item.title.clone())
                .unwrap_or_else(|| format!("item #{}", s.index));
            SkippedReason::new(item, s.reason.clone())
        })
        .collect();

    MergedRouting {
        page_updates: updates,
        new_page_suggestions,
        skipped_reasons,
    }
}
