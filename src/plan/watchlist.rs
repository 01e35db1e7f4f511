use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{PageUpdate, Tier};
use crate::page_index::PageIndex;

pub const WATCHLIST_REASON: &str = "Scheduled watchlist update";

/// A page kept on a recurring schedule regardless of news.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub page_id: String,
    #[serde(default = "default_watchlist_tier")]
    pub tier: Tier,
    #[serde(default)]
    pub directions: String,
}

fn default_watchlist_tier() -> Tier {
    Tier::Standard
}

/// Watchlist pages whose `last_edited + update_frequency` has been reached by `today`.
/// Pages never edited are due; pages missing from the index or without a frequency are not.
pub fn due_watchlist_updates(
    entries: &[WatchlistEntry],
    index: &PageIndex,
    today: NaiveDate,
) -> Vec<PageUpdate> {
    entries
        .iter()
        .filter_map(|e| {
            let page = index.get(&e.page_id)?;
            let freq = page.update_frequency?;
            let due = match page.last_edited {
                None => true,
                // past the calendar range means never due
                Some(last) => last
                    .checked_add_days(Days::new(u64::from(freq)))
                    .is_some_and(|next| next <= today),
            };
            due.then(|| PageUpdate {
                page_id: page.id.clone(),
                page_title: page.title.clone(),
                reason: WATCHLIST_REASON.to_string(),
                suggested_tier: e.tier,
                relevant_news: Vec::new(),
                directions: e.directions.clone(),
            })
        })
        .collect()
}

/// Put due watchlist pages ahead of news-driven updates.
///
/// A watchlist page that already has a news-routed entry is merged in place: watchlist
/// directions come first, the tier is raised only if the watchlist tier outranks it.
/// Others are placed at the front, in watchlist order, so the budget pass admits them
/// before importance-sorted news updates.
pub fn inject_watchlist(updates: &[PageUpdate], due: &[PageUpdate]) -> Vec<PageUpdate> {
    let mut merged = updates.to_vec();
    let mut front = Vec::new();

    for w in due {
        match merged.iter_mut().find(|u| u.page_id == w.page_id) {
            Some(existing) => {
                existing.directions = format!(
                    "{}\n\nAlso from news routing: {}",
                    w.directions, existing.directions
                );
                existing.suggested_tier = existing.suggested_tier.raised_to(w.suggested_tier);
            }
            None => {
                if !front.iter().any(|f: &PageUpdate| f.page_id == w.page_id) {
                    front.push(w.clone());
                }
            }
        }
    }

    tracing::debug!(target: "plan", inserted = front.len(), "watchlist injected");
    front.extend(merged);
    front
}
