//! plan: page update plan types plus the three stages that shape it:
//! defensive dedup, watchlist injection and budget admission.

pub mod budget;
pub mod dedup;
pub mod watchlist;

pub use budget::{apply_budget_and_page_limits, BudgetOutcome, EXCEEDED_BUDGET, EXCEEDED_PAGE_LIMIT};
pub use dedup::deduplicate_page_updates;
pub use watchlist::{due_watchlist_updates, inject_watchlist, WatchlistEntry, WATCHLIST_REASON};

use serde::{Deserialize, Serialize};

use crate::ingest::truncate_chars;

/// Summaries attached to a page update are capped at this many chars.
pub const NEWS_SUMMARY_MAX_CHARS: usize = 200;

/// Depth of work for an existing page, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Polish,
    Standard,
    Deep,
}

impl Tier {
    pub fn rank(self) -> u8 {
        match self {
            Tier::Polish => 1,
            Tier::Standard => 2,
            Tier::Deep => 3,
        }
    }

    /// Dollar cost of executing one page update at this tier.
    pub fn cost(self) -> f64 {
        match self {
            Tier::Polish => 2.5,
            Tier::Standard => 6.5,
            Tier::Deep => 12.5,
        }
    }

    /// Lenient label parse for oracle output. Anything unrecognized is `Standard`,
    /// which keeps the 6.5 default cost for unknown tiers.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "polish" => Tier::Polish,
            "deep" => Tier::Deep,
            _ => Tier::Standard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Polish => "polish",
            Tier::Standard => "standard",
            Tier::Deep => "deep",
        }
    }

    /// `other` if it strictly outranks `self`, else `self`. Never downgrades.
    pub fn raised_to(self, other: Tier) -> Tier {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// Cost of a tier given by label; unknown labels cost the `standard` rate.
pub fn tier_cost(label: &str) -> f64 {
    Tier::from_label(label).cost()
}

/// Depth of work for a page that does not exist yet. Reported, not budget-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewPageTier {
    Budget,
    Standard,
    Premium,
}

impl NewPageTier {
    pub fn cost(self) -> f64 {
        match self {
            NewPageTier::Budget => 3.0,
            NewPageTier::Standard => 6.5,
            NewPageTier::Premium => 10.0,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "budget" => NewPageTier::Budget,
            "premium" => NewPageTier::Premium,
            _ => NewPageTier::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRef {
    pub title: String,
    pub url: String,
    pub summary: String,
}

impl NewsRef {
    pub fn new(title: &str, url: &str, summary: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            summary: truncate_chars(summary, NEWS_SUMMARY_MAX_CHARS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    pub page_id: String,
    pub page_title: String,
    pub reason: String,
    pub suggested_tier: Tier,
    #[serde(default)]
    pub relevant_news: Vec<NewsRef>,
    #[serde(default)]
    pub directions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPageSuggestion {
    pub suggested_title: String,
    pub suggested_id: String,
    pub reason: String,
    #[serde(default)]
    pub relevant_news: Vec<NewsRef>,
    pub suggested_tier: NewPageTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedReason {
    pub item: String,
    pub reason: String,
}

impl SkippedReason {
    pub fn new(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

/// The finalized plan for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlan {
    pub date: String,
    pub page_updates: Vec<PageUpdate>,
    pub new_page_suggestions: Vec<NewPageSuggestion>,
    pub skipped_reasons: Vec<SkippedReason>,
    /// Sum of tier costs of the admitted page updates.
    pub estimated_cost: f64,
}

/// Stable sort by descending reader importance; `importance` maps page id -> 0..=100.
pub fn sort_by_importance<F>(updates: &[PageUpdate], importance: F) -> Vec<PageUpdate>
where
    F: Fn(&str) -> u8,
{
    let mut out = updates.to_vec();
    out.sort_by_key(|u| std::cmp::Reverse(importance(&u.page_id)));
    out
}
