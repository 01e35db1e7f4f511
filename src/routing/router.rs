use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use tracing::{info, warn};

use crate::digest::DigestItem;
use crate::llm::{extract_json_object, DynCompletion};
use crate::page_index::{PageIndex, PageIndexEntry};
use crate::plan::{NewPageTier, Tier};

/// Unmatched items below this score never reach the router.
pub const DEFAULT_ROUTER_MIN_SCORE: u8 = 40;
/// Pages offered to the router as possible targets.
pub const ROUTER_PAGE_CONTEXT: usize = 200;

#[async_trait]
pub trait RoutingOracle: Send + Sync {
    /// Route `candidates` onto `pages`. Returns raw oracle output.
    async fn route(&self, candidates: &[DigestItem], pages: &[&PageIndexEntry]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedUpdate {
    pub page_id: String,
    /// 1-based into the candidate list
    pub relevant_items: Vec<usize>,
    pub reason: String,
    pub suggested_tier: Tier,
    pub directions: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedNewPage {
    pub suggested_title: String,
    pub suggested_id: String,
    pub reason: String,
    pub relevant_items: Vec<usize>,
    pub suggested_tier: NewPageTier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedSkip {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterDecision {
    pub page_updates: Vec<RoutedUpdate>,
    pub new_pages: Vec<RoutedNewPage>,
    pub skipped: Vec<RoutedSkip>,
}

impl RouterDecision {
    pub fn is_empty(&self) -> bool {
        self.page_updates.is_empty() && self.new_pages.is_empty() && self.skipped.is_empty()
    }
}

// Wire shapes. Tiers arrive as free strings and are mapped onto the enums.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDecision {
    #[serde(default)]
    page_updates: Vec<RawUpdate>,
    #[serde(default)]
    new_pages: Vec<RawNewPage>,
    #[serde(default)]
    skipped: Vec<RawSkip>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUpdate {
    page_id: String,
    #[serde(default)]
    relevant_items: Vec<usize>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    suggested_tier: String,
    #[serde(default)]
    directions: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNewPage {
    suggested_title: String,
    suggested_id: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    relevant_items: Vec<usize>,
    #[serde(default)]
    suggested_tier: String,
}

#[derive(Deserialize)]
struct RawSkip {
    index: usize,
    #[serde(default)]
    reason: String,
}

/// Strict parse of a router response. Any schema violation rejects the whole decision.
pub fn parse_router_response(raw: &str) -> Option<RouterDecision> {
    let json = extract_json_object(raw)?;
    let d: RawDecision = serde_json::from_str(json).ok()?;
    Some(RouterDecision {
        page_updates: d
            .page_updates
            .into_iter()
            .map(|u| RoutedUpdate {
                page_id: u.page_id,
                relevant_items: u.relevant_items,
                reason: u.reason,
                suggested_tier: Tier::from_label(&u.suggested_tier),
                directions: u.directions,
            })
            .collect(),
        new_pages: d
            .new_pages
            .into_iter()
            .map(|p| RoutedNewPage {
                suggested_title: p.suggested_title,
                suggested_id: p.suggested_id,
                reason: p.reason,
                relevant_items: p.relevant_items,
                suggested_tier: NewPageTier::from_label(&p.suggested_tier),
            })
            .collect(),
        skipped: d
            .skipped
            .into_iter()
            .map(|s| RoutedSkip {
                index: s.index,
                reason: s.reason,
            })
            .collect(),
    })
}

/// Unmatched items worth an oracle call.
pub fn prefilter_candidates(unmatched: &[DigestItem], min_score: u8) -> Vec<DigestItem> {
    unmatched
        .iter()
        .filter(|d| d.relevance_score >= min_score)
        .cloned()
        .collect()
}

/// Ask the oracle to route `candidates`. An unreachable oracle or a malformed answer yields
/// the empty decision; updates naming pages outside the index are dropped.
pub async fn route_candidates(
    candidates: &[DigestItem],
    oracle: &dyn RoutingOracle,
    index: &PageIndex,
) -> RouterDecision {
    if candidates.is_empty() {
        return RouterDecision::default();
    }

    let pages = index.top_by_importance(ROUTER_PAGE_CONTEXT);
    let raw = match oracle.route(candidates, &pages).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(target: "routing", error = ?e, "router unavailable, routing nothing");
            counter!("auto_update_router_failures_total").increment(1);
            return RouterDecision::default();
        }
    };

    let Some(mut decision) = parse_router_response(&raw) else {
        warn!(target: "routing", "malformed router output, routing nothing");
        counter!("auto_update_router_failures_total").increment(1);
        return RouterDecision::default();
    };

    decision.page_updates.retain(|u| {
        let known = index.contains(&u.page_id);
        if !known {
            warn!(target: "routing", page = %u.page_id, "router named an unknown page, ignoring");
        }
        known
    });

    info!(
        target: "routing",
        candidates = candidates.len(),
        updates = decision.page_updates.len(),
        new_pages = decision.new_pages.len(),
        skipped = decision.skipped.len(),
        "router decision"
    );
    decision
}

/// Router backed by the shared chat-completion client.
pub struct LlmRouter {
    llm: DynCompletion,
}

impl LlmRouter {
    pub fn new(llm: DynCompletion) -> Self {
        Self { llm }
    }
}

const ROUTER_SYSTEM: &str = "You map news items onto knowledge-base pages. Return one JSON object: \
{\"pageUpdates\": [{\"pageId\", \"relevantItems\": [1-based item numbers], \"reason\", \
\"suggestedTier\": \"polish\"|\"standard\"|\"deep\", \"directions\"}], \"newPages\": [{\"suggestedTitle\", \
\"suggestedId\", \"reason\", \"relevantItems\", \"suggestedTier\": \"budget\"|\"standard\"|\"premium\"}], \
\"skipped\": [{\"index\", \"reason\"}]}. Only use page ids from the list. Output only JSON.";

#[async_trait]
impl RoutingOracle for LlmRouter {
    async fn route(&self, candidates: &[DigestItem], pages: &[&PageIndexEntry]) -> Result<String> {
        let mut user = String::from("Pages (id | title | importance):\n");
        for p in pages {
            user.push_str(&format!("{} | {} | {}\n", p.id, p.title, p.reader_importance));
        }
        user.push_str("\nNews items:\n");
        for (i, d) in candidates.iter().enumerate() {
            user.push_str(&format!(
                "{}. ({}) {}\n   {}\n",
                i + 1,
                d.relevance_score,
                d.item.title,
                d.item.summary
            ));
        }
        self.llm.complete(ROUTER_SYSTEM, &user).await
    }
}
