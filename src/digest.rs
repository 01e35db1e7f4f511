//! digest.rs: relevance scoring of deduplicated feed items.
//!
//! The scorer itself is an opaque oracle returning raw text. This module owns batching,
//! the strict response schema and the soft fallback: a malformed batch is never dropped,
//! every item in it gets a neutral score instead. Only an unreachable scorer is fatal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ingest::types::FeedItem;
use crate::llm::{extract_json_array, DynCompletion};
use crate::page_index::PageIndex;

pub const SCORER_BATCH_SIZE: usize = 30;
pub const SCORER_PAGE_SAMPLE: usize = 150;
pub const DEFAULT_RELEVANCE_FLOOR: u8 = 20;
/// Score assigned to every item of a batch whose response could not be parsed.
pub const FALLBACK_SCORE: u8 = 50;

/// A feed item after scoring. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestItem {
    #[serde(flatten)]
    pub item: FeedItem,
    pub relevance_score: u8,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Page ids the scorer believes the item is about.
    #[serde(default)]
    pub entities: Vec<String>,
}

#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Score one batch. Returns the raw oracle output; `Err` means the oracle is unavailable.
    async fn score_batch(&self, batch: &[FeedItem], known_page_ids: &[String]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreEntry {
    /// 1-based into the batch
    index: usize,
    relevance_score: f64,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    skip: bool,
}

/// Parse a scorer response for `batch`. `None` when the output does not match the schema.
/// Entries flagged `skip` or pointing outside the batch are left out.
pub fn parse_score_response(raw: &str, batch: &[FeedItem]) -> Option<Vec<DigestItem>> {
    let json = extract_json_array(raw)?;
    let entries: Vec<ScoreEntry> = serde_json::from_str(json).ok()?;
    Some(
        entries
            .into_iter()
            .filter(|e| !e.skip)
            .filter_map(|e| {
                let item = batch.get(e.index.checked_sub(1)?)?;
                Some(DigestItem {
                    item: item.clone(),
                    relevance_score: e.relevance_score.clamp(0.0, 100.0).round() as u8,
                    topics: e.topics,
                    entities: e.entities,
                })
            })
            .collect(),
    )
}

/// Neutral scores for a batch the scorer answered with garbage.
pub fn fallback_batch(batch: &[FeedItem]) -> Vec<DigestItem> {
    batch
        .iter()
        .map(|it| DigestItem {
            item: it.clone(),
            relevance_score: FALLBACK_SCORE,
            topics: it.categories.clone(),
            entities: Vec::new(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct DigestOptions {
    pub batch_size: usize,
    pub page_sample: usize,
    pub relevance_floor: u8,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            batch_size: SCORER_BATCH_SIZE,
            page_sample: SCORER_PAGE_SAMPLE,
            relevance_floor: DEFAULT_RELEVANCE_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Digest {
    /// Sorted by descending relevance, floor applied.
    pub items: Vec<DigestItem>,
    pub fallback_batches: usize,
}

/// Score all items in batches, merge, sort descending by score and drop those under the
/// floor. Fails only when the oracle cannot be reached.
pub async fn build_digest(
    items: &[FeedItem],
    scorer: &dyn ScoringOracle,
    index: &PageIndex,
    opts: DigestOptions,
) -> Result<Digest> {
    let known_ids = index.sample_ids(opts.page_sample);
    let mut digest = Digest::default();

    for (n, batch) in items.chunks(opts.batch_size.max(1)).enumerate() {
        let raw = scorer
            .score_batch(batch, &known_ids)
            .await
            .with_context(|| format!("relevance scorer unavailable (batch {})", n + 1))?;
        match parse_score_response(&raw, batch) {
            Some(mut scored) => digest.items.append(&mut scored),
            None => {
                warn!(target: "digest", batch = n + 1, size = batch.len(), "malformed scorer output, using fallback scores");
                counter!("auto_update_scorer_fallback_total").increment(1);
                digest.fallback_batches += 1;
                digest.items.append(&mut fallback_batch(batch));
            }
        }
    }

    digest
        .items
        .sort_by_key(|d| std::cmp::Reverse(d.relevance_score));
    let before = digest.items.len();
    digest
        .items
        .retain(|d| d.relevance_score >= opts.relevance_floor);

    info!(
        target: "digest",
        scored = before,
        relevant = digest.items.len(),
        floor = opts.relevance_floor,
        fallback_batches = digest.fallback_batches,
        "digest built"
    );
    Ok(digest)
}

/// Scorer backed by the shared chat-completion client.
pub struct LlmScorer {
    llm: DynCompletion,
}

impl LlmScorer {
    pub fn new(llm: DynCompletion) -> Self {
        Self { llm }
    }
}

const SCORER_SYSTEM: &str = "You triage news for a knowledge base. For each numbered item return a JSON array \
of objects {\"index\": <1-based>, \"relevanceScore\": 0-100, \"topics\": [..], \"entities\": [page ids from the \
known list only], \"skip\": bool}. Output only the JSON array.";

#[async_trait]
impl ScoringOracle for LlmScorer {
    async fn score_batch(&self, batch: &[FeedItem], known_page_ids: &[String]) -> Result<String> {
        let mut user = format!("Known page ids: {}\n\nItems:\n", known_page_ids.join(", "));
        for (i, it) in batch.iter().enumerate() {
            user.push_str(&format!(
                "{}. [{}] {}\n   {}\n",
                i + 1,
                it.source_name,
                it.title,
                it.summary
            ));
        }
        self.llm.complete(SCORER_SYSTEM, &user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> FeedItem {
        FeedItem {
            source_id: "s".into(),
            source_name: "S".into(),
            title: title.into(),
            url: String::new(),
            published_at: String::new(),
            summary: String::new(),
            categories: vec!["policy".into()],
            reliability: Default::default(),
        }
    }

    #[test]
    fn parse_skips_flagged_and_out_of_range() {
        let batch = vec![item("one"), item("two")];
        let raw = r#"```json
        [{"index":1,"relevanceScore":88,"topics":["x"],"entities":["p"]},
         {"index":2,"relevanceScore":70,"skip":true},
         {"index":9,"relevanceScore":99}]
        ```"#;
        let out = parse_score_response(raw, &batch).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item.title, "one");
        assert_eq!(out[0].relevance_score, 88);
        assert_eq!(out[0].entities, vec!["p".to_string()]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_score_response("I cannot help with that", &[item("a")]).is_none());
        assert!(parse_score_response("[{\"nope\":1}]", &[item("a")]).is_none());
    }

    #[test]
    fn fallback_uses_categories_as_topics() {
        let out = fallback_batch(&[item("a")]);
        assert_eq!(out[0].relevance_score, FALLBACK_SCORE);
        assert_eq!(out[0].topics, vec!["policy".to_string()]);
        assert!(out[0].entities.is_empty());
    }
}
