// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{FeedItem, SourceProvider};
use metrics::counter;
use std::collections::{BTreeMap, HashSet};

/// Fingerprints shorter than this are too trivial to dedup on.
pub const MIN_FINGERPRINT_LEN: usize = 5;
const FINGERPRINT_MAX_LEN: usize = 60;

/// Title fingerprint used everywhere dedup occurs:
/// lowercase, keep only `[a-z0-9]`, cap at 60 chars.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(FINGERPRINT_MAX_LEN)
        .collect()
}

/// Normalize free text from a feed: decode entities, strip tags, collapse whitespace,
/// cap at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    truncate_chars(&out, max_chars)
}

/// Char-boundary safe truncation.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        s.chars().take(max_chars).collect()
    } else {
        s.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupResult {
    pub items: Vec<FeedItem>,
    /// Items dropped because their fingerprint was seen in an earlier run.
    pub skipped_as_seen: usize,
}

/// Collapse near-duplicate items against this batch and against `previously_seen`.
///
/// `previously_seen` is only consulted for the `skipped_as_seen` counter; the in-batch
/// set is seeded with it, so an item seen in an earlier run is dropped as well.
/// Pure: no I/O, input order of kept items is preserved.
pub fn deduplicate(items: Vec<FeedItem>, previously_seen: &HashSet<String>) -> DedupResult {
    let mut seen: HashSet<String> = previously_seen.clone();
    let mut kept = Vec::with_capacity(items.len());
    let mut skipped_as_seen = 0usize;

    for item in items {
        let key = normalize_title(&item.title);
        if key.len() < MIN_FINGERPRINT_LEN {
            continue;
        }
        if seen.contains(&key) {
            if previously_seen.contains(&key) {
                skipped_as_seen += 1;
            }
            continue;
        }
        seen.insert(key);
        kept.push(item);
    }

    DedupResult {
        items: kept,
        skipped_as_seen,
    }
}

/// Outcome of fetching every provider once.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<FeedItem>,
    /// Source ids that returned successfully.
    pub succeeded: Vec<String>,
    /// Source id -> error message.
    pub failed: BTreeMap<String, String>,
}

impl FetchOutcome {
    pub fn sources_checked(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Fetch all providers concurrently. A failing provider is logged and recorded but
/// never prevents items from the other providers reaching dedup.
pub async fn fetch_all(providers: &[Box<dyn SourceProvider>]) -> FetchOutcome {
    crate::metrics::ensure_described();

    let results =
        futures::future::join_all(providers.iter().map(|p| async move {
            (p.id().to_string(), p.fetch_latest().await)
        }))
        .await;

    let mut out = FetchOutcome::default();
    for (id, res) in results {
        match res {
            Ok(mut v) => {
                tracing::debug!(target: "ingest", source = %id, items = v.len(), "source fetched");
                out.items.append(&mut v);
                out.succeeded.push(id);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = %id, "source fetch failed");
                counter!("auto_update_source_errors_total").increment(1);
                out.failed.insert(id, format!("{e:#}"));
            }
        }
    }

    counter!("auto_update_items_fetched_total").increment(out.items.len() as u64);
    out
}
