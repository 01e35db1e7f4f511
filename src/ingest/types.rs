// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Editorial trust level of a feed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    High,
    #[default]
    Medium,
    Low,
}

/// One incoming news-like item. Created fresh each run and never mutated after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub source_id: String,
    pub source_name: String,
    pub title: String,
    pub url: String,
    /// Date string as published by the source (ISO 8601 preferred, free-form tolerated).
    pub published_at: String,
    /// At most 500 chars, see [`SUMMARY_MAX_CHARS`].
    pub summary: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub reliability: Reliability,
}

pub const SUMMARY_MAX_CHARS: usize = 500;

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>>;
    /// Stable source id, used as the key in `lastFetchTimes`.
    fn id(&self) -> &str;
}
