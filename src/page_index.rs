//! Read-only snapshot of the knowledge base pages for one run.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIndexEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub entity_type: String,
    /// 0..=100
    #[serde(default)]
    pub reader_importance: u8,
    /// Days between scheduled updates.
    #[serde(default)]
    pub update_frequency: Option<u32>,
    /// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp; only the UTC date is kept.
    #[serde(default, deserialize_with = "date_or_timestamp")]
    pub last_edited: Option<NaiveDate>,
    #[serde(default)]
    pub categories: Vec<String>,
}

fn date_or_timestamp<'de, D>(de: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(de)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(d));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.with_timezone(&Utc).date_naive()))
        .map_err(|e| serde::de::Error::custom(format!("lastEdited {raw:?}: {e}")))
}

#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    pages: Vec<PageIndexEntry>,
    by_id: HashMap<String, usize>,
}

impl PageIndex {
    pub fn new(pages: Vec<PageIndexEntry>) -> Self {
        let by_id = pages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self { pages, by_id }
    }

    /// Load a JSON array of entries.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading page index {}", path.display()))?;
        let pages: Vec<PageIndexEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing page index {}", path.display()))?;
        Ok(Self::new(pages))
    }

    pub fn get(&self, id: &str) -> Option<&PageIndexEntry> {
        self.by_id.get(id).map(|&i| &self.pages[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Unknown pages rank lowest.
    pub fn importance_of(&self, id: &str) -> u8 {
        self.get(id).map(|p| p.reader_importance).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Top `n` pages by descending `reader_importance` (stable on ties).
    pub fn top_by_importance(&self, n: usize) -> Vec<&PageIndexEntry> {
        let mut v: Vec<&PageIndexEntry> = self.pages.iter().collect();
        v.sort_by(|a, b| b.reader_importance.cmp(&a.reader_importance));
        v.truncate(n);
        v
    }

    /// Bounded sample of page ids handed to the scorer for context.
    pub fn sample_ids(&self, n: usize) -> Vec<String> {
        self.top_by_importance(n)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }
}
