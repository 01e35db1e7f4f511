// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{FeedItem, Reliability, SourceProvider, SUMMARY_MAX_CHARS};
use crate::ingest::{normalize_text, truncate_chars};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<String>,
}

/// RFC 2822 → `YYYY-MM-DD`. Unparseable input is passed through untouched.
fn rfc2822_to_date(ts: &str) -> String {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| {
            let d = dt.to_offset(UtcOffset::UTC).date();
            format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
        })
        .unwrap_or_else(|| ts.trim().to_string())
}

/// quick-xml only knows the five XML entities; feeds routinely carry HTML ones.
/// Decode every other named entity before parsing. Unknown names become a space.
fn scrub_html_entities_for_xml(xml: &str) -> Cow<'_, str> {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());
    re.replace_all(xml, |caps: &regex::Captures| {
        let whole = &caps[0];
        match &caps[1] {
            "amp" | "lt" | "gt" | "quot" | "apos" => whole.to_string(),
            _ => {
                let decoded = html_escape::decode_html_entities(whole);
                if decoded == whole {
                    " ".to_string()
                } else {
                    html_escape::encode_text(&decoded).into_owned()
                }
            }
        }
    })
}

enum Body {
    Http { client: reqwest::Client, url: String },
    Fixture(String),
}

/// RSS 2.0 provider. Either fetches over HTTP or parses a fixed document (tests).
pub struct RssProvider {
    id: String,
    name: String,
    reliability: Reliability,
    body: Body,
}

impl RssProvider {
    pub fn new(id: &str, name: &str, url: &str, reliability: Reliability) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("auto-update-scheduler/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            reliability,
            body: Body::Http {
                client,
                url: url.to_string(),
            },
        })
    }

    pub fn from_fixture(id: &str, name: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            reliability: Reliability::Medium,
            body: Body::Fixture(content.to_string()),
        }
    }

    async fn load(&self) -> Result<String> {
        match &self.body {
            Body::Fixture(s) => Ok(s.clone()),
            Body::Http { client, url } => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("fetching {url}"))?
                    .error_for_status()
                    .with_context(|| format!("status from {url}"))?;
                resp.text().await.context("reading rss body")
            }
        }
    }

    fn parse(&self, xml: &str) -> Result<Vec<FeedItem>> {
        let xml = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml).with_context(|| format!("parsing rss xml for {}", self.id))?;
        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default(), 300);
            if title.is_empty() {
                continue;
            }
            out.push(FeedItem {
                source_id: self.id.clone(),
                source_name: self.name.clone(),
                title,
                url: it.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                published_at: it.pub_date.as_deref().map(rfc2822_to_date).unwrap_or_default(),
                summary: normalize_text(
                    it.description.as_deref().unwrap_or_default(),
                    SUMMARY_MAX_CHARS,
                ),
                categories: it
                    .category
                    .iter()
                    .map(|c| truncate_chars(c.trim(), 80))
                    .filter(|c| !c.is_empty())
                    .collect(),
                reliability: self.reliability,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        let xml = self.load().await?;
        let t0 = std::time::Instant::now();
        let items = self.parse(&xml)?;
        histogram!("auto_update_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }

    fn id(&self) -> &str {
        &self.id
    }
}
