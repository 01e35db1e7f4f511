// tests/metrics.rs
// Own test binary: the process-wide recorder is installed exactly once here.
use anyhow::{bail, Result};
use async_trait::async_trait;
use auto_update_scheduler::apply_budget_and_page_limits;
use auto_update_scheduler::ingest::fetch_all;
use auto_update_scheduler::ingest::providers::RssProvider;
use auto_update_scheduler::ingest::types::{FeedItem, SourceProvider};
use auto_update_scheduler::metrics::Metrics;
use auto_update_scheduler::plan::{PageUpdate, Tier};

const FEED: &str = r#"<rss version="2.0"><channel>
<item><title>Open model released today</title><link>https://wire.test/a</link></item>
</channel></rss>"#;

struct Broken;

#[async_trait]
impl SourceProvider for Broken {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        bail!("tls handshake failed")
    }
    fn id(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn snapshot_contains_pipeline_series() {
    let metrics = Metrics::init().unwrap();

    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(RssProvider::from_fixture("wire", "Wire", FEED)),
        Box::new(Broken),
    ];
    let fetched = fetch_all(&providers).await;
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.sources_checked(), 2);
    assert!(fetched.failed["broken"].contains("tls handshake failed"));

    let update = PageUpdate {
        page_id: "p".into(),
        page_title: "P".into(),
        reason: "news".into(),
        suggested_tier: Tier::Standard,
        relevant_news: vec![],
        directions: String::new(),
    };
    // admitted, downgraded, skipped
    let out = apply_budget_and_page_limits(&[update.clone(), update.clone(), update], 10, 9.0);
    assert_eq!(out.downgraded, 1);
    assert_eq!(out.skipped_reasons.len(), 1);

    let text = metrics.render();
    for needle in [
        "auto_update_items_fetched_total",
        "auto_update_source_errors_total",
        "auto_update_parse_ms",
        "auto_update_pages_accepted_total",
        "auto_update_pages_downgraded_total",
        "auto_update_pages_skipped_total",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
