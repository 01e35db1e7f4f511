// tests/ingest_dedup.rs
use auto_update_scheduler::ingest::types::{FeedItem, Reliability};
use auto_update_scheduler::{deduplicate, normalize_title};
use std::collections::HashSet;

fn item(source: &str, title: &str) -> FeedItem {
    FeedItem {
        source_id: source.into(),
        source_name: source.to_uppercase(),
        title: title.into(),
        url: format!("https://{source}.test/x"),
        published_at: "2026-10-17".into(),
        summary: "body".into(),
        categories: vec![],
        reliability: Reliability::High,
    }
}

#[test]
fn fingerprint_ignores_case_and_punctuation() {
    assert_eq!(normalize_title("AI Safety!!"), normalize_title("ai safety"));
    assert_eq!(normalize_title("  GPT-5: Released?  "), "gpt5released");
    assert_eq!(normalize_title("Ünïcode ñews"), "ncodeews");
}

#[test]
fn same_story_from_two_sources_is_kept_once_in_order() {
    let raw = vec![
        item("reuters", "Lab announces new model"),
        item("ap", "Policy bill passes senate"),
        item("ap", "LAB ANNOUNCES NEW MODEL!"),
        item("blog", "Another unrelated story"),
    ];
    let out = deduplicate(raw, &HashSet::new());
    let titles: Vec<&str> = out.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Lab announces new model",
            "Policy bill passes senate",
            "Another unrelated story"
        ]
    );
    assert_eq!(out.skipped_as_seen, 0);
}

#[test]
fn trivial_titles_are_always_dropped() {
    let out = deduplicate(vec![item("a", "Hi!"), item("a", "A.B.C.D"), item("a", "?!")], &HashSet::new());
    assert!(out.items.is_empty());
}

#[test]
fn previously_seen_items_are_dropped_and_counted() {
    let prev: HashSet<String> = [normalize_title("Yesterday's big story")].into_iter().collect();
    let out = deduplicate(
        vec![
            item("a", "Yesterday's big story"),
            item("b", "yesterdays BIG story"),
            item("c", "Today's story"),
            item("c", "today's story"),
        ],
        &prev,
    );
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].title, "Today's story");
    // both cross-run hits count; the in-batch duplicate does not
    assert_eq!(out.skipped_as_seen, 2);
}

#[test]
fn kept_items_have_unique_fingerprints() {
    let titles = [
        "Alpha beta gamma",
        "alpha-beta-gamma",
        "Delta epsilon",
        "DELTA EPSILON",
        "Zeta eta theta",
    ];
    let out = deduplicate(titles.iter().map(|t| item("s", t)).collect(), &HashSet::new());
    let keys: HashSet<String> = out.items.iter().map(|i| normalize_title(&i.title)).collect();
    assert_eq!(keys.len(), out.items.len());
    assert_eq!(out.items.len(), 3);
}
