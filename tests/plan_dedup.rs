// tests/plan_dedup.rs
use auto_update_scheduler::deduplicate_page_updates;
use auto_update_scheduler::plan::{NewsRef, PageUpdate, Tier};

fn upd(id: &str, tier: Tier, news: &[&str], directions: &str) -> PageUpdate {
    PageUpdate {
        page_id: id.into(),
        page_title: id.to_uppercase(),
        reason: "routed".into(),
        suggested_tier: tier,
        relevant_news: news
            .iter()
            .map(|t| NewsRef::new(t, &format!("https://news.test/{t}"), "summary"))
            .collect(),
        directions: directions.into(),
    }
}

#[test]
fn empty_in_empty_out() {
    assert!(deduplicate_page_updates(&[]).is_empty());
}

#[test]
fn single_update_is_returned_unchanged() {
    let u = upd("a", Tier::Standard, &["n1"], "Add n1");
    let out = deduplicate_page_updates(std::slice::from_ref(&u));
    assert_eq!(out, vec![u]);
}

#[test]
fn tier_is_raised_never_lowered() {
    let cases = [
        (Tier::Polish, Tier::Standard, Tier::Standard),
        (Tier::Standard, Tier::Deep, Tier::Deep),
        (Tier::Deep, Tier::Polish, Tier::Deep),
    ];
    for (first, second, expected) in cases {
        let out = deduplicate_page_updates(&[upd("a", first, &[], "x"), upd("a", second, &[], "x")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].suggested_tier, expected, "{first:?} + {second:?}");
    }
}

#[test]
fn news_is_concatenated_in_input_order() {
    let out = deduplicate_page_updates(&[
        upd("a", Tier::Polish, &["n1", "n2"], "d"),
        upd("a", Tier::Polish, &["n3", "n1"], "d"),
    ]);
    let titles: Vec<&str> = out[0].relevant_news.iter().map(|n| n.title.as_str()).collect();
    // no news-level dedup
    assert_eq!(titles, vec!["n1", "n2", "n3", "n1"]);
}

#[test]
fn identical_directions_are_not_repeated() {
    let out = deduplicate_page_updates(&[
        upd("a", Tier::Polish, &[], "Add funding round"),
        upd("a", Tier::Polish, &[], "Add funding round"),
    ]);
    assert_eq!(out[0].directions, "Add funding round");
}

#[test]
fn differing_directions_are_both_kept() {
    let out = deduplicate_page_updates(&[
        upd("a", Tier::Polish, &[], "Add funding round"),
        upd("a", Tier::Polish, &[], "Mention new CEO"),
    ]);
    assert_eq!(out[0].directions, "Add funding round\nMention new CEO");
}

#[test]
fn first_occurrence_input_is_not_mutated() {
    let input = vec![
        upd("a", Tier::Polish, &["n1"], "one"),
        upd("a", Tier::Deep, &["n2", "n3"], "two"),
    ];
    let snapshot = input.clone();
    let out = deduplicate_page_updates(&input);
    assert_eq!(out[0].relevant_news.len(), 3);
    assert_eq!(input[0].relevant_news.len(), 1);
    assert_eq!(input, snapshot);
}

#[test]
fn first_seen_order_is_preserved() {
    let out = deduplicate_page_updates(&[
        upd("a", Tier::Polish, &[], "1"),
        upd("b", Tier::Polish, &[], "2"),
        upd("a", Tier::Polish, &[], "3"),
        upd("c", Tier::Polish, &[], "4"),
    ]);
    let ids: Vec<&str> = out.iter().map(|u| u.page_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}
