// tests/watchlist_injection.rs
use auto_update_scheduler::apply_budget_and_page_limits;
use auto_update_scheduler::plan::{inject_watchlist, PageUpdate, Tier, WATCHLIST_REASON};

fn upd(id: &str, tier: Tier, reason: &str, directions: &str) -> PageUpdate {
    PageUpdate {
        page_id: id.into(),
        page_title: id.to_uppercase(),
        reason: reason.into(),
        suggested_tier: tier,
        relevant_news: vec![],
        directions: directions.into(),
    }
}

fn due(id: &str, tier: Tier, directions: &str) -> PageUpdate {
    upd(id, tier, WATCHLIST_REASON, directions)
}

#[test]
fn due_pages_go_to_the_front_in_watchlist_order() {
    let news = vec![upd("n1", Tier::Standard, "news", "a"), upd("n2", Tier::Polish, "news", "b")];
    let out = inject_watchlist(&news, &[due("w2", Tier::Polish, ""), due("w1", Tier::Deep, "")]);
    let ids: Vec<&str> = out.iter().map(|u| u.page_id.as_str()).collect();
    assert_eq!(ids, vec!["w2", "w1", "n1", "n2"]);
}

#[test]
fn overlapping_page_is_merged_in_place() {
    let news = vec![
        upd("other", Tier::Polish, "news", "x"),
        upd("acme", Tier::Polish, "news", "Add Q3 earnings"),
    ];
    let out = inject_watchlist(&news, &[due("acme", Tier::Standard, "Refresh leadership section")]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].page_id, "acme");
    assert_eq!(out[1].reason, "news");
    assert_eq!(out[1].suggested_tier, Tier::Standard);
    assert_eq!(
        out[1].directions,
        "Refresh leadership section\n\nAlso from news routing: Add Q3 earnings"
    );
}

#[test]
fn merge_never_lowers_the_news_tier() {
    let out = inject_watchlist(
        &[upd("acme", Tier::Deep, "news", "d")],
        &[due("acme", Tier::Polish, "w")],
    );
    assert_eq!(out[0].suggested_tier, Tier::Deep);
}

#[test]
fn watchlist_pages_are_admitted_first_under_a_tight_budget() {
    let news = vec![upd("hot", Tier::Standard, "news", "x")];
    let plan = inject_watchlist(&news, &[due("scheduled", Tier::Standard, "")]);
    let out = apply_budget_and_page_limits(&plan, 10, 7.0);
    assert_eq!(out.final_updates.len(), 1);
    assert_eq!(out.final_updates[0].page_id, "scheduled");
    assert_eq!(out.skipped_reasons[0].item, "HOT");
}
