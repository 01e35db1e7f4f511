// tests/budget_limits.rs
use auto_update_scheduler::apply_budget_and_page_limits;
use auto_update_scheduler::plan::{PageUpdate, Tier, EXCEEDED_BUDGET, EXCEEDED_PAGE_LIMIT};

fn upd(id: &str, tier: Tier) -> PageUpdate {
    PageUpdate {
        page_id: id.into(),
        page_title: format!("Title {id}"),
        reason: "news".into(),
        suggested_tier: tier,
        relevant_news: vec![],
        directions: "Update with latest".into(),
    }
}

#[test]
fn zero_pages_skips_everything_on_page_limit() {
    let input = vec![upd("a", Tier::Polish), upd("b", Tier::Deep)];
    let out = apply_budget_and_page_limits(&input, 0, 100.0);
    assert!(out.final_updates.is_empty());
    assert_eq!(out.skipped_reasons.len(), 2);
    assert!(out.skipped_reasons.iter().all(|s| s.reason == EXCEEDED_PAGE_LIMIT));
    assert_eq!(out.skipped_reasons[0].item, "Title a");
}

#[test]
fn zero_budget_skips_everything_on_budget() {
    let input = vec![upd("a", Tier::Polish), upd("b", Tier::Standard)];
    let out = apply_budget_and_page_limits(&input, 10, 0.0);
    assert!(out.final_updates.is_empty());
    assert_eq!(out.skipped_reasons.len(), 2);
    assert!(out.skipped_reasons.iter().all(|s| s.reason == EXCEEDED_BUDGET));
}

#[test]
fn two_polish_fit_comfortably() {
    let input = vec![upd("a", Tier::Polish), upd("b", Tier::Polish)];
    let out = apply_budget_and_page_limits(&input, 10, 20.0);
    assert_eq!(out.final_updates.len(), 2);
    assert!(out.skipped_reasons.is_empty());
    assert_eq!(out.budget_remaining, 15.0);
}

#[test]
fn page_cap_admits_exactly_max_pages() {
    let input = vec![upd("a", Tier::Polish), upd("b", Tier::Polish), upd("c", Tier::Polish)];
    let out = apply_budget_and_page_limits(&input, 2, 100.0);
    assert_eq!(out.final_updates.len(), 2);
    assert_eq!(out.skipped_reasons.len(), 1);
    assert_eq!(out.skipped_reasons[0].reason, EXCEEDED_PAGE_LIMIT);
    assert_eq!(out.skipped_reasons[0].item, "Title c");
}

#[test]
fn standard_with_one_dollar_is_skipped() {
    let out = apply_budget_and_page_limits(&[upd("a", Tier::Standard)], 10, 1.0);
    assert!(out.final_updates.is_empty());
    assert_eq!(out.skipped_reasons.len(), 1);
    assert_eq!(out.skipped_reasons[0].reason, EXCEEDED_BUDGET);
}

#[test]
fn standard_with_five_dollars_is_downgraded_without_touching_input() {
    let input = vec![upd("a", Tier::Standard)];
    let out = apply_budget_and_page_limits(&input, 10, 5.0);
    assert_eq!(out.final_updates.len(), 1);
    assert_eq!(out.final_updates[0].suggested_tier, Tier::Polish);
    assert_eq!(out.final_updates[0].page_id, "a");
    assert_eq!(out.downgraded, 1);
    assert!(out.skipped_reasons.is_empty());
    // caller's value keeps its tier
    assert_eq!(input[0].suggested_tier, Tier::Standard);
}

#[test]
fn deep_with_four_dollars_goes_straight_to_polish() {
    let out = apply_budget_and_page_limits(&[upd("a", Tier::Deep)], 10, 4.0);
    assert_eq!(out.final_updates.len(), 1);
    assert_eq!(out.final_updates[0].suggested_tier, Tier::Polish);
}

#[test]
fn downgrade_then_polish_spends_budget_exactly() {
    let input = vec![upd("a", Tier::Standard), upd("b", Tier::Polish)];
    let out = apply_budget_and_page_limits(&input, 10, 5.0);
    assert_eq!(out.final_updates.len(), 2);
    assert_eq!(out.final_updates[0].suggested_tier, Tier::Polish);
    assert_eq!(out.final_updates[1].suggested_tier, Tier::Polish);
    assert!(out.skipped_reasons.is_empty());
    assert_eq!(out.budget_remaining, 0.0);
}

#[test]
fn exhausted_budget_leaves_nothing_for_the_floor() {
    let input = vec![
        upd("a", Tier::Standard),
        upd("b", Tier::Standard),
        upd("c", Tier::Polish),
    ];
    let out = apply_budget_and_page_limits(&input, 10, 13.0);
    assert_eq!(out.final_updates.len(), 2);
    assert!(out
        .final_updates
        .iter()
        .all(|u| u.suggested_tier == Tier::Standard));
    assert_eq!(out.skipped_reasons.len(), 1);
    assert_eq!(out.skipped_reasons[0].item, "Title c");
    assert_eq!(out.skipped_reasons[0].reason, EXCEEDED_BUDGET);
    assert_eq!(out.budget_remaining, 0.0);
}

#[test]
fn page_cap_is_checked_per_item_before_budget() {
    // after the cap every later item is recorded individually, even cheap ones
    let input = vec![upd("a", Tier::Deep), upd("b", Tier::Polish), upd("c", Tier::Deep)];
    let out = apply_budget_and_page_limits(&input, 1, 1_000.0);
    let reasons: Vec<&str> = out.skipped_reasons.iter().map(|s| s.reason.as_str()).collect();
    assert_eq!(reasons, vec![EXCEEDED_PAGE_LIMIT, EXCEEDED_PAGE_LIMIT]);
}
