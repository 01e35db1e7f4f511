use metrics::counter;
use tracing::{debug, info};

use super::{PageUpdate, SkippedReason, Tier};

pub const EXCEEDED_PAGE_LIMIT: &str = "Exceeded page limit";
pub const EXCEEDED_BUDGET: &str = "Exceeded budget";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetOutcome {
    pub final_updates: Vec<PageUpdate>,
    pub skipped_reasons: Vec<SkippedReason>,
    /// Admitted updates whose tier was forced down to `polish`.
    pub downgraded: usize,
    pub budget_remaining: f64,
}

impl BudgetOutcome {
    pub fn estimated_cost(&self) -> f64 {
        self.final_updates.iter().map(|u| u.suggested_tier.cost()).sum()
    }
}

/// Admission control under a page cap and a dollar cap.
///
/// `updates` must already be deduplicated and ordered by priority. Each update is
/// checked in order: past the page cap it is skipped; if its tier fits the remaining
/// budget it is admitted unchanged; otherwise a non-polish update is admitted as a
/// polish copy when polish still fits. There is exactly one downgrade step.
pub fn apply_budget_and_page_limits(
    updates: &[PageUpdate],
    max_pages: usize,
    max_budget: f64,
) -> BudgetOutcome {
    let mut remaining = max_budget;
    let mut accepted = 0usize;
    let mut out = BudgetOutcome::default();

    for update in updates {
        if accepted >= max_pages {
            out.skipped_reasons
                .push(SkippedReason::new(&update.page_title, EXCEEDED_PAGE_LIMIT));
            continue;
        }

        let cost = update.suggested_tier.cost();
        if cost <= remaining {
            remaining -= cost;
            accepted += 1;
            out.final_updates.push(update.clone());
            continue;
        }

        let floor = Tier::Polish.cost();
        if update.suggested_tier != Tier::Polish && floor <= remaining {
            debug!(
                target: "plan",
                page = %update.page_id,
                from = update.suggested_tier.as_str(),
                remaining,
                "downgrading to polish to fit budget"
            );
            let mut downgraded = update.clone();
            downgraded.suggested_tier = Tier::Polish;
            remaining -= floor;
            accepted += 1;
            out.downgraded += 1;
            out.final_updates.push(downgraded);
        } else {
            out.skipped_reasons
                .push(SkippedReason::new(&update.page_title, EXCEEDED_BUDGET));
        }
    }

    out.budget_remaining = remaining;

    counter!("auto_update_pages_accepted_total").increment(out.final_updates.len() as u64);
    counter!("auto_update_pages_downgraded_total").increment(out.downgraded as u64);
    counter!("auto_update_pages_skipped_total").increment(out.skipped_reasons.len() as u64);
    info!(
        target: "plan",
        accepted = out.final_updates.len(),
        downgraded = out.downgraded,
        skipped = out.skipped_reasons.len(),
        remaining,
        "budget applied"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upd(id: &str, tier: Tier) -> PageUpdate {
        PageUpdate {
            page_id: id.into(),
            page_title: format!("Page {id}"),
            reason: "news".into(),
            suggested_tier: tier,
            relevant_news: vec![],
            directions: String::new(),
        }
    }

    #[test]
    fn empty_input_empty_output() {
        let out = apply_budget_and_page_limits(&[], 10, 100.0);
        assert!(out.final_updates.is_empty());
        assert!(out.skipped_reasons.is_empty());
        assert_eq!(out.budget_remaining, 100.0);
    }

    #[test]
    fn polish_over_budget_is_not_reduced_further() {
        let out = apply_budget_and_page_limits(&[upd("a", Tier::Polish)], 5, 2.0);
        assert!(out.final_updates.is_empty());
        assert_eq!(out.skipped_reasons[0].reason, EXCEEDED_BUDGET);
        assert_eq!(out.downgraded, 0);
    }

    #[test]
    fn estimated_cost_sums_admitted_tiers() {
        let out = apply_budget_and_page_limits(
            &[upd("a", Tier::Deep), upd("b", Tier::Standard)],
            5,
            15.0,
        );
        // deep 12.5 admitted, standard downgraded to polish 2.5
        assert_eq!(out.estimated_cost(), 15.0);
        assert_eq!(out.downgraded, 1);
    }
}
