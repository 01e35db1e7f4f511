//! pipeline.rs: one complete auto-update run.
//!
//! fetch → ingest dedup → score → entity match → route → merge → plan dedup →
//! importance sort → watchlist → budget → execute → report.
//!
//! Data moves strictly forward. State is loaded once and saved at two checkpoints
//! (fetch times after fetching, seen items once scoring succeeded); dry runs save nothing.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::{RunConfig, Trigger};
use crate::digest::{build_digest, DigestItem, DigestOptions, ScoringOracle};
use crate::ingest::types::SourceProvider;
use crate::ingest::{deduplicate, fetch_all, normalize_title};
use crate::page_index::PageIndex;
use crate::plan::{
    apply_budget_and_page_limits, deduplicate_page_updates, due_watchlist_updates,
    inject_watchlist, sort_by_importance, UpdatePlan, WatchlistEntry,
};
use crate::report::{execute_plan, DigestStats, PageExecutor, RunReport};
use crate::routing::{match_entities, merge_routing, prefilter_candidates, route_candidates, RoutingOracle};
use crate::state::{iso, StateStore};

/// Already-parsed run parameters.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub budget: f64,
    pub max_pages: usize,
    pub relevance_floor: u8,
    pub router_min_score: u8,
    pub dry_run: bool,
    pub trigger: Trigger,
    pub watchlist: Vec<WatchlistEntry>,
}

impl From<&RunConfig> for RunOptions {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            budget: cfg.budget,
            max_pages: cfg.max_pages,
            relevance_floor: cfg.relevance_floor,
            router_min_score: cfg.router_min_score,
            dry_run: cfg.dry_run,
            trigger: cfg.trigger,
            watchlist: cfg.watchlist.clone(),
        }
    }
}

/// External collaborators for one run.
pub struct Collaborators<'a> {
    pub providers: &'a [Box<dyn SourceProvider>],
    pub scorer: &'a dyn ScoringOracle,
    pub router: &'a dyn RoutingOracle,
    /// `None` plans without executing.
    pub executor: Option<&'a dyn PageExecutor>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub digest: Vec<DigestItem>,
    pub plan: UpdatePlan,
    pub report: RunReport,
}

/// Run the whole pipeline once. Fails only when the relevance scorer is unreachable.
pub async fn run_once(
    opts: &RunOptions,
    collab: &Collaborators<'_>,
    index: &PageIndex,
    store: &StateStore,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    crate::metrics::ensure_described();
    let today = now.date_naive();
    let date = today.format("%Y-%m-%d").to_string();
    let persist = !opts.dry_run;

    // 1) Fetch, each source isolated.
    let fetched = fetch_all(collab.providers).await;
    let items_fetched = fetched.items.len();
    if persist && !fetched.succeeded.is_empty() {
        let mut times = store.load_fetch_times();
        for id in &fetched.succeeded {
            times.insert(id.clone(), iso(now));
        }
        if let Err(e) = store.save_fetch_times(times) {
            warn!(error = ?e, "could not persist fetch times");
        }
    }

    // 2) Ingestion dedup against this batch and earlier runs.
    let seen = store.load_seen_items(now);
    let deduped = deduplicate(fetched.items, &seen);
    counter!("auto_update_items_deduped_total")
        .increment((items_fetched - deduped.items.len()) as u64);
    info!(
        target: "ingest",
        fetched = items_fetched,
        kept = deduped.items.len(),
        skipped_as_seen = deduped.skipped_as_seen,
        sources_failed = fetched.failed.len(),
        "ingest done"
    );
    let first_seen = iso(now);
    let seen_entries: BTreeMap<String, String> = deduped
        .items
        .iter()
        .map(|it| (normalize_title(&it.title), first_seen.clone()))
        .collect();

    // 3) Relevance digest. The only hard failure.
    let digest = build_digest(
        &deduped.items,
        collab.scorer,
        index,
        DigestOptions {
            relevance_floor: opts.relevance_floor,
            ..DigestOptions::default()
        },
    )
    .await?;

    // Committed only after scoring succeeded.
    if persist && !seen_entries.is_empty() {
        if let Err(e) = store.save_seen_items(seen_entries) {
            warn!(error = ?e, "could not persist seen items");
        }
    }

    // 4) Entity match, then route what is left and relevant enough.
    let matches = match_entities(&digest.items, index);
    let candidates = prefilter_candidates(&matches.unmatched, opts.router_min_score);
    let decision = route_candidates(&candidates, collab.router, index).await;
    let merged = merge_routing(&matches, &candidates, &decision, index);

    // 5) Plan shaping: dedup, importance order, watchlist to the front, budget.
    let unique = deduplicate_page_updates(&merged.page_updates);
    let ordered = sort_by_importance(&unique, |id| index.importance_of(id));
    let due = due_watchlist_updates(&opts.watchlist, index, today);
    let prioritized = inject_watchlist(&ordered, &due);
    let admitted = apply_budget_and_page_limits(&prioritized, opts.max_pages, opts.budget);

    let estimated_cost = admitted.estimated_cost();
    let budget_skipped = admitted.skipped_reasons.len();
    let mut skipped_reasons = merged.skipped_reasons;
    skipped_reasons.extend(admitted.skipped_reasons);

    let plan = UpdatePlan {
        date,
        page_updates: admitted.final_updates,
        new_page_suggestions: merged.new_page_suggestions,
        skipped_reasons,
        estimated_cost,
    };
    info!(
        target: "plan",
        pages = plan.page_updates.len(),
        new_pages = plan.new_page_suggestions.len(),
        watchlist_due = due.len(),
        estimated_cost = plan.estimated_cost,
        "plan finalized"
    );

    // 6) Execute, continue on error.
    let results = match collab.executor {
        Some(exec) if !opts.dry_run => execute_plan(&plan.page_updates, exec).await,
        _ => Vec::new(),
    };

    let report = RunReport::assemble(
        now,
        Utc::now(),
        opts.trigger,
        opts.budget,
        DigestStats {
            sources_checked: fetched.succeeded.len() + fetched.failed.len(),
            sources_failed: fetched.failed.len(),
            items_fetched,
            items_relevant: digest.items.len(),
        },
        &plan,
        budget_skipped,
        results,
    );
    gauge!("auto_update_last_run_ts").set(Utc::now().timestamp() as f64);

    Ok(RunOutcome {
        digest: digest.items,
        plan,
        report,
    })
}
