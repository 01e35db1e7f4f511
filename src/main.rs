//! Auto-update runner: binary entrypoint.
//! Loads configuration, wires sources and LLM oracles, runs one pipeline pass and writes
//! the run report plus a metrics snapshot.

use anyhow::{Context, Result};
use auto_update_scheduler::config::RunConfig;
use auto_update_scheduler::digest::LlmScorer;
use auto_update_scheduler::ingest::providers::RssProvider;
use auto_update_scheduler::ingest::types::SourceProvider;
use auto_update_scheduler::llm::build_completion;
use auto_update_scheduler::metrics::Metrics;
use auto_update_scheduler::page_index::PageIndex;
use auto_update_scheduler::report::{CommandExecutor, PageExecutor};
use auto_update_scheduler::routing::LlmRouter;
use auto_update_scheduler::state::StateStore;
use auto_update_scheduler::{run_once, Collaborators, RunOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines when AUTO_UPDATE_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(
            "auto_update_scheduler=info,ingest=info,digest=info,routing=info,plan=info,report=info,warn",
        ));
    let json = std::env::var("AUTO_UPDATE_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init()?;
    let cfg = RunConfig::load_default()?;
    let llm_cfg = cfg.llm.clone().resolve()?;

    let index = PageIndex::load_from_file(&cfg.page_index_path)?;
    let store = StateStore::new(&cfg.state_path);

    let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
    for s in cfg.active_sources() {
        providers.push(Box::new(RssProvider::new(&s.id, &s.name, &s.url, s.reliability)?));
    }

    let llm = build_completion(&llm_cfg)?;
    let scorer = LlmScorer::new(llm.clone());
    let router = LlmRouter::new(llm);
    let executor = cfg.executor.clone().map(CommandExecutor::new).transpose()?;

    tracing::info!(
        sources = providers.len(),
        pages = index.len(),
        budget = cfg.budget,
        max_pages = cfg.max_pages,
        dry_run = cfg.dry_run,
        "starting auto-update run"
    );

    let outcome = run_once(
        &RunOptions::from(&cfg),
        &Collaborators {
            providers: &providers,
            scorer: &scorer,
            router: &router,
            executor: executor.as_ref().map(|e| e as &dyn PageExecutor),
        },
        &index,
        &store,
        chrono::Utc::now(),
    )
    .await?;

    if cfg.dry_run {
        let plan = serde_json::to_string_pretty(&outcome.plan).context("serializing plan")?;
        println!("{plan}");
    } else {
        let path = outcome.report.save(&cfg.report_dir)?;
        let prom = cfg.report_dir.join(format!("{}.prom", outcome.report.date));
        std::fs::write(&prom, metrics.render())
            .with_context(|| format!("writing {}", prom.display()))?;
        tracing::info!(report = %path.display(), "run report written");
    }

    tracing::info!(
        planned = outcome.report.plan.pages_planned,
        updated = outcome.report.execution.pages_updated,
        failed = outcome.report.execution.pages_failed,
        spent = outcome.report.budget.spent,
        "auto-update run finished"
    );
    Ok(())
}
