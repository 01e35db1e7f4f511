//! report.rs: page execution (continue-on-error) and the per-run report document.
//!
//! Realized spend counts only pages the executor reports as successful, priced with the
//! same tier table the scheduler used. It is independent from the plan's estimate.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Trigger;
use crate::plan::{PageUpdate, Tier, UpdatePlan};
use crate::state::iso;

#[async_trait]
pub trait PageExecutor: Send + Sync {
    /// Perform one page update. `Err` marks that page failed; the run continues.
    async fn execute(&self, update: &PageUpdate) -> Result<()>;
}

/// Runs an external command per page. The update is passed via env vars
/// `PAGE_ID`, `PAGE_TITLE`, `PAGE_TIER`, `PAGE_DIRECTIONS`.
pub struct CommandExecutor {
    argv: Vec<String>,
}

impl CommandExecutor {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            bail!("executor command is empty");
        }
        Ok(Self { argv })
    }
}

#[async_trait]
impl PageExecutor for CommandExecutor {
    async fn execute(&self, update: &PageUpdate) -> Result<()> {
        let status = tokio::process::Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .env("PAGE_ID", &update.page_id)
            .env("PAGE_TITLE", &update.page_title)
            .env("PAGE_TIER", update.suggested_tier.as_str())
            .env("PAGE_DIRECTIONS", &update.directions)
            .status()
            .await
            .with_context(|| format!("spawning executor for {}", update.page_id))?;
        if !status.success() {
            bail!("executor exited with {status}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub page_id: String,
    pub tier: Tier,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Execute every planned update in order. Failures are recorded, never propagated.
pub async fn execute_plan(updates: &[PageUpdate], executor: &dyn PageExecutor) -> Vec<ExecutionResult> {
    let mut results = Vec::with_capacity(updates.len());
    for u in updates {
        let t0 = Instant::now();
        let outcome = executor.execute(u).await;
        let duration_ms = t0.elapsed().as_millis() as u64;
        let result = match outcome {
            Ok(()) => {
                info!(target: "report", page = %u.page_id, tier = u.suggested_tier.as_str(), duration_ms, "page updated");
                ExecutionResult {
                    page_id: u.page_id.clone(),
                    tier: u.suggested_tier,
                    status: ExecutionStatus::Success,
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!(target: "report", page = %u.page_id, error = ?e, "page update failed, continuing");
                counter!("auto_update_pages_failed_total").increment(1);
                ExecutionResult {
                    page_id: u.page_id.clone(),
                    tier: u.suggested_tier,
                    status: ExecutionStatus::Failed,
                    error: Some(format!("{e:#}")),
                    duration_ms,
                }
            }
        };
        results.push(result);
    }
    results
}

/// Dollars actually spent: tier cost of successful executions only.
pub fn realized_spend(results: &[ExecutionResult]) -> f64 {
    results
        .iter()
        .filter(|r| r.status == ExecutionStatus::Success)
        .map(|r| r.tier.cost())
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStats {
    pub limit: f64,
    pub spent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestStats {
    pub sources_checked: usize,
    pub sources_failed: usize,
    pub items_fetched: usize,
    pub items_relevant: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub pages_planned: usize,
    pub new_pages_suggested: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub pages_updated: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub results: Vec<ExecutionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub date: String,
    pub started_at: String,
    pub completed_at: String,
    pub trigger: Trigger,
    pub budget: BudgetStats,
    pub digest: DigestStats,
    pub plan: PlanStats,
    pub execution: ExecutionStats,
}

impl RunReport {
    /// `results` is empty for plan-only runs.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        trigger: Trigger,
        budget_limit: f64,
        digest: DigestStats,
        plan: &UpdatePlan,
        budget_skipped: usize,
        results: Vec<ExecutionResult>,
    ) -> Self {
        let updated = results
            .iter()
            .filter(|r| r.status == ExecutionStatus::Success)
            .count();
        Self {
            date: plan.date.clone(),
            started_at: iso(started_at),
            completed_at: iso(completed_at),
            trigger,
            budget: BudgetStats {
                limit: budget_limit,
                spent: realized_spend(&results),
            },
            digest,
            plan: PlanStats {
                pages_planned: plan.page_updates.len(),
                new_pages_suggested: plan.new_page_suggestions.len(),
            },
            execution: ExecutionStats {
                pages_updated: updated,
                pages_failed: results.len() - updated,
                pages_skipped: budget_skipped,
                results,
            },
        }
    }

    /// Write to `{dir}/{date}.json`, returning the path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating report dir {}", dir.display()))?;
        let path = dir.join(format!("{}.json", self.date));
        let json = serde_json::to_vec_pretty(self).context("serializing run report")?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}
