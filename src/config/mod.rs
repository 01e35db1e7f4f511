//! Run configuration: TOML file with environment overrides.
//!
//! Resolution order:
//! 1) `$AUTO_UPDATE_CONFIG_PATH` (must exist)
//! 2) `config/auto_update.toml`
//! 3) built-in defaults
//!
//! then `AUTO_UPDATE_BUDGET`, `AUTO_UPDATE_MAX_PAGES`, `AUTO_UPDATE_DRY_RUN` and
//! `AUTO_UPDATE_SOURCES` override individual fields. Invalid override values are ignored.

pub mod llm;

pub use llm::LlmConfig;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::digest::DEFAULT_RELEVANCE_FLOOR;
use crate::ingest::types::Reliability;
use crate::plan::WatchlistEntry;
use crate::routing::DEFAULT_ROUTER_MIN_SCORE;

pub const DEFAULT_CONFIG_PATH: &str = "config/auto_update.toml";
pub const ENV_CONFIG_PATH: &str = "AUTO_UPDATE_CONFIG_PATH";
pub const ENV_BUDGET: &str = "AUTO_UPDATE_BUDGET";
pub const ENV_MAX_PAGES: &str = "AUTO_UPDATE_MAX_PAGES";
pub const ENV_DRY_RUN: &str = "AUTO_UPDATE_DRY_RUN";
pub const ENV_SOURCES: &str = "AUTO_UPDATE_SOURCES";

/// What started the run; recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub reliability: Reliability,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}
fn default_budget() -> f64 {
    30.0
}
fn default_max_pages() -> usize {
    10
}
fn default_relevance_floor() -> u8 {
    DEFAULT_RELEVANCE_FLOOR
}
fn default_router_min_score() -> u8 {
    DEFAULT_ROUTER_MIN_SCORE
}
fn default_state_path() -> PathBuf {
    PathBuf::from("state/auto_update_state.json")
}
fn default_report_dir() -> PathBuf {
    PathBuf::from("state/runs")
}
fn default_page_index_path() -> PathBuf {
    PathBuf::from("data/page_index.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Dollar cap for page updates.
    #[serde(default = "default_budget")]
    pub budget: f64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: u8,
    #[serde(default = "default_router_min_score")]
    pub router_min_score: u8,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default = "default_page_index_path")]
    pub page_index_path: PathBuf,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Only run these source ids when set.
    #[serde(default)]
    pub source_filter: Option<Vec<String>>,
    #[serde(default)]
    pub watchlist: Vec<WatchlistEntry>,
    #[serde(default)]
    pub llm: LlmConfig,
    /// argv of the page execution command; plan-only when absent.
    #[serde(default)]
    pub executor: Option<Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            max_pages: default_max_pages(),
            relevance_floor: default_relevance_floor(),
            router_min_score: default_router_min_score(),
            dry_run: false,
            trigger: Trigger::default(),
            state_path: default_state_path(),
            report_dir: default_report_dir(),
            page_index_path: default_page_index_path(),
            sources: Vec::new(),
            source_filter: None,
            watchlist: Vec::new(),
            llm: LlmConfig::default(),
            executor: None,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: RunConfig = toml::from_str(s).context("parsing run config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading run config from {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// File (env path, then default path, then defaults) plus env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(b) = parse_budget(std::env::var(ENV_BUDGET).ok()) {
            self.budget = b;
        }
        if let Some(n) = std::env::var(ENV_MAX_PAGES)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            self.max_pages = n;
        }
        if let Some(d) = std::env::var(ENV_DRY_RUN).ok().and_then(|s| parse_flag(&s)) {
            self.dry_run = d;
        }
        if let Ok(s) = std::env::var(ENV_SOURCES) {
            let ids: Vec<String> = s
                .split(',')
                .map(|x| x.trim().to_string())
                .filter(|x| !x.is_empty())
                .collect();
            if !ids.is_empty() {
                self.source_filter = Some(ids);
            }
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        if !self.budget.is_finite() || self.budget < 0.0 {
            self.budget = 0.0;
        }
        self.relevance_floor = self.relevance_floor.min(100);
        self.router_min_score = self.router_min_score.min(100);
    }

    /// Enabled sources that pass the source filter.
    pub fn active_sources(&self) -> Vec<&SourceConfig> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| match &self.source_filter {
                Some(ids) => ids.iter().any(|id| id.eq_ignore_ascii_case(&s.id)),
                None => true,
            })
            .collect()
    }
}

fn parse_budget(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().trim_start_matches('$').parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_document() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.budget, 30.0);
        assert_eq!(cfg.max_pages, 10);
        assert_eq!(cfg.relevance_floor, 20);
        assert_eq!(cfg.router_min_score, 40);
        assert!(!cfg.llm.enabled);
        assert_eq!(RunConfig::from_toml_str("").unwrap(), cfg);
    }

    #[test]
    fn budget_env_values_are_sanitized() {
        assert_eq!(parse_budget(Some(" $12.5 ".into())), Some(12.5));
        assert_eq!(parse_budget(Some("-3".into())), Some(0.0));
        assert_eq!(parse_budget(Some("lots".into())), None);
        assert_eq!(parse_budget(None), None);
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
