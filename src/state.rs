//! state.rs: persisted run state. Holds per-source last-fetch timestamps and a
//! TTL'd map of seen item fingerprints.
//!
//! The whole document is read and written on each access. Loading never fails: a
//! missing or corrupt file yields the empty state.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Seen fingerprints older than this are pruned on load.
pub const SEEN_ITEMS_TTL_DAYS: i64 = 90;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoUpdateState {
    /// source id -> ISO timestamp of the last successful fetch
    #[serde(default)]
    pub last_fetch_times: BTreeMap<String, String>,
    /// fingerprint -> ISO timestamp first seen
    #[serde(default)]
    pub seen_items: BTreeMap<String, String>,
}

/// ISO 8601 in a single fixed shape so that plain string comparison orders correctly.
pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_state(&self) -> AutoUpdateState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(_) => return AutoUpdateState::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "state file unreadable, starting empty");
                AutoUpdateState::default()
            }
        }
    }

    /// Prune entries first seen before `now - 90d`, persisting the pruned map when anything
    /// was dropped. Returns the surviving fingerprints. A failed write is logged; the
    /// pruned set is still returned.
    pub fn load_seen_items(&self, now: DateTime<Utc>) -> HashSet<String> {
        let mut state = self.load_state();
        let cutoff = iso(now - ChronoDuration::days(SEEN_ITEMS_TTL_DAYS));

        let before = state.seen_items.len();
        state.seen_items.retain(|_, first_seen| first_seen.as_str() >= cutoff.as_str());
        let pruned = before - state.seen_items.len();

        if pruned > 0 {
            tracing::info!(pruned, kept = state.seen_items.len(), "pruned expired seen items");
            if let Err(e) = self.save_state(&state) {
                tracing::warn!(error = ?e, "could not persist pruned seen items");
            }
        }

        state.seen_items.into_keys().collect()
    }

    /// Shallow-merge `new_entries` into the persisted map; new entries win on collision.
    pub fn save_seen_items(&self, new_entries: BTreeMap<String, String>) -> Result<()> {
        let mut state = self.load_state();
        state.seen_items.extend(new_entries);
        self.save_state(&state)
    }

    pub fn load_fetch_times(&self) -> BTreeMap<String, String> {
        self.load_state().last_fetch_times
    }

    pub fn save_fetch_times(&self, times: BTreeMap<String, String>) -> Result<()> {
        let mut state = self.load_state();
        state.last_fetch_times = times;
        self.save_state(&state)
    }

    /// Write the whole document via tmp file + rename.
    pub fn save_state(&self, state: &AutoUpdateState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let json = serde_json::to_vec_pretty(state).context("serializing state")?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(&json)?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
