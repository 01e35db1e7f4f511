// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod digest;
pub mod ingest;
pub mod llm;
pub mod metrics;
pub mod page_index;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod routing;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::ingest::{deduplicate, normalize_title};
pub use crate::pipeline::{run_once, Collaborators, RunOptions, RunOutcome};
pub use crate::plan::{apply_budget_and_page_limits, deduplicate_page_updates};
