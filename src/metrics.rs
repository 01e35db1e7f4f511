use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the snapshot even at zero).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("auto_update_items_fetched_total", "Items returned by all sources.");
        describe_counter!(
            "auto_update_items_deduped_total",
            "Items dropped by ingestion dedup."
        );
        describe_counter!("auto_update_source_errors_total", "Source fetch/parse failures.");
        describe_counter!(
            "auto_update_scorer_fallback_total",
            "Scorer batches that fell back to neutral scores."
        );
        describe_counter!(
            "auto_update_router_failures_total",
            "Router calls that were unavailable or malformed."
        );
        describe_counter!("auto_update_pages_accepted_total", "Page updates admitted by budget.");
        describe_counter!(
            "auto_update_pages_downgraded_total",
            "Admitted page updates downgraded to polish."
        );
        describe_counter!("auto_update_pages_skipped_total", "Page updates rejected by limits.");
        describe_counter!("auto_update_pages_failed_total", "Page executions that failed.");
        describe_histogram!("auto_update_parse_ms", "Source parse time in milliseconds.");
        describe_gauge!("auto_update_last_run_ts", "Unix ts when the pipeline last completed.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Prometheus exposition text of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
