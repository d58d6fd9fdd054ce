// Delete-only retention for the CPU / memory / disk raw tables.
// One statement per run, no transaction spanning steps; nothing is summarized first.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::metrics_store::MetricsStore;
use crate::models::MetricKind;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Rows of `kind` with timestamp < `now - retention_days` are deleted.
pub fn retention_cutoff(now: i64, retention_days: u32) -> i64 {
    now - (retention_days as i64) * SECS_PER_DAY
}

#[instrument(skip(store), fields(job = "retention"))]
pub async fn prune_kind(
    store: &Arc<MetricsStore>,
    kind: MetricKind,
    retention_days: u32,
    now: i64,
) -> anyhow::Result<u64> {
    let cutoff = retention_cutoff(now, retention_days);
    let deleted = store.prune_kind_before(kind, cutoff).await?;
    info!(kind = %kind, cutoff, deleted, "retention prune complete");
    Ok(deleted)
}
