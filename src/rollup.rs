// Rollup cycle: raw net samples older than the lookback → hourly traffic summaries, then purge.
// Fetch, insert and delete share one cutoff and run on one transaction; any failure rolls back.

use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::metrics_store::MetricsStore;
use crate::metrics_store::aggregation::{self, SECS_PER_HOUR};
use crate::models::TrafficSummary;

/// Rollup settings resolved from `[rollup]` config.
#[derive(Debug, Clone)]
pub struct RollupConfig {
    pub lookback_hours: u32,
    pub batch_size: usize,
    /// Reference timezone for hour buckets.
    pub timezone: FixedOffset,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            batch_size: 100,
            timezone: Utc.fix(),
        }
    }
}

/// The raw rows one cycle owns: everything with `timestamp < cutoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupWindow {
    pub cutoff: i64,
}

impl RollupWindow {
    /// `now - lookback`, truncated to its hour start so processed buckets are always whole.
    pub fn ending_before(now: i64, lookback_hours: u32, tz: FixedOffset) -> Self {
        let raw = now - (lookback_hours as i64) * SECS_PER_HOUR;
        Self {
            cutoff: aggregation::hour_start(raw, tz),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing older than the cutoff; transaction rolled back untouched.
    Empty { cutoff: i64 },
    Committed {
        cutoff: i64,
        raw_rows: usize,
        summaries: u64,
        deleted: u64,
    },
}

/// Step at which a cycle failed. The transaction is already rolled back when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("begin transaction: {0}")]
    Begin(#[source] sqlx::Error),
    #[error("fetch raw samples: {0}")]
    Fetch(#[source] sqlx::Error),
    #[error("insert summaries: {0}")]
    Insert(#[source] sqlx::Error),
    #[error("delete processed raw samples: {0}")]
    Delete(#[source] sqlx::Error),
    #[error("commit: {0}")]
    Commit(#[source] sqlx::Error),
}

pub struct RollupCoordinator {
    store: Arc<MetricsStore>,
    config: RollupConfig,
}

impl RollupCoordinator {
    pub fn new(store: Arc<MetricsStore>, config: RollupConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// Runs one fetch → aggregate → insert → delete → commit cycle against `now` (unix seconds).
    #[instrument(skip(self), fields(job = "rollup"))]
    pub async fn run_cycle(&self, now: i64) -> Result<CycleOutcome, RollupError> {
        let window =
            RollupWindow::ending_before(now, self.config.lookback_hours, self.config.timezone);
        let started = Instant::now();

        let mut tx = self.store.begin().await.map_err(RollupError::Begin)?;

        let raw = MetricsStore::fetch_raw_before(&mut *tx, window.cutoff)
            .await
            .map_err(RollupError::Fetch)?;
        if raw.is_empty() {
            // Nothing to summarize; dropping the transaction rolls it back.
            drop(tx);
            debug!(cutoff = window.cutoff, "no raw samples to roll up");
            return Ok(CycleOutcome::Empty {
                cutoff: window.cutoff,
            });
        }

        let summaries: Vec<TrafficSummary> =
            aggregation::aggregate_traffic(&raw, self.config.timezone, now)
                .into_values()
                .collect();

        let written =
            MetricsStore::insert_summaries(&mut *tx, &summaries, self.config.batch_size)
                .await
                .map_err(RollupError::Insert)?;

        let deleted = MetricsStore::delete_raw_before(&mut *tx, window.cutoff)
            .await
            .map_err(RollupError::Delete)?;

        tx.commit().await.map_err(RollupError::Commit)?;

        info!(
            cutoff = window.cutoff,
            raw_rows = raw.len(),
            summaries = written,
            deleted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rollup cycle committed"
        );

        Ok(CycleOutcome::Committed {
            cutoff: window.cutoff,
            raw_rows: raw.len(),
            summaries: written,
            deleted,
        })
    }
}
