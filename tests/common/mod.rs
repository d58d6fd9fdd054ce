// Shared test helpers
#![allow(dead_code)]

use std::sync::Arc;
use telemetry_rollup::metrics_store::MetricsStore;
use telemetry_rollup::models::RawSample;
use tempfile::TempDir;

/// 2023-11-14T22:00:00Z, an hour boundary.
pub const HOUR: i64 = 1_699_999_200;

/// Three days after `HOUR`; with a 24h lookback the cutoff lands at `HOUR + 2 days`.
pub const NOW: i64 = HOUR + 3 * 86_400;

pub fn sample(host: &str, iface: &str, ts: i64, recv: i64, sent: i64) -> RawSample {
    RawSample::new(host, iface, ts, recv, sent)
}

/// Fresh initialized store in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn temp_store() -> (TempDir, Arc<MetricsStore>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    let store = MetricsStore::connect(path.to_str().unwrap(), 4).await.unwrap();
    store.init().await.unwrap();
    (dir, Arc::new(store))
}
