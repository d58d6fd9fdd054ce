// MetricsStore tests: init, raw insert/fetch/delete, batched summary insert, retention prune

mod common;

use common::{HOUR, sample, temp_store};
use telemetry_rollup::metrics_store::MetricsStore;
use telemetry_rollup::models::{MetricKind, TrafficSummary};

fn summary(host: &str, hour: i64, total_bytes: i64) -> TrafficSummary {
    TrafficSummary {
        host: host.into(),
        interface: "eth0".into(),
        hour,
        total_bytes,
        total_mb: 0,
        avg_speed_bps: 0.0,
        speed_mbps: 0.0,
        speed_display: "0.00 bps".into(),
        sample_count: 2,
        created_at: HOUR,
    }
}

#[tokio::test]
async fn store_init_is_idempotent() {
    let (_dir, store) = temp_store().await;
    // Second init is no-op (IF NOT EXISTS)
    store.init().await.unwrap();
    for kind in [
        MetricKind::Net,
        MetricKind::Cpu,
        MetricKind::Mem,
        MetricKind::Disk,
    ] {
        assert_eq!(store.count_rows(kind).await.unwrap(), 0);
    }
    assert_eq!(store.count_summaries().await.unwrap(), 0);
}

#[tokio::test]
async fn fetch_and_delete_share_strict_cutoff() {
    let (_dir, store) = temp_store().await;
    let mut s = sample("h1", "eth0", HOUR - 1, 10, 20);
    s.packets_recv = 3;
    s.speed = 1000;
    store
        .insert_raw_samples(&[
            s.clone(),
            sample("h1", "eth0", HOUR, 11, 21),
            sample("h1", "eth0", HOUR + 1, 12, 22),
        ])
        .await
        .unwrap();

    let mut conn = store.pool().acquire().await.unwrap();
    let fetched = MetricsStore::fetch_raw_before(&mut *conn, HOUR).await.unwrap();
    assert_eq!(fetched, vec![s]);

    let deleted = MetricsStore::delete_raw_before(&mut *conn, HOUR).await.unwrap();
    assert_eq!(deleted, 1);
    drop(conn);
    assert_eq!(store.count_rows(MetricKind::Net).await.unwrap(), 2);
}

#[tokio::test]
async fn insert_summaries_in_partial_batches() {
    let (_dir, store) = temp_store().await;
    let rows: Vec<TrafficSummary> = (0..250)
        .map(|i| summary(&format!("host-{i:03}"), HOUR, i))
        .collect();

    let mut tx = store.begin().await.unwrap();
    let written = MetricsStore::insert_summaries(&mut *tx, &rows, 100)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(written, 250);
    assert_eq!(store.count_summaries().await.unwrap(), 250);

    let stored = store.get_summaries(HOUR, HOUR + 3600).await.unwrap();
    assert_eq!(stored.len(), 250);
    assert_eq!(stored[0], rows[0]);
    assert_eq!(stored[249].host, "host-249");
}

#[tokio::test]
async fn uncommitted_summaries_are_invisible() {
    let (_dir, store) = temp_store().await;
    let mut tx = store.begin().await.unwrap();
    MetricsStore::insert_summaries(&mut *tx, &[summary("h1", HOUR, 5)], 100)
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(store.count_summaries().await.unwrap(), 0);
}

#[tokio::test]
async fn hourly_totals_fold_supplementary_rows() {
    let (_dir, store) = temp_store().await;
    let mut tx = store.begin().await.unwrap();
    MetricsStore::insert_summaries(
        &mut *tx,
        &[
            summary("h1", HOUR, 100),
            summary("h1", HOUR, 40),
            summary("h1", HOUR + 3600, 7),
        ],
        100,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let totals = store.hourly_totals(HOUR, HOUR + 7200).await.unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].hour, HOUR);
    assert_eq!(totals[0].total_bytes, 140);
    assert_eq!(totals[0].rows, 2);
    assert_eq!(totals[1].total_bytes, 7);
    assert_eq!(totals[1].rows, 1);
}

#[tokio::test]
async fn prune_kind_only_touches_its_table_and_older_rows() {
    let (_dir, store) = temp_store().await;
    let pool = store.pool();
    for ts in [HOUR - 10, HOUR, HOUR + 10] {
        sqlx::query("INSERT INTO cpu_metrics (host, cpu, timestamp) VALUES ('h1', 'cpu-total', $1)")
            .bind(ts)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO mem_metrics (host, timestamp) VALUES ('h1', $1)")
            .bind(ts)
            .execute(pool)
            .await
            .unwrap();
    }

    let deleted = store
        .prune_kind_before(MetricKind::Cpu, HOUR)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(store.count_rows(MetricKind::Cpu).await.unwrap(), 2);
    assert_eq!(store.count_rows(MetricKind::Mem).await.unwrap(), 3);
}

#[tokio::test]
async fn insert_raw_samples_empty_is_noop() {
    let (_dir, store) = temp_store().await;
    assert_eq!(store.insert_raw_samples(&[]).await.unwrap(), 0);
    assert_eq!(store.count_rows(MetricKind::Net).await.unwrap(), 0);
}
