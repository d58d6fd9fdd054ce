// Multi-row INSERT statements, one per chunk, so a single statement never grows unbounded.

use sqlx::sqlite::SqliteConnection;
use sqlx::{QueryBuilder, Sqlite};

use crate::models::{RawSample, TrafficSummary};

pub(super) const SUMMARY_COLUMNS: &str = "INSERT INTO net_hourly_summaries (host, interface, hour, total_bytes, total_mb, avg_speed_bps, speed_mbps, speed_display, sample_count, created_at) ";

pub(super) const RAW_COLUMNS: &str = "INSERT INTO net_metrics (host, interface, timestamp, bytes_recv, bytes_sent, packets_recv, packets_sent, err_in, err_out, drop_in, drop_out, speed) ";

/// Inserts `rows` in chunks of `batch_size`. Returns rows written.
pub(super) async fn insert_summaries_chunked(
    conn: &mut SqliteConnection,
    rows: &[TrafficSummary],
    batch_size: usize,
) -> sqlx::Result<u64> {
    let mut written = 0;
    for chunk in rows.chunks(batch_size.max(1)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SUMMARY_COLUMNS);
        qb.push_values(chunk, |mut b, s| {
            b.push_bind(s.host.clone())
                .push_bind(s.interface.clone())
                .push_bind(s.hour)
                .push_bind(s.total_bytes)
                .push_bind(s.total_mb)
                .push_bind(s.avg_speed_bps)
                .push_bind(s.speed_mbps)
                .push_bind(s.speed_display.clone())
                .push_bind(s.sample_count)
                .push_bind(s.created_at);
        });
        written += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(written)
}

pub(super) async fn insert_raw_chunked(
    conn: &mut SqliteConnection,
    rows: &[RawSample],
    batch_size: usize,
) -> sqlx::Result<u64> {
    let mut written = 0;
    for chunk in rows.chunks(batch_size.max(1)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(RAW_COLUMNS);
        qb.push_values(chunk, |mut b, s| {
            b.push_bind(s.host.clone())
                .push_bind(s.interface.clone())
                .push_bind(s.timestamp)
                .push_bind(s.bytes_recv)
                .push_bind(s.bytes_sent)
                .push_bind(s.packets_recv)
                .push_bind(s.packets_sent)
                .push_bind(s.err_in)
                .push_bind(s.err_out)
                .push_bind(s.drop_in)
                .push_bind(s.drop_out)
                .push_bind(s.speed);
        });
        written += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(written)
}
