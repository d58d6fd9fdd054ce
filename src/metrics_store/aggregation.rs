// Hourly traffic rollup: schema for the summary table + pure aggregation logic.
// DB access (fetch, batch insert, delete) stays in metrics_store::mod.

use std::collections::BTreeMap;

use chrono::FixedOffset;
use sqlx::SqlitePool;

use crate::models::{RawSample, SeriesHour, TrafficSummary};

pub const SECS_PER_HOUR: i64 = 3600;

/// Creates the net_hourly_summaries table and indexes if not present.
pub async fn init_summary_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS net_hourly_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host TEXT NOT NULL,
            interface TEXT NOT NULL,
            hour INTEGER NOT NULL,
            total_bytes INTEGER NOT NULL CHECK (total_bytes >= 0),
            total_mb INTEGER NOT NULL,
            avg_speed_bps REAL NOT NULL,
            speed_mbps REAL NOT NULL,
            speed_display TEXT NOT NULL,
            sample_count INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_summaries_series_hour ON net_hourly_summaries(host, interface, hour)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_summaries_hour ON net_hourly_summaries(hour)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Start of the calendar hour containing `ts` in `tz`, as unix seconds.
/// A timestamp exactly on a boundary maps to itself.
pub fn hour_start(ts: i64, tz: FixedOffset) -> i64 {
    let offset = tz.local_minus_utc() as i64;
    ts - (ts + offset).rem_euclid(SECS_PER_HOUR)
}

#[derive(Debug, Clone, Copy)]
struct TrafficStats {
    min_recv: i64,
    max_recv: i64,
    min_sent: i64,
    max_sent: i64,
    count: i64,
}

impl TrafficStats {
    fn first(s: &RawSample) -> Self {
        Self {
            min_recv: s.bytes_recv,
            max_recv: s.bytes_recv,
            min_sent: s.bytes_sent,
            max_sent: s.bytes_sent,
            count: 0,
        }
    }

    fn observe(&mut self, s: &RawSample) {
        self.min_recv = self.min_recv.min(s.bytes_recv);
        self.max_recv = self.max_recv.max(s.bytes_recv);
        self.min_sent = self.min_sent.min(s.bytes_sent);
        self.max_sent = self.max_sent.max(s.bytes_sent);
        self.count += 1;
    }

    /// (max - min) per direction. Undercounts when a reset happens inside the bucket.
    fn total_bytes(&self) -> i64 {
        let recv = self.max_recv.saturating_sub(self.min_recv);
        let sent = self.max_sent.saturating_sub(self.min_sent);
        recv.saturating_add(sent).max(0)
    }
}

/// Groups samples by (host, interface, hour) and reduces each group to a summary.
/// Order of `samples` does not matter. Empty input yields an empty map.
pub fn aggregate_traffic(
    samples: &[RawSample],
    tz: FixedOffset,
    created_at: i64,
) -> BTreeMap<SeriesHour, TrafficSummary> {
    let mut by_key: BTreeMap<SeriesHour, TrafficStats> = BTreeMap::new();
    for s in samples {
        let key = SeriesHour {
            host: s.host.clone(),
            interface: s.interface.clone(),
            hour: hour_start(s.timestamp, tz),
        };
        by_key
            .entry(key)
            .or_insert_with(|| TrafficStats::first(s))
            .observe(s);
    }

    by_key
        .into_iter()
        .map(|(key, stats)| {
            let summary = summarize(&key, &stats, created_at);
            (key, summary)
        })
        .collect()
}

fn summarize(key: &SeriesHour, stats: &TrafficStats, created_at: i64) -> TrafficSummary {
    let total_bytes = stats.total_bytes();
    let avg_speed_bps = average_bps(total_bytes);
    TrafficSummary {
        host: key.host.clone(),
        interface: key.interface.clone(),
        hour: key.hour,
        total_bytes,
        total_mb: total_bytes / 1024 / 1024,
        avg_speed_bps,
        speed_mbps: round_mbps(avg_speed_bps),
        speed_display: format_speed(avg_speed_bps),
        sample_count: stats.count,
        created_at,
    }
}

/// Average bits per second over one full hour bucket.
pub fn average_bps(total_bytes: i64) -> f64 {
    (total_bytes as f64) * 8.0 / (SECS_PER_HOUR as f64)
}

/// bps -> Mbps, rounded half up to two decimals.
pub fn round_mbps(bps: f64) -> f64 {
    ((bps / 1_000_000.0) * 100.0 + 0.5).floor() / 100.0
}

/// Human-readable bitrate: Gbps / Mbps / Kbps / bps by magnitude, two decimals.
pub fn format_speed(bps: f64) -> String {
    if bps >= 1_000_000_000.0 {
        format!("{:.2} Gbps", bps / 1_000_000_000.0)
    } else if bps >= 1_000_000.0 {
        format!("{:.2} Mbps", bps / 1_000_000.0)
    } else if bps >= 1_000.0 {
        format!("{:.2} Kbps", bps / 1_000.0)
    } else {
        format!("{:.2} bps", bps)
    }
}
