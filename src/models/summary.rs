// Hourly traffic rollup: one row per (host, interface, hour) per committed cycle.

use serde::{Deserialize, Serialize};

/// Natural key of a summary: series identity plus the hour bucket start (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesHour {
    pub host: String,
    pub interface: String,
    pub hour: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub host: String,
    pub interface: String,
    /// Hour bucket start (unix seconds).
    pub hour: i64,
    /// Received + sent bytes in the bucket. Never negative.
    pub total_bytes: i64,
    pub total_mb: i64,
    pub avg_speed_bps: f64,
    /// Average speed in Mbps, rounded to two decimals.
    pub speed_mbps: f64,
    /// e.g. "2.50 Mbps".
    pub speed_display: String,
    pub sample_count: i64,
    pub created_at: i64,
}

/// Summary rows for one natural key folded together (late arrivals add supplementary rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyTotal {
    pub host: String,
    pub interface: String,
    pub hour: i64,
    pub total_bytes: i64,
    pub rows: i64,
}
