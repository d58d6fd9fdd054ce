// Raw per-interface counter readings, one row per agent report per collection tick.

use serde::{Deserialize, Serialize};

/// One network interface reading as written by ingestion.
/// `bytes_recv` / `bytes_sent` are monotonic since device start and only drop on a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    pub host: String,
    pub interface: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub bytes_recv: i64,
    pub bytes_sent: i64,
    #[serde(default)]
    pub packets_recv: i64,
    #[serde(default)]
    pub packets_sent: i64,
    #[serde(default)]
    pub err_in: i64,
    #[serde(default)]
    pub err_out: i64,
    #[serde(default)]
    pub drop_in: i64,
    #[serde(default)]
    pub drop_out: i64,
    /// Link speed reported by the agent (Mbps).
    #[serde(default)]
    pub speed: i64,
}

impl RawSample {
    /// Reading with only the aggregated counters set.
    pub fn new(
        host: impl Into<String>,
        interface: impl Into<String>,
        timestamp: i64,
        bytes_recv: i64,
        bytes_sent: i64,
    ) -> Self {
        Self {
            host: host.into(),
            interface: interface.into(),
            timestamp,
            bytes_recv,
            bytes_sent,
            packets_recv: 0,
            packets_sent: 0,
            err_in: 0,
            err_out: 0,
            drop_in: 0,
            drop_out: 0,
            speed: 0,
        }
    }
}
