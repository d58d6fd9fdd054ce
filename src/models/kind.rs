// Metric kinds and the fixed table each one lives in.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Mem,
    Disk,
    Net,
}

impl MetricKind {
    /// Kinds cleaned up by the delete-only retention jobs, in registration order.
    pub const RETAINED: [MetricKind; 3] = [MetricKind::Disk, MetricKind::Cpu, MetricKind::Mem];

    pub fn table(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu_metrics",
            MetricKind::Mem => "mem_metrics",
            MetricKind::Disk => "disk_metrics",
            MetricKind::Net => "net_metrics",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Mem => "mem",
            MetricKind::Disk => "disk",
            MetricKind::Net => "net",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
