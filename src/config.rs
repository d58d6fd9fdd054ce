use chrono::FixedOffset;
use serde::Deserialize;
use std::time::Duration;

use crate::models::MetricKind;
use crate::rollup::RollupConfig;
use crate::scheduler::{SchedulerConfig, parse_schedule};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rollup: RollupSection,
    #[serde(default)]
    pub retention: RetentionSection,
    #[serde(default)]
    pub cron: CronSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollupSection {
    /// Cron expression for the rollup cycle (5- or 6-field).
    #[serde(default = "default_rollup_schedule")]
    pub schedule: String,
    /// Raw samples newer than this are left for a later cycle.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    /// Summary rows per INSERT statement.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Reference timezone for hour buckets and cron times, e.g. "+08:00".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Run one cycle at startup before the first scheduled tick.
    #[serde(default)]
    pub run_on_startup: bool,
}

impl Default for RollupSection {
    fn default() -> Self {
        Self {
            schedule: default_rollup_schedule(),
            lookback_hours: default_lookback_hours(),
            batch_size: default_batch_size(),
            timezone: default_timezone(),
            timeout_secs: default_timeout_secs(),
            run_on_startup: false,
        }
    }
}

fn default_rollup_schedule() -> String {
    "5 * * * *".into()
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_batch_size() -> usize {
    100
}

fn default_timezone() -> String {
    "+00:00".into()
}

fn default_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSection {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_disk_schedule")]
    pub disk_schedule: String,
    #[serde(default = "default_cpu_schedule")]
    pub cpu_schedule: String,
    #[serde(default = "default_mem_schedule")]
    pub mem_schedule: String,
}

impl Default for RetentionSection {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            disk_schedule: default_disk_schedule(),
            cpu_schedule: default_cpu_schedule(),
            mem_schedule: default_mem_schedule(),
        }
    }
}

impl RetentionSection {
    /// Cron expression of a kind's retention job. Net rows are removed by the rollup.
    pub fn schedule_for(&self, kind: MetricKind) -> Option<&str> {
        match kind {
            MetricKind::Disk => Some(self.disk_schedule.as_str()),
            MetricKind::Cpu => Some(self.cpu_schedule.as_str()),
            MetricKind::Mem => Some(self.mem_schedule.as_str()),
            MetricKind::Net => None,
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_disk_schedule() -> String {
    "2 0 * * *".into()
}

fn default_cpu_schedule() -> String {
    "3 1 * * *".into()
}

fn default_mem_schedule() -> String {
    "4 2 * * *".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CronSection {
    #[serde(default = "default_cron_enable")]
    pub enable: bool,
}

impl Default for CronSection {
    fn default() -> Self {
        Self {
            enable: default_cron_enable(),
        }
    }
}

fn default_cron_enable() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timezone(&self) -> anyhow::Result<FixedOffset> {
        self.rollup.timezone.parse::<FixedOffset>().map_err(|e| {
            anyhow::anyhow!(
                "rollup.timezone must be an offset like \"+08:00\", got {:?}: {}",
                self.rollup.timezone,
                e
            )
        })
    }

    pub fn rollup_config(&self) -> anyhow::Result<RollupConfig> {
        Ok(RollupConfig {
            lookback_hours: self.rollup.lookback_hours,
            batch_size: self.rollup.batch_size,
            timezone: self.timezone()?,
        })
    }

    pub fn scheduler_config(&self) -> anyhow::Result<SchedulerConfig> {
        Ok(SchedulerConfig {
            enabled: self.cron.enable,
            rollup_schedule: self.rollup.schedule.clone(),
            retention_schedules: MetricKind::RETAINED
                .into_iter()
                .filter_map(|kind| Some((kind, self.retention.schedule_for(kind)?.to_string())))
                .collect(),
            retention_days: self.retention.retention_days,
            job_timeout: Duration::from_secs(self.rollup.timeout_secs),
            timezone: self.timezone()?,
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.rollup.lookback_hours > 0,
            "rollup.lookback_hours must be > 0, got {}",
            self.rollup.lookback_hours
        );
        anyhow::ensure!(
            self.rollup.batch_size > 0,
            "rollup.batch_size must be > 0, got {}",
            self.rollup.batch_size
        );
        anyhow::ensure!(
            self.rollup.timeout_secs > 0,
            "rollup.timeout_secs must be > 0, got {}",
            self.rollup.timeout_secs
        );
        anyhow::ensure!(
            self.retention.retention_days > 0,
            "retention.retention_days must be > 0, got {}",
            self.retention.retention_days
        );
        self.timezone()?;
        for (name, expr) in [
            ("rollup.schedule", &self.rollup.schedule),
            ("retention.disk_schedule", &self.retention.disk_schedule),
            ("retention.cpu_schedule", &self.retention.cpu_schedule),
            ("retention.mem_schedule", &self.retention.mem_schedule),
        ] {
            parse_schedule(expr).map_err(|e| anyhow::anyhow!("{name}: {e:#}"))?;
        }
        Ok(())
    }
}
