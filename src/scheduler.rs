// Background scheduler: one cron timer per job (rollup cycle, CPU/mem/disk retention).
// A job's next fire time is computed only after its previous run finishes, so a job never
// overlaps itself. Errors, timeouts and panics are logged and the timer keeps going.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{FixedOffset, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics_store::MetricsStore;
use crate::models::MetricKind;
use crate::retention;
use crate::rollup::{CycleOutcome, RollupCoordinator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Rollup,
    Retention(MetricKind),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Rollup => f.write_str("rollup"),
            Job::Retention(kind) => write!(f, "retention:{kind}"),
        }
    }
}

/// How one guarded job run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
    TimedOut,
    Panicked,
}

/// Scheduler settings resolved from `[cron]`, `[rollup]` and `[retention]` config.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// When false no jobs are registered.
    pub enabled: bool,
    pub rollup_schedule: String,
    pub retention_schedules: Vec<(MetricKind, String)>,
    pub retention_days: u32,
    /// Upper bound on one job run; an expired rollup drops (rolls back) its transaction.
    pub job_timeout: Duration,
    /// Timezone cron expressions are evaluated in.
    pub timezone: FixedOffset,
}

#[derive(Debug, Clone)]
struct ScheduledJob {
    job: Job,
    schedule: cron::Schedule,
}

/// Parses a cron expression. Standard 5-field expressions get a leading `0` seconds field.
pub fn parse_schedule(expr: &str) -> anyhow::Result<cron::Schedule> {
    let expr = expr.trim();
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    cron::Schedule::from_str(&normalized).with_context(|| format!("invalid cron expression {expr:?}"))
}

pub struct Scheduler {
    store: Arc<MetricsStore>,
    coordinator: Arc<RollupCoordinator>,
    jobs: Vec<ScheduledJob>,
    retention_days: u32,
    job_timeout: Duration,
    timezone: FixedOffset,
}

impl Scheduler {
    /// Registers every job. A bad cron expression fails here, at startup, not at run time.
    pub fn new(
        store: Arc<MetricsStore>,
        coordinator: Arc<RollupCoordinator>,
        config: &SchedulerConfig,
    ) -> anyhow::Result<Self> {
        let mut jobs = Vec::new();
        if config.enabled {
            jobs.push(ScheduledJob {
                job: Job::Rollup,
                schedule: parse_schedule(&config.rollup_schedule).context("rollup schedule")?,
            });
            for (kind, expr) in &config.retention_schedules {
                jobs.push(ScheduledJob {
                    job: Job::Retention(*kind),
                    schedule: parse_schedule(expr)
                        .with_context(|| format!("{kind} retention schedule"))?,
                });
            }
        }
        Ok(Self {
            store,
            coordinator,
            jobs,
            retention_days: config.retention_days,
            job_timeout: config.job_timeout,
            timezone: config.timezone,
        })
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.iter().map(|j| j.job).collect()
    }

    /// Next fire time of `job` strictly after `after` (unix seconds).
    pub fn next_fire(&self, job: Job, after: i64) -> Option<i64> {
        let scheduled = self.jobs.iter().find(|j| j.job == job)?;
        let after = chrono::DateTime::from_timestamp(after, 0)?.with_timezone(&self.timezone);
        scheduled.schedule.after(&after).next().map(|t| t.timestamp())
    }

    /// Runs one job to completion against `now` (unix seconds).
    pub async fn run_job(&self, job: Job, now: i64) -> anyhow::Result<()> {
        match job {
            Job::Rollup => match self.coordinator.run_cycle(now).await? {
                CycleOutcome::Empty { cutoff } => {
                    info!(cutoff, "rollup: no data to process");
                }
                CycleOutcome::Committed { .. } => {}
            },
            Job::Retention(kind) => {
                retention::prune_kind(&self.store, kind, self.retention_days, now).await?;
            }
        }
        Ok(())
    }

    /// Spawns one timer task per job. All of them stop when `shutdown` flips or its sender drops.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let this = Arc::new(self);
        tokio::spawn(async move {
            if this.jobs.is_empty() {
                info!("cron disabled; no jobs registered");
                return;
            }
            let mut handles = Vec::with_capacity(this.jobs.len());
            for scheduled in this.jobs.clone() {
                handles.push(tokio::spawn(job_loop(
                    this.clone(),
                    scheduled,
                    shutdown.clone(),
                )));
            }
            for h in handles {
                if let Err(e) = h.await {
                    warn!(error = %e, "job timer task ended abnormally");
                }
            }
            debug!("scheduler stopped");
        })
    }

    /// Runs `job` on its own task with the configured timeout, so a panic or an overrun is
    /// contained to this run. An expired or panicked rollup drops its transaction, which
    /// rolls it back. Failures are logged here: there is no caller to report to.
    pub async fn run_guarded_at(self: &Arc<Self>, job: Job, now: i64) -> RunStatus {
        let this = self.clone();
        let timeout = self.job_timeout;
        let handle =
            tokio::spawn(async move { tokio::time::timeout(timeout, this.run_job(job, now)).await });
        match handle.await {
            Ok(Ok(Ok(()))) => RunStatus::Completed,
            Ok(Ok(Err(e))) => {
                warn!(job = %job, error = %e, "job failed");
                RunStatus::Failed
            }
            Ok(Err(_)) => {
                warn!(
                    job = %job,
                    timeout_secs = timeout.as_secs_f64(),
                    "job timed out"
                );
                RunStatus::TimedOut
            }
            Err(e) => {
                warn!(job = %job, error = %e, "job panicked");
                RunStatus::Panicked
            }
        }
    }
}

async fn job_loop(
    scheduler: Arc<Scheduler>,
    scheduled: ScheduledJob,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(job = %scheduled.job, "job registered");
    loop {
        let now = Utc::now().with_timezone(&scheduler.timezone);
        let Some(next) = scheduled.schedule.after(&now).next() else {
            warn!(job = %scheduled.job, "schedule has no upcoming fire time; stopping timer");
            return;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        debug!(job = %scheduled.job, next = %next, "next run scheduled");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
        scheduler
            .run_guarded_at(scheduled.job, Utc::now().timestamp())
            .await;
    }
    debug!(job = %scheduled.job, "job timer stopped");
}
