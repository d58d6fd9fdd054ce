use anyhow::Result;
use std::sync::Arc;
use telemetry_rollup::*;
use tikv_jemallocator::Jemalloc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %app_config.database.path,
        "starting telemetry rollup"
    );

    let store = Arc::new(
        metrics_store::MetricsStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    store.init().await?;

    let coordinator = Arc::new(rollup::RollupCoordinator::new(
        store.clone(),
        app_config.rollup_config()?,
    ));

    if app_config.rollup.run_on_startup
        && let Err(e) =
            backfill::run_backfill(&coordinator, chrono::Utc::now().timestamp()).await
    {
        tracing::warn!(error = %e, "startup rollup failed; next scheduled tick will retry");
    }

    // Bad cron expressions are fatal here, before anything is scheduled.
    let scheduler =
        scheduler::Scheduler::new(store, coordinator, &app_config.scheduler_config()?)?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler_handle = scheduler.spawn(shutdown_rx);

    wait_for_shutdown().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;

    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
