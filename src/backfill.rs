// Startup catch-up: one rollup cycle before the first scheduled tick (rollup.run_on_startup).

use crate::rollup::{CycleOutcome, RollupCoordinator};
use tracing::info;

/// Rolls up whatever raw data piled up past the lookback while the process was down.
pub async fn run_backfill(coordinator: &RollupCoordinator, now: i64) -> anyhow::Result<CycleOutcome> {
    info!(
        lookback_hours = coordinator.config().lookback_hours,
        "running startup rollup"
    );
    let outcome = coordinator.run_cycle(now).await?;
    info!(?outcome, "backfill complete");
    Ok(outcome)
}
