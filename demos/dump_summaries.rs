// Dump hourly traffic summaries as JSON.
//
// Usage: cargo run --example dump_summaries -- [DB_PATH] [HOURS]
//   DB_PATH  default: ./data/metrics.db
//   HOURS    default: 48 (how far back from now)

use telemetry_rollup::metrics_store::MetricsStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/metrics.db");
    let hours: i64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(48);

    let repo = MetricsStore::connect(path, 1).await?;
    let now = chrono::Utc::now().timestamp();
    let summaries = repo.get_summaries(now - hours * 3600, now + 1).await?;

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
