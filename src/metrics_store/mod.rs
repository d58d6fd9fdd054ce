// SQLite metrics store. Raw tables per metric kind (written by ingestion) plus the hourly
// traffic summary table written by the rollup. The pool is shared with the ingestion path.
//
// Transaction-scoped operations take `&mut SqliteConnection` so the rollup can run
// fetch + insert + delete on one transaction (`&mut *tx`).

pub mod aggregation;
mod batch;

use crate::models::{HourlyTotal, MetricKind, RawSample, TrafficSummary};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Rows per INSERT statement when ingestion hands over a batch of raw samples.
const RAW_INSERT_BATCH: usize = 100;

pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Shared pool handle for collaborators (ingestion) writing into the same database.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS net_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                interface TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                bytes_recv INTEGER NOT NULL,
                bytes_sent INTEGER NOT NULL,
                packets_recv INTEGER NOT NULL DEFAULT 0,
                packets_sent INTEGER NOT NULL DEFAULT 0,
                err_in INTEGER NOT NULL DEFAULT 0,
                err_out INTEGER NOT NULL DEFAULT 0,
                drop_in INTEGER NOT NULL DEFAULT 0,
                drop_out INTEGER NOT NULL DEFAULT 0,
                speed INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cpu_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                cpu TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                usage_active REAL NOT NULL DEFAULT 0,
                usage_idle REAL NOT NULL DEFAULT 0,
                usage_iowait REAL NOT NULL DEFAULT 0,
                usage_system REAL NOT NULL DEFAULT 0,
                usage_user REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mem_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                total INTEGER NOT NULL DEFAULT 0,
                used INTEGER NOT NULL DEFAULT 0,
                available INTEGER NOT NULL DEFAULT 0,
                used_percent REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS disk_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                device TEXT NOT NULL,
                path TEXT NOT NULL,
                fstype TEXT NOT NULL DEFAULT '',
                timestamp INTEGER NOT NULL,
                total INTEGER NOT NULL DEFAULT 0,
                used INTEGER NOT NULL DEFAULT 0,
                free INTEGER NOT NULL DEFAULT 0,
                used_percent REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for kind in [
            MetricKind::Net,
            MetricKind::Cpu,
            MetricKind::Mem,
            MetricKind::Disk,
        ] {
            let table = kind.table();
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table}(timestamp)"
            ))
            .execute(&self.pool)
            .await?;
        }

        aggregation::init_summary_table(&self.pool).await?;

        Ok(())
    }

    /// Opens the transaction a rollup cycle runs in. Dropping it without commit rolls back.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front: a deferred transaction that reads
    /// first cannot upgrade once ingestion has committed (SQLITE_BUSY_SNAPSHOT). Ingestion
    /// writers wait on the busy timeout instead.
    pub async fn begin(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    /// Ingestion-side append of raw interface readings (one transaction).
    #[instrument(skip(self, samples), fields(repo = "metrics", operation = "insert_raw_samples", samples_count = samples.len()))]
    pub async fn insert_raw_samples(&self, samples: &[RawSample]) -> anyhow::Result<u64> {
        if samples.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let n = batch::insert_raw_chunked(&mut *tx, samples, RAW_INSERT_BATCH).await?;
        tx.commit().await?;
        Ok(n)
    }

    /// Raw samples with timestamp < cutoff. Order: ascending by timestamp.
    #[instrument(skip(conn), fields(repo = "metrics", operation = "fetch_raw_before"))]
    pub async fn fetch_raw_before(
        conn: &mut SqliteConnection,
        cutoff: i64,
    ) -> sqlx::Result<Vec<RawSample>> {
        let rows = sqlx::query(
            "SELECT host, interface, timestamp, bytes_recv, bytes_sent, packets_recv, packets_sent,
                    err_in, err_out, drop_in, drop_out, speed
             FROM net_metrics WHERE timestamp < $1 ORDER BY timestamp ASC",
        )
        .bind(cutoff)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(parse_raw_row).collect()
    }

    /// Insert summaries in statements of at most `batch_size` rows.
    #[instrument(skip(conn, rows), fields(repo = "metrics", operation = "insert_summaries", rows_count = rows.len()))]
    pub async fn insert_summaries(
        conn: &mut SqliteConnection,
        rows: &[TrafficSummary],
        batch_size: usize,
    ) -> sqlx::Result<u64> {
        batch::insert_summaries_chunked(conn, rows, batch_size).await
    }

    /// Delete raw samples with timestamp < cutoff. Same predicate as `fetch_raw_before`.
    #[instrument(skip(conn), fields(repo = "metrics", operation = "delete_raw_before"))]
    pub async fn delete_raw_before(conn: &mut SqliteConnection, cutoff: i64) -> sqlx::Result<u64> {
        let r = sqlx::query("DELETE FROM net_metrics WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&mut *conn)
            .await?;
        Ok(r.rows_affected())
    }

    /// Single-statement retention delete for one metric kind's raw table.
    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_kind_before"))]
    pub async fn prune_kind_before(&self, kind: MetricKind, cutoff: i64) -> anyhow::Result<u64> {
        let r = sqlx::query(&format!(
            "DELETE FROM {} WHERE timestamp < $1",
            kind.table()
        ))
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    pub async fn count_rows(&self, kind: MetricKind) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_summaries(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM net_hourly_summaries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Summary rows with hour in [from_hour, to_hour). Order: hour, host, interface, id.
    #[instrument(skip(self), fields(repo = "metrics", operation = "get_summaries"))]
    pub async fn get_summaries(
        &self,
        from_hour: i64,
        to_hour: i64,
    ) -> anyhow::Result<Vec<TrafficSummary>> {
        let rows = sqlx::query(
            "SELECT host, interface, hour, total_bytes, total_mb, avg_speed_bps, speed_mbps,
                    speed_display, sample_count, created_at
             FROM net_hourly_summaries
             WHERE hour >= $1 AND hour < $2
             ORDER BY hour ASC, host ASC, interface ASC, id ASC",
        )
        .bind(from_hour)
        .bind(to_hour)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(parse_summary_row(&row)?);
        }
        Ok(out)
    }

    /// One total per (host, interface, hour), folding supplementary rows from late arrivals.
    #[instrument(skip(self), fields(repo = "metrics", operation = "hourly_totals"))]
    pub async fn hourly_totals(
        &self,
        from_hour: i64,
        to_hour: i64,
    ) -> anyhow::Result<Vec<HourlyTotal>> {
        let rows = sqlx::query(
            "SELECT host, interface, hour, SUM(total_bytes) AS total_bytes, COUNT(*) AS row_count
             FROM net_hourly_summaries
             WHERE hour >= $1 AND hour < $2
             GROUP BY host, interface, hour
             ORDER BY hour ASC, host ASC, interface ASC",
        )
        .bind(from_hour)
        .bind(to_hour)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(HourlyTotal {
                host: row.try_get("host")?,
                interface: row.try_get("interface")?,
                hour: row.try_get("hour")?,
                total_bytes: row.try_get("total_bytes")?,
                rows: row.try_get("row_count")?,
            });
        }
        Ok(out)
    }
}

fn parse_raw_row(row: &SqliteRow) -> sqlx::Result<RawSample> {
    Ok(RawSample {
        host: row.try_get("host")?,
        interface: row.try_get("interface")?,
        timestamp: row.try_get("timestamp")?,
        bytes_recv: row.try_get("bytes_recv")?,
        bytes_sent: row.try_get("bytes_sent")?,
        packets_recv: row.try_get("packets_recv")?,
        packets_sent: row.try_get("packets_sent")?,
        err_in: row.try_get("err_in")?,
        err_out: row.try_get("err_out")?,
        drop_in: row.try_get("drop_in")?,
        drop_out: row.try_get("drop_out")?,
        speed: row.try_get("speed")?,
    })
}

fn parse_summary_row(row: &SqliteRow) -> sqlx::Result<TrafficSummary> {
    Ok(TrafficSummary {
        host: row.try_get("host")?,
        interface: row.try_get("interface")?,
        hour: row.try_get("hour")?,
        total_bytes: row.try_get("total_bytes")?,
        total_mb: row.try_get("total_mb")?,
        avg_speed_bps: row.try_get("avg_speed_bps")?,
        speed_mbps: row.try_get("speed_mbps")?,
        speed_display: row.try_get("speed_display")?,
        sample_count: row.try_get("sample_count")?,
        created_at: row.try_get("created_at")?,
    })
}
