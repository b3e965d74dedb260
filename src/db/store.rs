use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{NewReading, Reading};

/// The document-store operations the service relies on.
///
/// Implementations are shared across request tasks behind an `Arc`.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persist one reading and return it with the store-assigned fields.
    async fn insert(&self, reading: NewReading) -> Result<Reading>;

    /// Every reading, newest `device_timestamp` first.
    async fn find_all_by_device_timestamp(&self) -> Result<Vec<Reading>>;

    /// The reading with the greatest `created_at`, if any.
    async fn find_latest(&self) -> Result<Option<Reading>>;

    async fn count(&self) -> Result<i64>;

    /// Release the underlying connections. Called once on shutdown.
    async fn close(&self) {}
}

const READING_COLUMNS: &str = "id, temperature, humidity, device_timestamp, received_at, \
                               committed_at, interval_seconds, created_at, updated_at, version";

/// Postgres-backed store over the `telemetry` table.
#[derive(Clone)]
pub struct PgTelemetryStore {
    pool: PgPool,
}

impl PgTelemetryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn insert(&self, reading: NewReading) -> Result<Reading> {
        let sql = format!(
            "INSERT INTO telemetry \
                 (temperature, humidity, device_timestamp, received_at, committed_at, interval_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {READING_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Reading>(&sql)
            .bind(reading.temperature)
            .bind(reading.humidity)
            .bind(reading.device_timestamp)
            .bind(reading.received_at)
            .bind(reading.committed_at)
            .bind(reading.interval_seconds)
            .fetch_one(&self.pool)
            .await
            .context("failed to insert telemetry reading")?;

        Ok(row)
    }

    async fn find_all_by_device_timestamp(&self) -> Result<Vec<Reading>> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM telemetry ORDER BY device_timestamp DESC"
        );

        let rows = sqlx::query_as::<_, Reading>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to list telemetry readings")?;

        Ok(rows)
    }

    async fn find_latest(&self) -> Result<Option<Reading>> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM telemetry ORDER BY created_at DESC LIMIT 1"
        );

        let row = sqlx::query_as::<_, Reading>(&sql)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch latest telemetry reading")?;

        Ok(row)
    }

    async fn count(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM telemetry")
            .fetch_one(&self.pool)
            .await
            .context("failed to count telemetry readings")?;

        Ok(total)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
