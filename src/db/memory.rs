use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    models::{NewReading, Reading},
    store::TelemetryStore,
};

/// In-memory `TelemetryStore` used by the HTTP tests.
///
/// Readings are kept in insertion order, so the last element is the one with
/// the greatest `created_at`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Vec<Reading>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the server were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of stored readings in insertion order.
    pub async fn snapshot(&self) -> Vec<Reading> {
        self.inner.read().await.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("connection refused: telemetry store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn insert(&self, reading: NewReading) -> Result<Reading> {
        self.check_available()?;
        let created_at = Utc::now();
        let row = Reading {
            id: Uuid::new_v4(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            device_timestamp: reading.device_timestamp,
            received_at: reading.received_at,
            committed_at: reading.committed_at,
            interval_seconds: reading.interval_seconds,
            created_at,
            updated_at: created_at,
            version: 0,
        };
        self.inner.write().await.push(row.clone());
        Ok(row)
    }

    async fn find_all_by_device_timestamp(&self) -> Result<Vec<Reading>> {
        self.check_available()?;
        let mut rows = self.inner.read().await.clone();
        rows.sort_by(|a, b| b.device_timestamp.cmp(&a.device_timestamp));
        Ok(rows)
    }

    async fn find_latest(&self) -> Result<Option<Reading>> {
        self.check_available()?;
        Ok(self.inner.read().await.last().cloned())
    }

    async fn count(&self) -> Result<i64> {
        self.check_available()?;
        Ok(self.inner.read().await.len() as i64)
    }
}
