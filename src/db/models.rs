use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted sensor observation. Rows are insert-only.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// When the device says the measurement was taken.
    pub device_timestamp: DateTime<Utc>,
    /// When the server started handling the request.
    pub received_at: DateTime<Utc>,
    /// Captured right before the insert.
    pub committed_at: DateTime<Utc>,
    /// Whole seconds since the previous reading's `received_at`.
    /// `None` for the first reading ever stored.
    pub interval_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// Fields supplied by the ingestion path; the store fills in the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub temperature: f64,
    pub humidity: f64,
    pub device_timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub committed_at: DateTime<Utc>,
    pub interval_seconds: Option<i64>,
}
