use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::models::Reading,
    telemetry::{render_in_timezone, TelemetryError, TimeView},
};

/// Success message returned by `POST /api/telemetry`.
pub const SAVED_MESSAGE: &str = "Dato guardado correctamente";

/// Request body for `POST /api/telemetry`, as sent by the device.
///
/// Fields stay untyped until validation so that a missing field and a
/// malformed one produce different errors.
#[derive(Debug, Default, ToSchema)]
pub struct TelemetrySubmission {
    /// Degrees Celsius
    #[schema(value_type = Option<f64>, example = 22.5)]
    pub temp: Option<Value>,
    /// Relative humidity percentage
    #[schema(value_type = Option<f64>, example = 60)]
    pub hum: Option<Value>,
    /// Device time: RFC 3339 string or epoch milliseconds.
    #[schema(value_type = Option<String>, example = "2024-01-01T12:00:00Z")]
    pub timestamp: Option<Value>,
}

impl TelemetrySubmission {
    /// Parse a raw request body regardless of its `Content-Type`.
    ///
    /// An empty body reads as `{}`, and JSON that is not an object carries no
    /// fields, so both end up reported as missing fields by validation.
    pub fn from_body(body: &[u8]) -> Result<Self, TelemetryError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| TelemetryError::MalformedBody(e.to_string()))?;
        Ok(Self::from(value))
    }
}

impl From<Value> for TelemetrySubmission {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => Self {
                temp: fields.remove("temp"),
                hum: fields.remove("hum"),
                timestamp: fields.remove("timestamp"),
            },
            _ => Self::default(),
        }
    }
}

/// Response for `POST /api/telemetry`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub message: String,
    pub id: Uuid,
    /// Seconds since the previous reading was received; `null` for the first.
    #[serde(rename = "intervaloSegundos")]
    pub interval_seconds: Option<i64>,
    /// Receipt time in the display timezone.
    #[serde(rename = "horaLocal")]
    pub local_time: String,
}

impl IngestResponse {
    pub fn new(reading: &Reading, zone: Tz) -> Self {
        Self {
            message: SAVED_MESSAGE.to_owned(),
            id: reading.id,
            interval_seconds: reading.interval_seconds,
            local_time: render_in_timezone(reading.received_at, zone),
        }
    }
}

/// One stored reading with every time field rendered in the display timezone.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "hum")]
    pub humidity: f64,
    #[serde(rename = "timestamp")]
    pub device_timestamp: String,
    #[serde(rename = "horaRecepcion")]
    pub received_at: String,
    #[serde(rename = "horaGuardado")]
    pub committed_at: String,
    #[serde(rename = "intervaloSegundos")]
    pub interval_seconds: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "__v")]
    pub version: i32,
}

impl ReadingDto {
    pub fn project(r: &Reading, zone: Tz) -> Self {
        Self {
            id: r.id,
            temperature: r.temperature,
            humidity: r.humidity,
            device_timestamp: render_in_timezone(r.device_timestamp, zone),
            received_at: render_in_timezone(r.received_at, zone),
            committed_at: render_in_timezone(r.committed_at, zone),
            interval_seconds: r.interval_seconds,
            created_at: render_in_timezone(r.created_at, zone),
            updated_at: render_in_timezone(r.updated_at, zone),
            version: r.version,
        }
    }
}

/// Response for `GET /api/telemetry/last`: each instant both raw and rendered.
#[derive(Debug, Serialize, ToSchema)]
pub struct LatestReadingDto {
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "hum")]
    pub humidity: f64,
    #[serde(rename = "intervaloSegundos")]
    pub interval_seconds: Option<i64>,
    #[serde(rename = "timestamp")]
    pub device_timestamp: TimeView,
    #[serde(rename = "horaRecepcion")]
    pub received_at: TimeView,
    #[serde(rename = "horaGuardado")]
    pub committed_at: TimeView,
}

impl LatestReadingDto {
    pub fn project(r: &Reading, zone: Tz) -> Self {
        Self {
            temperature: r.temperature,
            humidity: r.humidity,
            interval_seconds: r.interval_seconds,
            device_timestamp: TimeView::new(r.device_timestamp, zone),
            received_at: TimeView::new(r.received_at, zone),
            committed_at: TimeView::new(r.committed_at, zone),
        }
    }
}

/// Response for `GET /api/telemetry/count`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub total_registros: i64,
}
