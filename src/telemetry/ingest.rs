use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::info;

use super::TelemetryError;
use crate::{
    clock::Clock,
    db::{
        models::{NewReading, Reading},
        TelemetryStore,
    },
};

/// Largest magnitude a numeric timestamp may have, in epoch milliseconds
/// (100 000 000 days either side of 1970).
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Date-time layouts accepted when the string carries no UTC offset.
/// Such values are read as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading {
    pub temperature: f64,
    pub humidity: f64,
    pub device_timestamp: DateTime<Utc>,
}

/// Check a raw `{temp, hum, timestamp}` submission.
///
/// Presence of all three fields is checked before any of them is parsed, so
/// a body missing `hum` reports the missing field even if `timestamp` is
/// garbage.
pub fn validate(
    temp: Option<&Value>,
    hum: Option<&Value>,
    timestamp: Option<&Value>,
) -> Result<ValidReading, TelemetryError> {
    let (Some(temp), Some(hum), Some(timestamp)) = (present(temp), present(hum), timestamp)
    else {
        return Err(TelemetryError::MissingField);
    };
    if is_falsy(timestamp) {
        return Err(TelemetryError::MissingField);
    }

    let device_timestamp = parse_timestamp(timestamp)?;

    Ok(ValidReading {
        temperature: parse_number(temp, "temperature")?,
        humidity: parse_number(hum, "humidity")?,
        device_timestamp,
    })
}

/// Whole seconds from `previous` to `current`, rounded toward negative
/// infinity. Negative when the clocks went backwards.
pub fn inter_arrival_seconds(previous: DateTime<Utc>, current: DateTime<Utc>) -> i64 {
    (current - previous).num_milliseconds().div_euclid(1000)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn parse_number(value: &Value, field: &'static str) -> Result<f64, TelemetryError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or(TelemetryError::InvalidNumber(field))
}

/// Numbers are epoch milliseconds; strings are RFC 3339, an offset-less
/// ISO-8601 date-time, a bare date, or RFC 2822.
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, TelemetryError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|ms| ms.is_finite() && ms.abs() <= MAX_EPOCH_MILLIS)
            .and_then(|ms| DateTime::from_timestamp_millis(ms.trunc() as i64)),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    };
    parsed.ok_or(TelemetryError::InvalidTimestamp)
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
    {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// IngestService
// ---------------------------------------------------------------------------

/// Persists validated readings, deriving the inter-arrival interval from the
/// most recent stored reading.
#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn TelemetryStore>,
    clock: Arc<dyn Clock>,
}

impl IngestService {
    pub fn new(store: Arc<dyn TelemetryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stores one reading and returns the persisted row.
    ///
    /// The lookup of the previous reading and the insert are two separate
    /// store calls. Concurrent submissions may observe the same previous
    /// reading.
    pub async fn record(&self, reading: ValidReading) -> Result<Reading, TelemetryError> {
        let received_at = self.clock.now();

        let previous = self.store.find_latest().await?;
        let interval_seconds = previous.map(|p| inter_arrival_seconds(p.received_at, received_at));

        let committed_at = self.clock.now();
        let row = self
            .store
            .insert(NewReading {
                temperature: reading.temperature,
                humidity: reading.humidity,
                device_timestamp: reading.device_timestamp,
                received_at,
                committed_at,
                interval_seconds,
            })
            .await?;

        info!(
            id = %row.id,
            temperature = row.temperature,
            humidity = row.humidity,
            device_timestamp = %row.device_timestamp,
            interval_seconds = ?row.interval_seconds,
            "Reading persisted"
        );
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::{clock::ManualClock, db::memory::MemoryStore};

    fn check(body: Value) -> Result<ValidReading, TelemetryError> {
        validate(body.get("temp"), body.get("hum"), body.get("timestamp"))
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // validate
    // -----------------------------------------------------------------------

    #[test]
    fn accepts_a_complete_submission() {
        let r = check(json!({ "temp": 22.5, "hum": 60, "timestamp": "2024-01-01T12:00:00Z" }))
            .unwrap();
        assert_eq!(r.temperature, 22.5);
        assert_eq!(r.humidity, 60.0);
        assert_eq!(r.device_timestamp, noon());
    }

    #[test]
    fn missing_fields_are_rejected() {
        let bodies = [
            json!({ "hum": 60, "timestamp": "2024-01-01T12:00:00Z" }),
            json!({ "temp": 22.5, "timestamp": "2024-01-01T12:00:00Z" }),
            json!({ "temp": 22.5, "hum": 60 }),
            json!({ "temp": null, "hum": 60, "timestamp": "2024-01-01T12:00:00Z" }),
        ];
        for body in bodies {
            assert!(
                matches!(check(body.clone()), Err(TelemetryError::MissingField)),
                "{body}"
            );
        }
    }

    #[test]
    fn falsy_timestamps_count_as_missing() {
        for ts in [json!(""), json!(0), json!(false), json!(null)] {
            let body = json!({ "temp": 1, "hum": 2, "timestamp": ts.clone() });
            assert!(matches!(check(body), Err(TelemetryError::MissingField)), "{ts}");
        }
    }

    #[test]
    fn zero_readings_are_not_missing() {
        let r = check(json!({ "temp": 0, "hum": 0, "timestamp": "2024-01-01" })).unwrap();
        assert_eq!(r.temperature, 0.0);
        assert_eq!(r.humidity, 0.0);
    }

    #[test]
    fn unparseable_timestamp_is_invalid() {
        for ts in [json!("yesterday"), json!("2024-13-45"), json!(true), json!([1])] {
            let body = json!({ "temp": 1, "hum": 2, "timestamp": ts.clone() });
            assert!(matches!(check(body), Err(TelemetryError::InvalidTimestamp)), "{ts}");
        }
    }

    #[test]
    fn missing_field_wins_over_invalid_timestamp() {
        let body = json!({ "temp": 1, "timestamp": "garbage" });
        assert!(matches!(check(body), Err(TelemetryError::MissingField)));
    }

    #[test]
    fn numeric_timestamp_is_epoch_millis() {
        let body = json!({ "temp": 1, "hum": 2, "timestamp": 1_704_110_400_000_i64 });
        assert_eq!(check(body).unwrap().device_timestamp, noon());
    }

    #[test]
    fn out_of_range_numeric_timestamp_is_invalid() {
        let body = json!({ "temp": 1, "hum": 2, "timestamp": 9.0e15 });
        assert!(matches!(check(body), Err(TelemetryError::InvalidTimestamp)));
    }

    #[test]
    fn string_timestamp_layouts() {
        let cases = [
            ("2024-01-01T06:00:00-06:00", noon()),
            ("2024-01-01T12:00:00.000Z", noon()),
            ("2024-01-01T12:00:00", noon()),
            ("2024-01-01 12:00:00", noon()),
            ("2024-01-01T12:00", noon()),
            ("2024-01-01", noon() - Duration::hours(12)),
            ("Mon, 01 Jan 2024 12:00:00 +0000", noon()),
        ];
        for (raw, expected) in cases {
            let body = json!({ "temp": 1, "hum": 2, "timestamp": raw });
            assert_eq!(check(body).unwrap().device_timestamp, expected, "{raw}");
        }
    }

    #[test]
    fn numeric_strings_are_cast() {
        let r = check(json!({ "temp": "22.5", "hum": " 60 ", "timestamp": "2024-01-01" })).unwrap();
        assert_eq!(r.temperature, 22.5);
        assert_eq!(r.humidity, 60.0);
    }

    #[test]
    fn non_numeric_readings_are_invalid() {
        let body = json!({ "temp": "warm", "hum": 60, "timestamp": "2024-01-01" });
        assert!(matches!(
            check(body),
            Err(TelemetryError::InvalidNumber("temperature"))
        ));

        let body = json!({ "temp": 20, "hum": "NaN", "timestamp": "2024-01-01" });
        assert!(matches!(
            check(body),
            Err(TelemetryError::InvalidNumber("humidity"))
        ));
    }

    // -----------------------------------------------------------------------
    // inter_arrival_seconds
    // -----------------------------------------------------------------------

    #[test]
    fn interval_truncates_to_whole_seconds() {
        let t0 = noon();
        assert_eq!(inter_arrival_seconds(t0, t0), 0);
        assert_eq!(inter_arrival_seconds(t0, t0 + Duration::milliseconds(999)), 0);
        assert_eq!(inter_arrival_seconds(t0, t0 + Duration::milliseconds(10_999)), 10);
    }

    #[test]
    fn interval_floors_when_clocks_go_backwards() {
        let t0 = noon();
        assert_eq!(inter_arrival_seconds(t0, t0 - Duration::milliseconds(1)), -1);
        assert_eq!(inter_arrival_seconds(t0, t0 - Duration::seconds(5)), -5);
    }

    // -----------------------------------------------------------------------
    // IngestService
    // -----------------------------------------------------------------------

    fn valid(temperature: f64) -> ValidReading {
        ValidReading {
            temperature,
            humidity: 50.0,
            device_timestamp: noon(),
        }
    }

    #[tokio::test]
    async fn first_reading_has_no_interval() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(noon()));
        let service = IngestService::new(Arc::new(store.clone()), clock);

        let row = service.record(valid(20.0)).await.unwrap();

        assert_eq!(row.interval_seconds, None);
        assert_eq!(row.received_at, noon());
        assert_eq!(row.committed_at, noon());
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn later_reading_gets_interval_from_receipt_times() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(noon()));
        let service = IngestService::new(Arc::new(store.clone()), clock.clone());

        service.record(valid(20.0)).await.unwrap();
        clock.advance(Duration::milliseconds(10_400));
        let row = service.record(valid(21.0)).await.unwrap();

        assert_eq!(row.interval_seconds, Some(10));
        assert_eq!(row.received_at, noon() + Duration::milliseconds(10_400));
    }

    #[tokio::test]
    async fn store_failure_surfaces_and_persists_nothing() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let service = IngestService::new(Arc::new(store.clone()), Arc::new(ManualClock::new(noon())));

        let err = service.record(valid(20.0)).await.unwrap_err();

        assert!(matches!(err, TelemetryError::Store(_)));
        assert!(err.to_string().contains("unavailable"));
        store.set_unavailable(false);
        assert!(store.snapshot().await.is_empty());
    }
}
