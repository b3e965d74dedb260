use axum::{body::Bytes, extract::State, http::StatusCode, response::Html, Json};
use utoipa::OpenApi;

use super::{
    dto::{CountResponse, IngestResponse, LatestReadingDto, ReadingDto, TelemetrySubmission},
    errors::AppError,
    AppState,
};
use crate::telemetry::{ingest, render_in_timezone, TelemetryError, TimeView};

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Store one reading sent by the device.
///
/// The body is read as raw bytes so that an empty body, a missing
/// `Content-Type` or a non-object JSON value all go through validation and
/// come back as 400 with the usual error shape.
#[utoipa::path(
    post,
    path = "/api/telemetry",
    request_body = TelemetrySubmission,
    responses(
        (status = 201, description = "Reading stored", body = IngestResponse),
        (status = 400, description = "Missing or invalid field, or malformed body"),
        (status = 500, description = "Store error"),
    ),
    tag = "telemetry"
)]
pub async fn create_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let body = TelemetrySubmission::from_body(&body)?;
    let reading = ingest::validate(body.temp.as_ref(), body.hum.as_ref(), body.timestamp.as_ref())?;
    let row = state.ingest.record(reading).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse::new(&row, state.display_timezone)),
    ))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Every stored reading, newest device timestamp first, times rendered in the
/// display timezone.
#[utoipa::path(
    get,
    path = "/api/telemetry",
    responses(
        (status = 200, description = "All readings", body = Vec<ReadingDto>),
        (status = 500, description = "Store error"),
    ),
    tag = "telemetry"
)]
pub async fn list_readings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReadingDto>>, AppError> {
    let rows = state.store.find_all_by_device_timestamp().await?;
    let zone = state.display_timezone;

    Ok(Json(rows.iter().map(|r| ReadingDto::project(r, zone)).collect()))
}

/// The most recently stored reading.
#[utoipa::path(
    get,
    path = "/api/telemetry/last",
    responses(
        (status = 200, description = "Latest reading", body = LatestReadingDto),
        (status = 404, description = "No readings stored yet"),
        (status = 500, description = "Store error"),
    ),
    tag = "telemetry"
)]
pub async fn latest_reading(
    State(state): State<AppState>,
) -> Result<Json<LatestReadingDto>, AppError> {
    let row = state
        .store
        .find_latest()
        .await?
        .ok_or(TelemetryError::NoRecords)?;

    Ok(Json(LatestReadingDto::project(&row, state.display_timezone)))
}

#[utoipa::path(
    get,
    path = "/api/telemetry/count",
    responses(
        (status = 200, description = "Number of stored readings", body = CountResponse),
        (status = 500, description = "Store error"),
    ),
    tag = "telemetry"
)]
pub async fn count_readings(
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    let total_registros = state.store.count().await?;
    Ok(Json(CountResponse { total_registros }))
}

// ---------------------------------------------------------------------------
// Status page & health check
// ---------------------------------------------------------------------------

/// Human-readable status page.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Status page", body = String, content_type = "text/html"),
        (status = 500, description = "Store error"),
    ),
    tag = "system"
)]
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let total = state.store.count().await?;
    let now = render_in_timezone(state.clock.now(), state.display_timezone);

    Ok(Html(format!(
        "<h1>ESP32 Telemetry</h1>\n\
         <p>API running</p>\n\
         <p><strong>Total records:</strong> {total}</p>\n\
         <p><strong>Local time ({zone}):</strong> {now}</p>\n\
         <p>POST: /api/telemetry</p>\n",
        zone = state.display_timezone.name(),
    )))
}

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(create_reading, list_readings, latest_reading, count_readings, home, health),
    components(schemas(
        TelemetrySubmission,
        IngestResponse,
        ReadingDto,
        LatestReadingDto,
        CountResponse,
        TimeView
    )),
    tags(
        (name = "telemetry", description = "Sensor telemetry endpoints"),
        (name = "system",    description = "System endpoints"),
    ),
    info(
        title = "ESP32 Telemetry API",
        version = "0.1.0",
        description = "Ingests temperature/humidity readings and serves them back"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
