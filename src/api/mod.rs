pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use chrono_tz::Tz;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{clock::Clock, db::TelemetryStore, telemetry::IngestService};
use handlers::ApiDoc;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
    pub clock: Arc<dyn Clock>,
    pub ingest: IngestService,
    pub display_timezone: Tz,
}

impl AppState {
    pub fn new(store: Arc<dyn TelemetryStore>, clock: Arc<dyn Clock>, display_timezone: Tz) -> Self {
        Self {
            ingest: IngestService::new(store.clone(), clock.clone()),
            store,
            clock,
            display_timezone,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/telemetry",
            get(handlers::list_readings).post(handlers::create_reading),
        )
        .route("/api/telemetry/last", get(handlers::latest_reading))
        .route("/api/telemetry/count", get(handlers::count_readings))
        .route("/", get(handlers::home))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
