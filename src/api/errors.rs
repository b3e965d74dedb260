use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::telemetry::TelemetryError;

#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing client input.
    Validation(String),
    NotFound(String),
    /// Store or unexpected failure. The message reaches the client as-is.
    Internal(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Validation(m) | Self::NotFound(m) => m,
            Self::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                e.root_cause().to_string()
            }
        };
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<TelemetryError> for AppError {
    fn from(e: TelemetryError) -> Self {
        match e {
            TelemetryError::MissingField
            | TelemetryError::MalformedBody(_)
            | TelemetryError::InvalidTimestamp
            | TelemetryError::InvalidNumber(_) => Self::Validation(e.to_string()),
            TelemetryError::NoRecords => Self::NotFound(e.to_string()),
            TelemetryError::Store(inner) => Self::Internal(inner),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}
