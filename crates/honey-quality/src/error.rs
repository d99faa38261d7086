use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::quality::batch::{BatchOutcome, Stage};
use crate::workflows::quality::QualityServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Service(QualityServiceError),
    BatchFailed {
        run_id: String,
        stage: Option<Stage>,
        message: String,
    },
}

impl AppError {
    /// Surface a failed run as an error for callers that need a non-zero exit.
    pub fn from_failed_outcome(outcome: &BatchOutcome) -> Option<Self> {
        if outcome.is_success() {
            return None;
        }
        Some(Self::BatchFailed {
            run_id: outcome.run_id.to_string(),
            stage: outcome.failed_stage,
            message: outcome.error.clone().unwrap_or_default(),
        })
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Service(err) => write!(f, "service error: {}", err),
            AppError::BatchFailed {
                run_id,
                stage,
                message,
            } => write!(
                f,
                "batch {} failed during {}: {}",
                run_id,
                stage.map(Stage::label).unwrap_or("unknown stage"),
                message
            ),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Service(err) => Some(err),
            AppError::BatchFailed { .. } => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BatchFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<QualityServiceError> for AppError {
    fn from(value: QualityServiceError) -> Self {
        Self::Service(value)
    }
}
