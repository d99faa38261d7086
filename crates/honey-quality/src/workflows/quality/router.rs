use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::repository::RecordSink;
use super::service::QualityPipelineService;

const DEFAULT_DATASET: &str = "upload";
const DEFAULT_RUN_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    #[serde(default)]
    pub(crate) dataset: Option<String>,
    pub(crate) csv: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RunsQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// Batch submission, run history, alert and rule endpoints.
pub fn quality_router<K>(service: Arc<QualityPipelineService<K>>) -> Router
where
    K: RecordSink + 'static,
{
    Router::new()
        .route("/api/v1/quality/batches", post(submit_batch_handler::<K>))
        .route("/api/v1/quality/runs", get(runs_handler::<K>))
        .route("/api/v1/quality/alerts", get(alerts_handler::<K>))
        .route("/api/v1/quality/rules", get(rules_handler::<K>))
        .with_state(service)
}

pub(crate) async fn submit_batch_handler<K>(
    State(service): State<Arc<QualityPipelineService<K>>>,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    K: RecordSink + 'static,
{
    let dataset = request
        .dataset
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATASET.to_string());

    // Parsing, scoring and the load are synchronous.
    let result =
        tokio::task::spawn_blocking(move || service.process_csv(&dataset, request.csv)).await;
    match result {
        Ok(Ok(report)) => {
            let status = if report.outcome.is_success() {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, axum::Json(report)).into_response()
        }
        Ok(Err(error)) => internal_error(error),
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn runs_handler<K>(
    State(service): State<Arc<QualityPipelineService<K>>>,
    Query(query): Query<RunsQuery>,
) -> Response
where
    K: RecordSink + 'static,
{
    match service.recent_runs(query.limit.unwrap_or(DEFAULT_RUN_LIMIT)) {
        Ok(runs) => (StatusCode::OK, axum::Json(json!({ "runs": runs }))).into_response(),
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn alerts_handler<K>(
    State(service): State<Arc<QualityPipelineService<K>>>,
) -> Response
where
    K: RecordSink + 'static,
{
    // Sampling CPU usage sleeps briefly, keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || service.check_alerts()).await;
    match result {
        Ok(Ok(report)) => (StatusCode::OK, axum::Json(report)).into_response(),
        Ok(Err(error)) => internal_error(error),
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn rules_handler<K>(
    State(service): State<Arc<QualityPipelineService<K>>>,
) -> Response
where
    K: RecordSink + 'static,
{
    (StatusCode::OK, axum::Json(service.config().overview())).into_response()
}

fn internal_error(error: impl std::fmt::Display) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
