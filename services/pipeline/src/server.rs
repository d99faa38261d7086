use crate::cli::ServeArgs;
use crate::infra::{load_quality_config, AppState, InMemoryRecordSink};
use crate::routes::with_quality_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use honey_quality::config::AppConfig;
use honey_quality::error::AppError;
use honey_quality::monitoring::SysinfoSampler;
use honey_quality::telemetry;
use honey_quality::workflows::quality::QualityPipelineService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;
    let quality = load_quality_config(args.config.as_deref(), &config.paths.quality_config)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pipeline = quality.pipeline.name.clone();
    let service = Arc::new(QualityPipelineService::new(
        quality,
        Arc::new(InMemoryRecordSink::default()),
        Arc::new(SysinfoSampler::new()),
    ));

    let app = with_quality_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %pipeline, "honey quality service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
