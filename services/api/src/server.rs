use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AppState, TracingNotifier};
use crate::routes::with_transfer_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use transfer_admissions::config::AppConfig;
use transfer_admissions::error::AppError;
use transfer_admissions::telemetry;
use transfer_admissions::workflows::transfer::applications::{
    InMemoryTransferRepository, TransferApplicationService,
};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.catalog_path = Some(catalog);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(config.catalog_path.as_deref())?;
    let transfer_service = Arc::new(TransferApplicationService::new(
        Arc::new(InMemoryTransferRepository::default()),
        Arc::new(catalog),
        Arc::new(TracingNotifier),
        config.evaluation.clone(),
    ));

    let app = with_transfer_routes(transfer_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        manual_review_blocks = config.evaluation.manual_review_blocks,
        "transfer admissions service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
