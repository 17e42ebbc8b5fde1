use crate::cli::ServeArgs;
use crate::infra::{load_store, AppState};
use crate::routes::with_award_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scholarship_ledger::awards::{AwardDesk, TracingNotifier};
use scholarship_ledger::config::AppConfig;
use scholarship_ledger::error::AppError;
use scholarship_ledger::telemetry;
use std::sync::atomic::Ordering;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(load_store(config.seed_file.as_deref())?);
    let notifier = Arc::new(TracingNotifier::new(config.notifications.sender.clone()));
    let desk = Arc::new(AwardDesk::new(store, notifier, &config.notifications));

    let app = with_award_routes(desk)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        notifications = config.notifications.enabled,
        "scholarship ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
