use crate::cli::ServeArgs;
use crate::infra::{build_engine, AppState};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rozgar_match::config::AppConfig;
use rozgar_match::error::AppError;
use rozgar_match::matching::{MatchingApi, StopMode, SweepRunner, SweepScheduler};
use rozgar_match::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let engine = Arc::new(build_engine(&config.matching, args.seed_samples)?);
    let matches = Arc::clone(engine.matches());
    let notifications = Arc::clone(engine.notifications());
    let runner: Arc<dyn SweepRunner> = engine;
    let scheduler = Arc::new(SweepScheduler::new(
        runner,
        config.matching.sweep_interval,
    ));

    let api = Arc::new(MatchingApi::new(
        matches,
        notifications,
        Arc::clone(&scheduler),
    ));
    let app = with_matching_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    scheduler.start();
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        interval_secs = config.matching.sweep_interval.as_secs(),
        "rozgar match service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    scheduler.stop(StopMode::Drain).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested; draining in-flight sweep");
}
