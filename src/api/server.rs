use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{services, state::AppState};
use crate::config::Config;
use crate::engine::JobEngine;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(services::health))
        .route("/operators/metrics", get(services::metrics))
        .route(
            "/session",
            get(services::get_session)
                .patch(services::update_session)
                .delete(services::clear_session),
        )
        .route("/employer", post(services::register_employer))
        .route("/fees", get(services::get_fees))
        .route(
            "/worker",
            put(services::put_worker_profile).delete(services::clear_worker_profile),
        )
        .route("/wallet", get(services::get_wallet))
        .route("/packages/{package}", post(services::purchase_package))
        .route("/jobs", get(services::list_jobs).post(services::create_job))
        .route("/jobs/expire", post(services::expire_jobs))
        .route("/jobs/{job_id}", get(services::get_job))
        .route("/jobs/{job_id}/confirm", post(services::confirm_job))
        .route("/jobs/{job_id}/refund", post(services::refund_job))
        .route("/jobs/{job_id}/status", put(services::update_job_status))
        .with_state(state)
        // gzip request bodies are inflated before extraction
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(
    config: Config,
    engine: Arc<JobEngine>,
    address: SocketAddr,
) -> Result<(), AnyError> {
    let state = AppState::new(config, engine);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "Livora API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
