use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::connection::ConnectionManager;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    active_connections: usize,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    total_connections: u64,
    active_connections: usize,
    total_requests: u64,
    total_errors: u64,
}

type ApiState = Arc<ConnectionManager>;

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.get_stats().await;
    let response = HealthResponse {
        status: "ok",
        active_connections: stats.active_connections,
    };
    (StatusCode::OK, Json(response))
}

async fn stats_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.get_stats().await;
    let response = StatsResponse {
        total_connections: stats.total_connections,
        active_connections: stats.active_connections,
        total_requests: stats.total_requests,
        total_errors: stats.total_errors,
    };
    (StatusCode::OK, Json(response))
}

pub async fn start_http_server(
    bind_addr: String,
    bind_port: u16,
    manager: Arc<ConnectionManager>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .with_state(manager)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr = format!("{bind_addr}:{bind_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("HTTP API shutting down");
        })
        .await?;

    Ok(())
}
