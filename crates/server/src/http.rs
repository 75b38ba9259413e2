use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use heating_machine_core::loadgen::LoadEngine;
use heating_machine_core::workqueue::MetricsSnapshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state visible to every axum handler.
struct AppState {
    load_engine: Arc<LoadEngine>,
    queue_metrics: Arc<heating_machine_core::workqueue::Metrics>,
}

/// The ambient HTTP surface: read-only health, readiness, metrics, and
/// dashboard endpoints. Control actions (start/stop/config) go through the
/// role-gated `HeatingMachine` facade, not HTTP.
pub struct Server {
    router: Router,
}

impl Server {
    pub fn new(
        load_engine: Arc<LoadEngine>,
        queue_metrics: Arc<heating_machine_core::workqueue::Metrics>,
    ) -> Self {
        let state = Arc::new(AppState {
            load_engine,
            queue_metrics,
        });

        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .route("/dashboard-data", get(dashboard_data_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        Self { router }
    }

    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "heating-machine server listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.load_engine.health().await;
    Json(report)
}

async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.load_engine.ready().await;
    let status = if report.status == "ready" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot: MetricsSnapshot = state.queue_metrics.snapshot();
    let engine_metrics = state.load_engine.health().await.metrics;
    Json(serde_json::json!({
        "queue": snapshot,
        "load_engine": engine_metrics,
    }))
}

async fn dashboard_data_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.load_engine.health().await;
    let ready = state.load_engine.ready().await;
    let diagnostics = state.load_engine.diagnostics().await;
    let queue = state.queue_metrics.snapshot();

    Json(serde_json::json!({
        "health": health,
        "ready": ready,
        "diagnostics": diagnostics,
        "queue": queue,
    }))
}
