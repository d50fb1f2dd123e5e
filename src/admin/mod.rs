//! Admin API over the health checker.
//!
//! All routes require `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::health::{HealthCheck, MemoryHistory};

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub checker: Arc<HealthCheck>,
    pub history: Option<MemoryHistory>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(checker: Arc<HealthCheck>, api_key: &str) -> Self {
        Self {
            checker,
            history: None,
            api_key: Arc::from(api_key),
        }
    }

    /// Serve `history` under `/admin/history`.
    pub fn with_history(mut self, history: MemoryHistory) -> Self {
        self.history = Some(history);
        self
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/outbounds", get(list_outbounds))
        .route("/admin/outbounds/{tag}", get(get_outbound))
        .route("/admin/outbounds/{tag}/check", post(check_outbound))
        .route("/admin/providers/{tag}/check", post(check_provider))
        .route("/admin/check", post(check_all))
        .route("/admin/history", get(list_history))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
