//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the router, providers and health checker from configuration
//! - Start background tasks (health check loops, metrics, admin API)
//! - Tear them down in order on shutdown
//!
//! # Design Decisions
//! - Fail fast: a bind error of the admin API is fatal
//! - The health check starts after the admin API is bound

use std::sync::Arc;
use tokio::net::TcpListener;

use crate::admin::{self, AdminState};
use crate::config::AppConfig;
use crate::health::report::OutboundReport;
use crate::health::{HealthCheck, MemoryHistory};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::outbound::{HttpUrlTester, Router, StaticRouter};

/// Subsystems built from a configuration.
pub struct Components {
    pub router: Arc<StaticRouter>,
    pub checker: Arc<HealthCheck>,
    pub history: MemoryHistory,
}

/// Build the router and a health checker over all of its providers.
pub fn build(config: &AppConfig) -> Components {
    let history = MemoryHistory::new();
    let router =
        Arc::new(StaticRouter::from_config(config).with_history(Arc::new(history.clone())));
    let checker = Arc::new(HealthCheck::new(
        router.clone(),
        router.providers(),
        config.health_check.clone(),
        Arc::new(HttpUrlTester::new()),
    ));
    Components {
        router,
        checker,
        history,
    }
}

/// Run one check round and return the resulting statistics.
pub async fn run_once(config: &AppConfig) -> Vec<OutboundReport> {
    let components = build(config);
    components.checker.check_all().await;
    components.checker.storage().report()
}

/// Run until a termination signal arrives.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let components = build(&config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let admin = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(components.checker.clone(), &config.admin.api_key)
            .with_history(components.history.clone());
        Some(tokio::spawn(admin::serve(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    components.checker.start();
    tracing::info!(
        outbounds = config.outbounds.len(),
        providers = components.router.providers().len(),
        "Startup complete"
    );

    signals::wait_for_signal().await;

    components.checker.close();
    shutdown.trigger();
    if let Some(handle) = admin {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task aborted"),
        }
    }
    Ok(())
}
