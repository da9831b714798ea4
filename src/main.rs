// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use feedbacklab_auth::{
    api::router,
    config::{Config, LogFormat},
    state::AppState,
};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    info!(
        issuer = %config.provider.issuer(),
        client_id = %config.provider.client_id,
        jwks_timeout_secs = config.provider.jwks_timeout.as_secs(),
        clock_skew_secs = config.provider.clock_skew.as_secs(),
        allow_empty_audience = config.provider.allow_empty_audience,
        "Configuration loaded"
    );

    let state = AppState::from_provider(config.provider.clone())?;

    // Warm the key cache; a failure here is not fatal, keys are fetched on demand.
    if let Err(e) = state.key_store().refresh().await {
        error!(error = %e, "Initial JWKS fetch failed");
    }

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("FeedbackLab auth server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
