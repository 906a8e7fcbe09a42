//! Geofence risk service entrypoint: load config and artifact once, then serve HTTP
//! until Ctrl+C / SIGTERM.

use geofence_risk::{
    config::ServiceConfig,
    http,
    logging::StructuredLogger,
    model::load_risk_model,
    risk::ScoringService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("GEOFENCE_RISK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = ServiceConfig::load(&config_path)?.with_env_overrides()?;

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(config = %config_path.display(), artifact_dir = %config.artifact_dir.display(), "geofence risk service starting");

    let service = match load_risk_model(&config.artifact_dir) {
        Ok(model) => ScoringService::new(model),
        Err(e) if config.require_model => {
            error!(error = %e, "model artifact failed to load; refusing to start");
            return Err(e.into());
        }
        Err(e) => {
            error!(error = %e, "model artifact failed to load; every prediction will fail with ModelUnavailable");
            ScoringService::unavailable(e.to_string())
        }
    };

    let app = http::router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("geofence risk service stopping");
    Ok(())
}
