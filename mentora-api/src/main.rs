use std::sync::Arc;
use std::time::Duration;

use mentora_api::config::AppConfig;
use mentora_api::scheduling::{spawn_expiry_sweep, SCHEDULING_COUNTERS};
use mentora_api::{routes, AppState};
use mentora_shared::clients::db::create_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    mentora_shared::middleware::init_tracing("mentora-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = mentora_shared::middleware::init_metrics(SCHEDULING_COUNTERS)?;

    let sweep_interval = Duration::from_secs(config.expiry_sweep_interval_secs);
    let state = Arc::new(AppState::new(config, db, metrics_handle)?);

    let _sweep_handle = spawn_expiry_sweep(state.db.clone(), sweep_interval);

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "mentora-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("mentora-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}
