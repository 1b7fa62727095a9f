use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use monitoring_cell::MonitoringHandlers;
use monitoring_cell::services::scheduler::spawn_monitoring_loop;
use shared_config::AppConfig;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Medication Reminder monitoring API");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Supabase is not fully configured, database checks will report critical");
    }

    let handlers = Arc::new(
        MonitoringHandlers::new(config.clone())
            .await
            .context("failed to initialise monitoring")?,
    );

    // Optional background monitoring
    let shutdown = CancellationToken::new();
    let scheduler = config.monitoring_interval_secs.map(|secs| {
        spawn_monitoring_loop(handlers.service(), Duration::from_secs(secs), shutdown.clone())
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(handlers)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let port = std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }

    Ok(())
}
