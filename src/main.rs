use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use axum::http::Method;
use tokio::signal::ctrl_c;
use tokio::time::interval;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, error, info, Level};
use iqx_terminal_ops::api::build_router;
use iqx_terminal_ops::init::initialize;

/// The main entry point of the IQX Terminal Operations service
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

/// Serves the HTTP API until Ctrl-C, then flushes the audit ledger
///
/// 1. Loads settings and initializes logging
/// 2. Builds the state manager, notification worker and controllers
/// 3. Spawns the notification worker and the rate-limit purge task
/// 4. Serves on `server.bind_address` with graceful shutdown
///
/// # Returns
///
/// * `Ok(())` if the service shut down gracefully
/// * `Err(anyhow::Error)` if initialization or the server failed
async fn run() -> Result<()> {
    let context = initialize().await?;
    let _log_guard = context.log_guard;
    let state_manager = Arc::clone(&context.state_manager);

    tokio::spawn(context.notification_worker.run());

    let purge_state = Arc::clone(&context.app_state);
    let window = Duration::from_secs(context.settings.rate_limit.window_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = interval(window);
        loop {
            ticker.tick().await;
            let purged = purge_state.rate_limiter.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired rate-limit windows");
            }
        }
    });

    let app = build_router(Arc::clone(&context.app_state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&context.settings.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", context.settings.server.bind_address))?;
    info!("iqx-terminal-ops listening on http://{}", context.settings.server.bind_address);

    let signal_state = Arc::clone(&state_manager);
    tokio::spawn(async move {
        match ctrl_c().await {
            Ok(()) => info!("Received shutdown signal. Shutting down gracefully..."),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_state.trigger_shutdown();
    });

    let shutdown_state = Arc::clone(&state_manager);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_state.wait_for_shutdown().await })
        .await
        .context("server crashed")?;

    state_manager.shutdown().await;
    Ok(())
}
