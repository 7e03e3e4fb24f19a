//! Career Page Monitor Dashboard
//!
//! Exposes target management, on-demand runs and the result history over an
//! HTTP API guarded by a single username/password pair.

mod auth;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use monitor::config::env_opt;
use monitor::MonitorConfig;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use self::auth::{auth_middleware, Credentials};
use self::handlers::{
    add_target, delete_history_row, delete_target, edit_target, health_handler,
    history_csv_handler, history_handler, list_targets, not_found_handler, overview_handler,
    replace_targets, root_handler, run_handler, sync_targets,
};
use self::state::AppState;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/overview", get(overview_handler))
        .route(
            "/targets",
            get(list_targets)
                .put(replace_targets)
                .post(add_target)
                .patch(edit_target)
                .delete(delete_target),
        )
        .route("/targets/sync", post(sync_targets))
        .route("/runs", post(run_handler))
        .route("/history", get(history_handler))
        .route("/history.csv", get(history_csv_handler))
        .route("/history/{index}", delete(delete_history_row))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let username = env_opt("MONITOR_USERNAME").context("MONITOR_USERNAME must be set")?;
    let password = env_opt("MONITOR_PASSWORD").context("MONITOR_PASSWORD must be set")?;
    let config = MonitorConfig::from_env();
    info!(data_dir = %config.data_dir.display(), "🚀 Starting Career Page Monitor dashboard");

    let state = Arc::new(AppState::new(
        config,
        Credentials::new(&username, &password),
    ));

    let addr = env_opt("DASHBOARD_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🌐 Dashboard running at http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}
