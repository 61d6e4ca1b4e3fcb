//! WXO Token Broker
//!
//! Single-binary service that brokers Watson Orchestrate access tokens for
//! a browser client so the client never holds the long-lived API key:
//! 1. Serves the client HTML at `/`
//! 2. Exchanges the configured API key for a short-lived token at
//!    `POST /api/auth/wxo-token`, falling back to the key itself when the
//!    exchange fails
//! 3. Exposes a liveness probe and a development-only config-presence probe

mod config;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wxo_auth::{BrokerOutcome, TokenBroker};

use crate::config::{Config, Mode};

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    broker: TokenBroker,
}

/// Build the axum router with all routes and shared state.
///
/// No concurrency limiting or admission control: the broker is stateless
/// and intended for low-volume internal use.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/auth/wxo-token", post(token_handler))
        .route("/api/health", get(health_handler))
        .route("/api/config-check", get(config_check_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting wxo-token-broker");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    let config = match &config_path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::load(Some(path))
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => Config::load(None).context("failed to load configuration from environment")?,
    };

    // Startup banner: presence of the WXO values only, never their contents
    info!(
        listen_addr = %config.server.listen_addr,
        mode = config.server.mode.as_str(),
        wxo_api_key_set = config.has_api_key(),
        wxo_instance_url_set = config.has_instance_url(),
        "configuration loaded"
    );

    let listen_addr = config.server.listen_addr;
    let state = AppState {
        config: Arc::new(config),
        broker: TokenBroker::new(reqwest::Client::new()),
    };
    let app = build_router(state);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Serve the configured index document with the working directory as the
/// document root.
async fn index_handler(State(state): State<AppState>) -> Response {
    let path = &state.config.server.index_file;
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Html(contents).into_response(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "index document not readable");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "index document not found" })),
            )
                .into_response()
        }
    }
}

/// Token endpoint. The request body, if any, is ignored.
async fn token_handler(State(state): State<AppState>) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    acquire_token(&state, request_id).await
}

#[instrument(skip_all, fields(request_id = %request_id))]
async fn acquire_token(state: &AppState, request_id: String) -> Response {
    let outcome = state
        .broker
        .acquire(
            state.config.wxo.api_key.as_ref(),
            state.config.wxo.instance_url.as_deref(),
        )
        .await;
    broker_response(outcome, state.config.server.mode)
}

/// Pure mapping from broker outcome to HTTP status and body. Policy (what
/// counts as fallback-worthy) lives in the broker; nothing is added here.
fn broker_response(outcome: BrokerOutcome, mode: Mode) -> Response {
    match outcome {
        BrokerOutcome::Live(grant) | BrokerOutcome::Fallback(grant) => {
            (StatusCode::OK, Json(grant)).into_response()
        }
        BrokerOutcome::ConfigInvalid(err) => {
            error!(kind = err.kind(), "returning configuration error");
            let body = json!({
                "error": "Configuration Error",
                "message": err.to_string(),
                "hint": err.hint(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        BrokerOutcome::Internal { message, detail } => {
            error!(detail = %detail, "token endpoint failed outside the exchange path");
            let mut body = json!({
                "error": "Internal Server Error",
                "message": message,
            });
            if mode.is_development() {
                body["details"] = json!(detail);
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Liveness probe: always 200 with an RFC 3339 timestamp.
async fn health_handler() -> impl IntoResponse {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "timestamp": timestamp,
    }))
}

/// Config-presence probe, development mode only. Reports whether the WXO
/// values are set and the key's length — never the key itself.
async fn config_check_handler(State(state): State<AppState>) -> Response {
    if !state.config.server.mode.is_development() {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Not available in production" })),
        )
            .into_response();
    }

    Json(json!({
        "hasApiKey": state.config.has_api_key(),
        "hasInstanceUrl": state.config.has_instance_url(),
        "apiKeyLength": state.config.api_key_len(),
        "instanceUrl": if state.config.has_instance_url() { "✓ Set" } else { "✗ Not set" },
    }))
    .into_response()
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
