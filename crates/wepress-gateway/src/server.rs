//! HTTP server implementation using Axum.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wepress_core::WePressConfig;
use wepress_history::HistoryStore;
use wepress_scheduler::{PublishAction, PublishScheduler};
use wepress_wechat::{TokenCache, WeChatClient};

/// Shared state for the gateway server. Every service is injected by the
/// caller; the gateway owns nothing it could not be handed a test double for.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Mutex<WePressConfig>>,
    pub config_path: PathBuf,
    pub history: Arc<HistoryStore>,
    pub scheduler: Arc<tokio::sync::Mutex<PublishScheduler>>,
    pub action: Arc<PublishAction>,
    pub wechat: Arc<WeChatClient>,
    pub token_cache: Arc<TokenCache>,
    pub start_time: std::time::Instant,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/api/v1/info", get(super::routes::system_info))
        .route("/api/v1/config", get(super::routes::get_config))
        .route("/api/v1/config/update", post(super::routes::update_config))
        .route("/api/v1/drafts", post(super::routes::create_draft))
        .route("/api/v1/publish", post(super::routes::publish_now))
        .route(
            "/api/v1/publish/schedule",
            post(super::routes::schedule_publish),
        )
        .route(
            "/api/v1/publish/schedule/{job_id}",
            delete(super::routes::cancel_schedule),
        )
        .route("/api/v1/publish/jobs", get(super::routes::list_jobs))
        .route(
            "/api/v1/publish/mass-send",
            post(super::routes::mass_send_now),
        )
        .route(
            "/api/v1/history/generation",
            get(super::routes::generation_history),
        )
        .route(
            "/api/v1/history/publish",
            get(super::routes::publish_history),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server. Runs until the process exits.
pub async fn start(state: AppState) -> anyhow::Result<()> {
    let addr = {
        let cfg = state.config.lock().unwrap();
        format!("{}:{}", cfg.gateway.host, cfg.gateway.port)
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Gateway server listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
