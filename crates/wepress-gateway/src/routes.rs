//! API route handlers for the gateway.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use wepress_history::NewArticle;
use wepress_scheduler::{PublishJob, parse_trigger_time};
use wepress_wechat::DraftArticle;

use super::server::AppState;

/// Mask a secret string for display — show first 4 chars + ••••
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if s.chars().count() <= 4 {
        return "••••".to_string();
    }
    format!("{}••••", s.chars().take(4).collect::<String>())
}

fn ok(value: serde_json::Value) -> Response {
    Json(value).into_response()
}

fn bad_request(msg: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "msg": msg.into() })),
    )
        .into_response()
}

fn upstream_error(msg: impl Into<String>) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({ "success": false, "msg": msg.into() })),
    )
        .into_response()
}

/// Official Account credentials, or a ready-made 400 when absent.
fn credentials(state: &AppState) -> Result<(String, String), Response> {
    let cfg = state.config.lock().unwrap();
    if !cfg.wechat_configured() {
        return Err(bad_request("WeChat app_id/app_secret not configured"));
    }
    Ok((cfg.wechat.app_id.clone(), cfg.wechat.app_secret.clone()))
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "wepress-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed();
    let pending_jobs = state.scheduler.lock().await.job_count();
    let token = state.token_cache.get().await;
    let cfg = state.config.lock().unwrap();
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "platform": format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        "uptime_secs": uptime.as_secs(),
        "wechat_configured": cfg.wechat_configured(),
        "pending_jobs": pending_jobs,
        "token": token.map(|t| serde_json::json!({
            "app_id": t.app_id,
            "expires_at": t.expire_time.to_rfc3339(),
            "remaining_secs": t.remaining_secs(),
        })),
        "gateway": {
            "host": cfg.gateway.host,
            "port": cfg.gateway.port,
        }
    }))
}

/// Get current configuration (sanitized — no secrets).
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let cfg = state.config.lock().unwrap();
    Json(serde_json::json!({
        "wechat": {
            "app_id": cfg.wechat.app_id,
            "app_secret": mask_secret(&cfg.wechat.app_secret),
            "app_secret_set": !cfg.wechat.app_secret.is_empty(),
            "base_url": cfg.wechat.base_url,
            "author": cfg.wechat.author,
            "content_source_url": cfg.wechat.content_source_url,
        },
        "gateway": {
            "host": cfg.gateway.host,
            "port": cfg.gateway.port,
        },
        "scheduler": {
            "tick_secs": cfg.scheduler.tick_secs,
            "token_refresh_secs": cfg.scheduler.token_refresh_secs,
            "data_dir": cfg.scheduler.data_dir().display().to_string(),
        },
    }))
}

/// Update config fields via JSON body and persist the result.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<serde_json::Value>,
) -> Response {
    let saved = {
        let mut cfg = state.config.lock().unwrap();

        if let Some(wechat) = req.get("wechat") {
            if let Some(v) = wechat.get("app_id").and_then(|v| v.as_str()) {
                cfg.wechat.app_id = v.to_string();
            }
            if let Some(v) = wechat.get("app_secret").and_then(|v| v.as_str()) {
                cfg.wechat.app_secret = v.to_string();
            }
            if let Some(v) = wechat.get("author").and_then(|v| v.as_str()) {
                cfg.wechat.author = v.to_string();
            }
            if let Some(v) = wechat.get("content_source_url").and_then(|v| v.as_str()) {
                cfg.wechat.content_source_url = v.to_string();
            }
        }
        if let Some(scheduler) = req.get("scheduler")
            && let Some(v) = scheduler.get("tick_secs").and_then(|v| v.as_u64())
        {
            cfg.scheduler.tick_secs = v;
        }

        cfg.save_to(&state.config_path)
    };

    match saved {
        Ok(()) => ok(serde_json::json!({ "success": true })),
        Err(e) => upstream_error(format!("Failed to persist config: {e}")),
    }
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub content_source_url: Option<String>,
    #[serde(default)]
    pub thumb_media_id: Option<String>,
}

/// Create a draft on the platform and record it in generation history.
pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DraftRequest>,
) -> Response {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return bad_request("title and content are required");
    }
    let (app_id, app_secret) = match credentials(&state) {
        Ok(creds) => creds,
        Err(resp) => return resp,
    };

    let (author, content_source_url) = {
        let cfg = state.config.lock().unwrap();
        (
            req.author.clone().unwrap_or_else(|| cfg.wechat.author.clone()),
            req.content_source_url
                .clone()
                .unwrap_or_else(|| cfg.wechat.content_source_url.clone()),
        )
    };

    let record_id = match state.history.add_generation_history(&NewArticle {
        title: req.title.clone(),
        author: author.clone(),
        digest: req.digest.clone(),
        content_source_url: content_source_url.clone(),
        content_length: req.content.chars().count(),
        image_count: req.content.matches("<img").count(),
    }) {
        Ok(id) => id,
        Err(e) => return upstream_error(format!("Failed to record history: {e}")),
    };

    let token = match state
        .token_cache
        .current_or_fetch(state.wechat.as_ref(), &app_id, &app_secret)
        .await
    {
        Ok(token) => token,
        Err(e) => return upstream_error(format!("Token fetch failed: {e}")),
    };

    let article = DraftArticle {
        title: req.title.clone(),
        content: req.content,
        author,
        digest: req.digest,
        content_source_url,
        thumb_media_id: req.thumb_media_id,
    };
    let media_id = match state.wechat.add_draft(&token.access_token, &[article]).await {
        Ok(media_id) => media_id,
        Err(e) => return upstream_error(format!("Draft creation failed: {e}")),
    };

    if let Err(e) = state.history.update_draft_status(&req.title, &media_id, None) {
        tracing::warn!("Draft saved but history update failed: {e}");
    }

    ok(serde_json::json!({
        "success": true,
        "media_id": media_id,
        "record_id": record_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub media_id: String,
    #[serde(default)]
    pub enable_mass_send: bool,
}

/// Publish a draft immediately — same two-phase action the scheduler fires.
pub async fn publish_now(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> Response {
    if req.media_id.trim().is_empty() {
        return bad_request("media_id is required");
    }

    let job = PublishJob::new(&req.media_id, Utc::now(), req.enable_mass_send);
    match state.action.run(&job).await {
        Ok(()) => ok(serde_json::json!({ "success": true, "media_id": req.media_id })),
        Err(e) => upstream_error(format!("Publish failed: {e}")),
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub media_id: String,
    pub publish_time: String,
    #[serde(default)]
    pub enable_mass_send: bool,
}

/// Register a scheduled publish. The schedule (time and mass-send flag) is
/// recorded on the history entry first, so a restart before the trigger can
/// recover the full intent.
pub async fn schedule_publish(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScheduleRequest>,
) -> Response {
    if req.media_id.trim().is_empty() {
        return bad_request("media_id is required");
    }
    let trigger_time = match parse_trigger_time(&req.publish_time) {
        Ok(t) => t,
        Err(e) => return bad_request(e.to_string()),
    };

    match state
        .history
        .update_schedule(&req.media_id, trigger_time, req.enable_mass_send)
    {
        Ok(true) => {}
        Ok(false) => tracing::warn!(
            "Schedule registered without a matching history record (media_id {})",
            req.media_id
        ),
        Err(e) => return upstream_error(format!("Failed to record schedule: {e}")),
    }

    let result = state
        .scheduler
        .lock()
        .await
        .schedule(&req.media_id, trigger_time, req.enable_mass_send);
    match result {
        Ok(job_id) => ok(serde_json::json!({
            "success": true,
            "job_id": job_id,
            "publish_time": trigger_time.to_rfc3339(),
        })),
        Err(e) => upstream_error(format!("Failed to register job: {e}")),
    }
}

/// Cancel a scheduled publish. Cancelling an unknown or already-fired job is
/// a success — there is nothing left to cancel.
pub async fn cancel_schedule(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Json<serde_json::Value> {
    state.scheduler.lock().await.cancel(&job_id);
    Json(serde_json::json!({ "success": true, "job_id": job_id }))
}

/// Pending scheduled-publish jobs, soonest first.
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let scheduler = state.scheduler.lock().await;
    Json(serde_json::json!({
        "success": true,
        "jobs": scheduler.jobs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct MassSendRequest {
    pub publish_id: String,
}

/// Broadcast already-published content to all subscribers.
pub async fn mass_send_now(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MassSendRequest>,
) -> Response {
    if req.publish_id.trim().is_empty() {
        return bad_request("publish_id is required");
    }

    if state.action.mass_send(&req.publish_id).await {
        ok(serde_json::json!({ "success": true, "publish_id": req.publish_id }))
    } else {
        upstream_error("Mass-send failed")
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Recent generation history, newest first.
pub async fn generation_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<serde_json::Value> {
    let history = state
        .history
        .get_generation_history(query.limit.unwrap_or(10));
    Json(serde_json::json!({
        "success": true,
        "count": history.len(),
        "history": history,
    }))
}

/// Recent publish history, newest first.
pub async fn publish_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<serde_json::Value> {
    let history = state.history.get_publish_history(query.limit.unwrap_or(10));
    Json(serde_json::json!({
        "success": true,
        "count": history.len(),
        "history": history,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use wepress_core::WePressConfig;
    use wepress_history::HistoryStore;
    use wepress_scheduler::{PublishAction, PublishScheduler};
    use wepress_wechat::{TokenCache, WeChatClient};

    fn test_state(name: &str) -> (AppState, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("wepress-gateway-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).ok();

        let config = WePressConfig::default();
        let wechat = Arc::new(WeChatClient::new(&config.wechat).unwrap());
        let history = Arc::new(HistoryStore::new(&dir));
        let shared_config = Arc::new(Mutex::new(config));
        let action = Arc::new(PublishAction::new(
            wechat.clone(),
            history.clone(),
            shared_config.clone(),
        ));

        let state = AppState {
            config: shared_config,
            config_path: dir.join("config.toml"),
            history,
            scheduler: Arc::new(tokio::sync::Mutex::new(
                PublishScheduler::open_in_memory().unwrap(),
            )),
            action,
            wechat,
            token_cache: Arc::new(TokenCache::new(&dir)),
            start_time: std::time::Instant::now(),
        };
        (state, dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_mask_secret_handles_multibyte() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "••••");
        assert_eq!(mask_secret("abcdef"), "abcd••••");
        assert_eq!(mask_secret("密码"), "••••");
        assert_eq!(mask_secret("密钥秘密值"), "密钥秘密••••");
    }

    #[tokio::test]
    async fn test_config_view_masks_non_ascii_secret() {
        let (state, dir) = test_state("mask");
        state.config.lock().unwrap().wechat.app_secret = "密钥秘密值".into();
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/api/v1/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["wechat"]["app_secret"], "密钥秘密••••");
        assert_eq!(body["wechat"]["app_secret_set"], true);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, dir) = test_state("health");
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_schedule_rejects_garbage_time() {
        let (state, dir) = test_state("badtime");
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/api/v1/publish/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"media_id":"M1","publish_time":"whenever"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_schedule_then_list_and_cancel() {
        let (state, dir) = test_state("roundtrip");
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/publish/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"media_id":"M1","publish_time":"2099-01-01T00:00:00Z","enable_mass_send":true}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["job_id"], "publish_M1");

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/v1/publish/jobs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["jobs"].as_array().unwrap().len(), 1);
        assert_eq!(body["jobs"][0]["enable_mass_send"], true);

        let response = app
            .oneshot(
                Request::delete("/api/v1/publish/schedule/publish_M1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_publish_requires_media_id() {
        let (state, dir) = test_state("nomedia");
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/api/v1/publish")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"media_id":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_history_endpoints_empty() {
        let (state, dir) = test_state("history");
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::get("/api/v1/history/generation?limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 0);
        std::fs::remove_dir_all(&dir).ok();
    }
}
