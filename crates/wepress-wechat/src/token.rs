//! Access-token cache with proactive background refresh.
//!
//! A separate loop polls the cached token's expiry on a short interval and
//! refreshes it before it lapses, writing the fresh snapshot back to the data
//! directory so other components (and the next process start) see it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use wepress_core::{Result, WePressConfig};

use crate::client::PublishApi;
use crate::types::AccessTokenInfo;

/// Refresh when fewer than this many seconds of validity remain.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Shared access-token cache.
pub struct TokenCache {
    inner: RwLock<Option<AccessTokenInfo>>,
    snapshot_path: PathBuf,
}

impl TokenCache {
    /// Create a cache persisting snapshots under the given data directory.
    /// A snapshot left by a previous run is loaded if still valid.
    pub fn new(data_dir: &Path) -> Self {
        let snapshot_path = data_dir.join("access_token.json");
        let initial = load_snapshot(&snapshot_path).filter(|t| !t.expires_within(0));
        Self {
            inner: RwLock::new(initial),
            snapshot_path,
        }
    }

    /// Current token, if one is cached (may be close to expiry).
    pub async fn get(&self) -> Option<AccessTokenInfo> {
        self.inner.read().await.clone()
    }

    /// Replace the cached token and persist the snapshot.
    pub async fn set(&self, info: AccessTokenInfo) {
        if let Err(e) = save_snapshot(&self.snapshot_path, &info) {
            tracing::warn!("Failed to persist token snapshot: {e}");
        }
        *self.inner.write().await = Some(info);
    }

    /// A token valid for at least the refresh margin, fetching a fresh one
    /// through the platform when the cache cannot provide it.
    pub async fn current_or_fetch(
        &self,
        api: &dyn PublishApi,
        app_id: &str,
        app_secret: &str,
    ) -> Result<AccessTokenInfo> {
        if let Some(token) = self.get().await
            && !token.expires_within(REFRESH_MARGIN_SECS)
        {
            return Ok(token);
        }
        let fresh = api.get_access_token(app_id, app_secret).await?;
        self.set(fresh.clone()).await;
        Ok(fresh)
    }
}

fn load_snapshot(path: &Path) -> Option<AccessTokenInfo> {
    let json = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&json) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!("Failed to parse token snapshot: {e}");
            None
        }
    }
}

fn save_snapshot(path: &Path, info: &AccessTokenInfo) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(info)?)?;
    Ok(())
}

/// Spawn the credential-refresh loop. Runs for the process lifetime,
/// independent of the scheduler's dispatch loop.
pub fn spawn_token_refresh_loop(
    cache: Arc<TokenCache>,
    api: Arc<dyn PublishApi>,
    config: Arc<Mutex<WePressConfig>>,
    poll_secs: u64,
) {
    tokio::spawn(async move {
        tracing::info!("Token refresh loop started (poll every {poll_secs}s)");
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(poll_secs));

        loop {
            interval.tick().await;

            let (app_id, app_secret) = {
                let cfg = config.lock().unwrap();
                (cfg.wechat.app_id.clone(), cfg.wechat.app_secret.clone())
            };
            if app_id.is_empty() || app_secret.is_empty() {
                continue;
            }

            let needs_refresh = match cache.get().await {
                Some(token) => token.expires_within(REFRESH_MARGIN_SECS),
                None => true,
            };
            if !needs_refresh {
                continue;
            }

            match api.get_access_token(&app_id, &app_secret).await {
                Ok(info) => {
                    tracing::info!(
                        "Access token refreshed, expires at {}",
                        info.expire_time.to_rfc3339()
                    );
                    cache.set(info).await;
                }
                Err(e) => tracing::error!("Token refresh failed: {e}"),
            }
        }
    });
}
