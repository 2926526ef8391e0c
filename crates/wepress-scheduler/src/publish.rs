//! The job body: two-phase publish (draft → live, then optional mass-send).

use std::sync::{Arc, Mutex};

use wepress_core::{Result, WePressConfig, WePressError};
use wepress_history::HistoryStore;
use wepress_wechat::PublishApi;

use crate::jobs::PublishJob;

/// Executes fired publish jobs against the platform and records the outcome
/// in the history store. Dependencies are injected so the whole action can be
/// exercised against a mock platform.
pub struct PublishAction {
    api: Arc<dyn PublishApi>,
    history: Arc<HistoryStore>,
    config: Arc<Mutex<WePressConfig>>,
}

impl PublishAction {
    pub fn new(
        api: Arc<dyn PublishApi>,
        history: Arc<HistoryStore>,
        config: Arc<Mutex<WePressConfig>>,
    ) -> Self {
        Self {
            api,
            history,
            config,
        }
    }

    fn credentials(&self) -> Result<(String, String)> {
        let cfg = self.config.lock().unwrap();
        if !cfg.wechat_configured() {
            return Err(WePressError::Config(
                "WeChat app_id/app_secret not configured".into(),
            ));
        }
        Ok((cfg.wechat.app_id.clone(), cfg.wechat.app_secret.clone()))
    }

    /// Run one fired job. A remote failure is terminal for the job: the
    /// record stays `saved`, nothing is retried, the error surfaces only in
    /// logs and the stale history status.
    pub async fn run(&self, job: &PublishJob) -> Result<()> {
        let (app_id, app_secret) = self.credentials()?;
        let token = self.api.get_access_token(&app_id, &app_secret).await?;

        let result = self
            .api
            .publish_draft(&token.access_token, &job.media_id)
            .await?;

        if !result.is_success() {
            return Err(WePressError::WeChat(format!(
                "publish failed for media_id {}, errcode: {}, errmsg: {}",
                job.media_id, result.errcode, result.errmsg
            )));
        }

        let updated = self.history.update_publish_status(
            &job.media_id,
            result.publish_id.as_deref(),
            result.msg_data_id,
        )?;
        if !updated {
            tracing::warn!(
                "Publish succeeded but no saved history record for media_id {}",
                job.media_id
            );
        }
        tracing::info!("Scheduled publish succeeded, media_id: {}", job.media_id);

        if job.enable_mass_send {
            match result.publish_id.as_deref() {
                Some(publish_id) => {
                    if self.mass_send(publish_id).await {
                        tracing::info!("Scheduled mass-send succeeded, publish_id: {publish_id}");
                    } else {
                        tracing::error!("Scheduled mass-send failed, publish_id: {publish_id}");
                    }
                }
                // Never broadcast with a missing target.
                None => tracing::error!(
                    "Mass-send skipped for media_id {}: publish succeeded without a publish_id",
                    job.media_id
                ),
            }
        }
        Ok(())
    }

    /// Broadcast already-published content to all subscribers. Not
    /// idempotent — callers invoke it at most once per firing. Returns false
    /// on any failure; history is only touched on success.
    pub async fn mass_send(&self, publish_id: &str) -> bool {
        let (app_id, app_secret) = match self.credentials() {
            Ok(creds) => creds,
            Err(e) => {
                tracing::error!("Mass-send aborted: {e}");
                return false;
            }
        };

        let token = match self.api.get_access_token(&app_id, &app_secret).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Mass-send aborted, token fetch failed: {e}");
                return false;
            }
        };

        match self.api.mass_send(&token.access_token, publish_id).await {
            Ok(result) if result.is_success() => {
                match self.history.update_mass_send_status(publish_id, result.msg_id) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!("No history record for publish_id {publish_id}")
                    }
                    Err(e) => tracing::error!("Failed to record mass-send: {e}"),
                }
                true
            }
            Ok(result) => {
                tracing::error!(
                    "Mass-send rejected, errcode: {}, errmsg: {}",
                    result.errcode,
                    result.errmsg
                );
                false
            }
            Err(e) => {
                tracing::error!("Mass-send request failed: {e}");
                false
            }
        }
    }
}
