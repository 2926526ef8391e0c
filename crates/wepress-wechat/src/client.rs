//! WeChat Official Account HTTP client.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use wepress_core::config::WeChatConfig;
use wepress_core::{Result, WePressError};

use crate::types::{
    AccessTokenInfo, DraftArticle, DraftResult, MassSendResult, PublishResult, TokenResponse,
};

/// Outbound call timeout. All platform calls are bounded; a timeout is a
/// normal failure, logged and not retried.
const API_TIMEOUT_SECS: u64 = 60;

/// The platform operations the scheduler core depends on. Production uses
/// [`WeChatClient`]; tests substitute a mock.
#[async_trait]
pub trait PublishApi: Send + Sync {
    /// Fetch a fresh access token for the account.
    async fn get_access_token(&self, app_id: &str, app_secret: &str) -> Result<AccessTokenInfo>;

    /// Submit a previously-saved draft for publication.
    async fn publish_draft(&self, access_token: &str, media_id: &str) -> Result<PublishResult>;

    /// Broadcast already-published content to all subscribers.
    async fn mass_send(&self, access_token: &str, publish_id: &str) -> Result<MassSendResult>;
}

/// HTTP client for the Official Account API.
pub struct WeChatClient {
    base_url: String,
    http: reqwest::Client,
}

impl WeChatClient {
    pub fn new(config: &WeChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .map_err(|e| WePressError::WeChat(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Create a draft from the given articles. Returns the assigned media_id.
    pub async fn add_draft(
        &self,
        access_token: &str,
        articles: &[DraftArticle],
    ) -> Result<String> {
        let body = serde_json::json!({ "articles": articles });

        let response = self
            .http
            .post(self.api_url("/cgi-bin/draft/add"))
            .query(&[("access_token", access_token)])
            .json(&body)
            .send()
            .await
            .map_err(|e| WePressError::WeChat(format!("draft/add request failed: {e}")))?;

        let result: DraftResult = response
            .json()
            .await
            .map_err(|e| WePressError::WeChat(format!("Invalid draft/add response: {e}")))?;

        match result.media_id {
            Some(media_id) => {
                tracing::info!("Draft created, media_id: {media_id}");
                Ok(media_id)
            }
            None => Err(WePressError::WeChat(format!(
                "draft/add failed, errcode: {}, errmsg: {}",
                result.errcode, result.errmsg
            ))),
        }
    }
}

#[async_trait]
impl PublishApi for WeChatClient {
    async fn get_access_token(&self, app_id: &str, app_secret: &str) -> Result<AccessTokenInfo> {
        let response = self
            .http
            .get(self.api_url("/cgi-bin/token"))
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", app_id),
                ("secret", app_secret),
            ])
            .send()
            .await
            .map_err(|e| WePressError::WeChat(format!("Token request failed: {e}")))?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| WePressError::WeChat(format!("Invalid token response: {e}")))?;

        match (body.access_token, body.expires_in) {
            (Some(access_token), Some(expires_in)) => {
                let now = Utc::now();
                tracing::info!("Access token fetched, valid for {expires_in}s");
                Ok(AccessTokenInfo {
                    access_token,
                    expires_in,
                    expire_time: now + Duration::seconds(expires_in),
                    app_id: app_id.to_string(),
                    fetched_at: now,
                })
            }
            _ => Err(WePressError::WeChat(format!(
                "Token fetch failed, errcode: {}, errmsg: {}",
                body.errcode, body.errmsg
            ))),
        }
    }

    async fn publish_draft(&self, access_token: &str, media_id: &str) -> Result<PublishResult> {
        let payload = serde_json::json!({ "media_id": media_id });

        let response = self
            .http
            .post(self.api_url("/cgi-bin/freepublish/submit"))
            .query(&[("access_token", access_token)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| WePressError::WeChat(format!("freepublish request failed: {e}")))?;

        let result: PublishResult = response
            .json()
            .await
            .map_err(|e| WePressError::WeChat(format!("Invalid freepublish response: {e}")))?;

        if result.is_success() {
            tracing::info!(
                "Draft published, publish_id: {}",
                result.publish_id.as_deref().unwrap_or("?")
            );
        } else {
            tracing::error!(
                "Publish failed for media_id {media_id}, errcode: {}, errmsg: {}",
                result.errcode,
                result.errmsg
            );
        }
        // Non-zero errcode is returned to the caller, not raised here; the
        // caller decides whether the firing is terminal.
        Ok(result)
    }

    async fn mass_send(&self, access_token: &str, publish_id: &str) -> Result<MassSendResult> {
        // Empty touser means "all subscribers" — platform convention.
        let payload = serde_json::json!({
            "touser": [],
            "mpnews": { "media_id": publish_id },
            "msgtype": "mpnews",
        });

        let response = self
            .http
            .post(self.api_url("/cgi-bin/message/mass/send"))
            .query(&[("access_token", access_token)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| WePressError::WeChat(format!("mass/send request failed: {e}")))?;

        let result: MassSendResult = response
            .json()
            .await
            .map_err(|e| WePressError::WeChat(format!("Invalid mass/send response: {e}")))?;

        if result.is_success() {
            tracing::info!("Mass-send accepted, msg_id: {:?}", result.msg_id);
        } else {
            tracing::error!(
                "Mass-send failed for publish_id {publish_id}, errcode: {}, errmsg: {}",
                result.errcode,
                result.errmsg
            );
        }
        Ok(result)
    }
}
