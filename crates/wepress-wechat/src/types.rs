//! WeChat platform API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Access token with its expiry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenInfo {
    pub access_token: String,
    /// Validity in seconds as reported by the platform (typically 7200).
    pub expires_in: i64,
    /// Absolute expiry instant, computed at fetch time.
    pub expire_time: DateTime<Utc>,
    pub app_id: String,
    pub fetched_at: DateTime<Utc>,
}

impl AccessTokenInfo {
    /// Seconds of validity remaining (negative when expired).
    pub fn remaining_secs(&self) -> i64 {
        (self.expire_time - Utc::now()).num_seconds()
    }

    /// True when the token expires within the given number of seconds.
    pub fn expires_within(&self, secs: i64) -> bool {
        self.remaining_secs() <= secs
    }
}

/// Raw token endpoint response — either a token or an errcode/errmsg pair.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// One article in a draft payload (`/cgi-bin/draft/add`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub content_source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_media_id: Option<String>,
}

/// Draft creation response.
#[derive(Debug, Deserialize)]
pub struct DraftResult {
    pub media_id: Option<String>,
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// Free-publish submission response (`/cgi-bin/freepublish/submit`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    #[serde(default = "default_errcode")]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    /// The platform returns this as a number; we keep it opaque.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub publish_id: Option<String>,
    #[serde(default)]
    pub msg_data_id: Option<i64>,
}

fn default_errcode() -> i64 {
    -1
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

/// Mass broadcast response (`/cgi-bin/message/mass/send`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassSendResult {
    #[serde(default = "default_errcode")]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub msg_id: Option<i64>,
    #[serde(default)]
    pub msg_data_id: Option<i64>,
}

impl MassSendResult {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

/// The platform is inconsistent about id types across endpoints; accept both
/// JSON strings and numbers and normalize to `String`.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
