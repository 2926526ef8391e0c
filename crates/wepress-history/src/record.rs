//! History record definitions — the article lifecycle data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a generated article. Transitions are forward-only:
/// `generated` → `saved` → `published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Generated,
    Saved,
    Published,
}

/// One row per article produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Opaque unique id, assigned at creation and stable for the record's life.
    pub id: String,
    /// Article title — secondary lookup key for draft matching.
    pub title: String,
    pub status: RecordStatus,

    /// Draft id assigned by the platform once the content is accepted.
    #[serde(default)]
    pub media_id: Option<String>,
    /// Assigned once publishing succeeds.
    #[serde(default)]
    pub publish_id: Option<String>,
    #[serde(default)]
    pub msg_data_id: Option<i64>,

    /// Target instant for a scheduled publish; absent means no schedule.
    #[serde(default)]
    pub publish_time: Option<DateTime<Utc>>,
    /// Captured at schedule-registration time and persisted, so recovery can
    /// restore the mass-send intent after a restart.
    #[serde(default)]
    pub enable_mass_send: bool,

    #[serde(default)]
    pub mass_sent: bool,
    #[serde(default)]
    pub mass_msg_id: Option<i64>,
    #[serde(default)]
    pub mass_sent_at: Option<DateTime<Utc>>,

    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    // Article metadata carried from generation.
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub content_source_url: String,
    #[serde(default)]
    pub content_length: usize,
    #[serde(default)]
    pub image_count: usize,
}

/// Input for a new generation history entry.
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub title: String,
    pub author: String,
    pub digest: String,
    pub content_source_url: String,
    pub content_length: usize,
    pub image_count: usize,
}

impl GenerationRecord {
    /// Create a fresh record in `generated` state.
    pub fn new(article: &NewArticle) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: article.title.clone(),
            status: RecordStatus::Generated,
            media_id: None,
            publish_id: None,
            msg_data_id: None,
            publish_time: None,
            enable_mass_send: false,
            mass_sent: false,
            mass_msg_id: None,
            mass_sent_at: None,
            generated_at: Utc::now(),
            saved_at: None,
            published_at: None,
            author: article.author.clone(),
            digest: article.digest.clone(),
            content_source_url: article.content_source_url.clone(),
            content_length: article.content_length,
            image_count: article.image_count,
        }
    }
}

/// Denormalised entry in the secondary publish-history list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRecord {
    pub id: String,
    pub title: String,
    pub media_id: String,
    pub publish_id: Option<String>,
    pub msg_data_id: Option<i64>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content_length: usize,
    #[serde(default)]
    pub image_count: usize,
}
