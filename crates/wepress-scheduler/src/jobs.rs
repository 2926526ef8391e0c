//! Publish job definitions and trigger-time parsing.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use wepress_core::{Result, WePressError};

/// Exactly one future publish invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJob {
    /// Deterministic id derived from the media_id — re-registering the same
    /// draft replaces the pending trigger instead of duplicating it.
    pub job_id: String,
    pub media_id: String,
    pub trigger_time: DateTime<Utc>,
    pub enable_mass_send: bool,
    pub created_at: DateTime<Utc>,
}

impl PublishJob {
    pub fn new(media_id: &str, trigger_time: DateTime<Utc>, enable_mass_send: bool) -> Self {
        Self {
            job_id: Self::job_id_for(media_id),
            media_id: media_id.to_string(),
            trigger_time,
            enable_mass_send,
            created_at: Utc::now(),
        }
    }

    /// The job id for a given draft.
    pub fn job_id_for(media_id: &str) -> String {
        format!("publish_{media_id}")
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.trigger_time <= now
    }
}

/// Parse a caller-supplied trigger time: `YYYY-MM-DD HH:MM:SS` interpreted in
/// local time, or RFC 3339. Unparseable input is an error — never a silent
/// "schedule for now".
pub fn parse_trigger_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| {
                WePressError::InvalidInput(format!("Nonexistent local time: {value}"))
            });
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    Err(WePressError::InvalidInput(format!(
        "Unparseable publish time: '{value}' (expected 'YYYY-MM-DD HH:MM:SS' or RFC 3339)"
    )))
}
