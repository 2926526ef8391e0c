//! File-based history store — JSON arrays with whole-file read-modify-write.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use wepress_core::{Result, WePressError};

use crate::record::{GenerationRecord, NewArticle, PublishRecord, RecordStatus};

/// Most recent generation records retained.
const HISTORY_CAP: usize = 100;
/// Most recent publish-history entries retained.
const PUBLISH_HISTORY_CAP: usize = 50;

/// Durable history store.
///
/// All mutations take the internal mutex for the full read-modify-write cycle.
/// Concurrent writers (dispatch loop, token-refresh loop, HTTP handlers) are
/// serialized here rather than racing on the underlying files.
pub struct HistoryStore {
    history_path: PathBuf,
    publish_path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryStore {
    /// Create a store rooted at the given data directory.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            history_path: dir.join("history.json"),
            publish_path: dir.join("publish_history.json"),
            lock: Mutex::new(()),
        }
    }

    /// Append a new generation record at the head of the list.
    /// Returns the assigned record id.
    pub fn add_generation_history(&self, article: &NewArticle) -> Result<String> {
        let _guard = self.lock.lock().unwrap();
        let mut history = self.load_history();

        let record = GenerationRecord::new(article);
        let id = record.id.clone();
        tracing::info!("History record added: '{}' ({})", record.title, id);

        history.insert(0, record);
        history.truncate(HISTORY_CAP);
        self.save_history(&history)?;
        Ok(id)
    }

    /// Transition the first matching non-published record from `generated` to
    /// `saved`, stamping `media_id` and `saved_at`. The record is matched by
    /// title or by an already-assigned media_id. Returns false when nothing
    /// matches — a logic error on the caller's side, not a crash.
    pub fn update_draft_status(
        &self,
        title_or_media_id: &str,
        media_id: &str,
        publish_time: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut history = self.load_history();

        let found = history.iter_mut().find(|r| {
            r.status != RecordStatus::Published
                && (r.title == title_or_media_id
                    || r.media_id.as_deref() == Some(title_or_media_id))
        });

        match found {
            Some(record) => {
                if record.status == RecordStatus::Generated {
                    record.status = RecordStatus::Saved;
                    record.saved_at = Some(Utc::now());
                }
                record.media_id = Some(media_id.to_string());
                if publish_time.is_some() {
                    record.publish_time = publish_time;
                }
                tracing::info!(
                    "Draft saved: '{}' -> media_id {}",
                    record.title,
                    media_id
                );
                self.save_history(&history)?;
                Ok(true)
            }
            None => {
                tracing::warn!("No matching record for draft '{title_or_media_id}'");
                Ok(false)
            }
        }
    }

    /// Record a schedule registration on the saved record: target time and the
    /// mass-send flag. Persisting the flag here is what lets recovery restore
    /// the full intent after a restart.
    pub fn update_schedule(
        &self,
        media_id: &str,
        publish_time: DateTime<Utc>,
        enable_mass_send: bool,
    ) -> Result<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut history = self.load_history();

        let found = history.iter_mut().find(|r| {
            r.media_id.as_deref() == Some(media_id) && r.status != RecordStatus::Published
        });

        match found {
            Some(record) => {
                record.publish_time = Some(publish_time);
                record.enable_mass_send = enable_mass_send;
                self.save_history(&history)?;
                Ok(true)
            }
            None => {
                tracing::warn!("No saved record for media_id {media_id}");
                Ok(false)
            }
        }
    }

    /// Transition `saved` → `published`, stamping the publish identifiers, and
    /// append a denormalised entry to the publish-history list.
    pub fn update_publish_status(
        &self,
        media_id: &str,
        publish_id: Option<&str>,
        msg_data_id: Option<i64>,
    ) -> Result<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut history = self.load_history();
        let mut publish_history = self.load_publish_history();

        let found = history
            .iter_mut()
            .find(|r| r.media_id.as_deref() == Some(media_id) && r.status == RecordStatus::Saved);

        match found {
            Some(record) => {
                let now = Utc::now();
                record.status = RecordStatus::Published;
                record.publish_id = publish_id.map(str::to_string);
                record.msg_data_id = msg_data_id;
                record.published_at = Some(now);

                publish_history.insert(
                    0,
                    PublishRecord {
                        id: uuid::Uuid::new_v4().to_string(),
                        title: record.title.clone(),
                        media_id: media_id.to_string(),
                        publish_id: record.publish_id.clone(),
                        msg_data_id,
                        published_at: now,
                        author: record.author.clone(),
                        content_length: record.content_length,
                        image_count: record.image_count,
                    },
                );
                publish_history.truncate(PUBLISH_HISTORY_CAP);

                tracing::info!(
                    "Published: media_id {} -> publish_id {:?}",
                    media_id,
                    publish_id
                );
                self.save_history(&history)?;
                self.save_publish_history(&publish_history)?;
                Ok(true)
            }
            None => {
                tracing::warn!("No saved record for media_id {media_id}");
                Ok(false)
            }
        }
    }

    /// Mark the record matched by `publish_id` as mass-sent. In-place update,
    /// no new publish-history entry.
    pub fn update_mass_send_status(&self, publish_id: &str, msg_id: Option<i64>) -> Result<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut history = self.load_history();

        let found = history
            .iter_mut()
            .find(|r| r.publish_id.as_deref() == Some(publish_id));

        match found {
            Some(record) => {
                record.mass_sent = true;
                record.mass_msg_id = msg_id;
                record.mass_sent_at = Some(Utc::now());
                tracing::info!("Mass-send recorded for publish_id {publish_id}");
                self.save_history(&history)?;
                Ok(true)
            }
            None => {
                tracing::warn!("No record for publish_id {publish_id}");
                Ok(false)
            }
        }
    }

    /// Most recent generation records, newest first.
    pub fn get_generation_history(&self, limit: usize) -> Vec<GenerationRecord> {
        let _guard = self.lock.lock().unwrap();
        let mut history = self.load_history();
        history.truncate(limit);
        history
    }

    /// Most recent publish-history entries, newest first.
    pub fn get_publish_history(&self, limit: usize) -> Vec<PublishRecord> {
        let _guard = self.lock.lock().unwrap();
        let mut publish_history = self.load_publish_history();
        publish_history.truncate(limit);
        publish_history
    }

    fn load_history(&self) -> Vec<GenerationRecord> {
        load_json_list(&self.history_path)
    }

    fn save_history(&self, history: &[GenerationRecord]) -> Result<()> {
        save_json_list(&self.history_path, history)
    }

    fn load_publish_history(&self) -> Vec<PublishRecord> {
        load_json_list(&self.publish_path)
    }

    fn save_publish_history(&self, publish_history: &[PublishRecord]) -> Result<()> {
        save_json_list(&self.publish_path, publish_history)
    }
}

/// Read a JSON array file. Missing or corrupt files are logged and treated as
/// empty so one bad file never takes the process down.
fn load_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {e}", path.display());
            Vec::new()
        }),
        Err(e) => {
            tracing::warn!("Failed to read {}: {e}", path.display());
            Vec::new()
        }
    }
}

fn save_json_list<T: serde::Serialize>(path: &Path, list: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(list)?;
    std::fs::write(path, json).map_err(|e| {
        WePressError::History(format!("Failed to write {}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scratch_store(name: &str) -> (HistoryStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("wepress-history-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        (HistoryStore::new(&dir), dir)
    }

    fn article(title: &str) -> NewArticle {
        NewArticle {
            title: title.into(),
            author: "AI Notes".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_list() {
        let (store, dir) = scratch_store("add");
        store.add_generation_history(&article("First")).unwrap();
        store.add_generation_history(&article("Second")).unwrap();

        let history = store.get_generation_history(10);
        assert_eq!(history.len(), 2);
        // Newest first
        assert_eq!(history[0].title, "Second");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_history_capped() {
        let (store, dir) = scratch_store("cap");
        for i in 0..HISTORY_CAP + 5 {
            store.add_generation_history(&article(&format!("A{i}"))).unwrap();
        }
        assert_eq!(store.get_generation_history(1000).len(), HISTORY_CAP);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_draft_then_publish_transitions() {
        let (store, dir) = scratch_store("transitions");
        store.add_generation_history(&article("Post")).unwrap();

        assert!(store.update_draft_status("Post", "M1", None).unwrap());
        let record = &store.get_generation_history(1)[0];
        assert_eq!(record.status, RecordStatus::Saved);
        assert_eq!(record.media_id.as_deref(), Some("M1"));
        assert!(record.saved_at.is_some());

        assert!(store.update_publish_status("M1", Some("P1"), Some(7)).unwrap());
        let record = &store.get_generation_history(1)[0];
        assert_eq!(record.status, RecordStatus::Published);
        assert_eq!(record.publish_id.as_deref(), Some("P1"));

        let published = store.get_publish_history(10);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].media_id, "M1");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_update_draft_no_match_returns_false() {
        let (store, dir) = scratch_store("nomatch");
        assert!(!store.update_draft_status("Missing", "M1", None).unwrap());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_publish_requires_saved_status() {
        let (store, dir) = scratch_store("unsaved");
        store.add_generation_history(&article("Draftless")).unwrap();
        // Still `generated`, so a publish update must not match.
        assert!(!store.update_publish_status("M9", Some("P9"), None).unwrap());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_schedule_persists_mass_send_flag() {
        let (store, dir) = scratch_store("schedule");
        store.add_generation_history(&article("Scheduled")).unwrap();
        store.update_draft_status("Scheduled", "M2", None).unwrap();

        let when = Utc::now() + Duration::hours(1);
        assert!(store.update_schedule("M2", when, true).unwrap());

        let record = &store.get_generation_history(1)[0];
        assert!(record.enable_mass_send);
        assert_eq!(record.publish_time, Some(when));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_mass_send_updates_only_matching_record() {
        let (store, dir) = scratch_store("mass");
        store.add_generation_history(&article("One")).unwrap();
        store.add_generation_history(&article("Two")).unwrap();
        store.update_draft_status("One", "M1", None).unwrap();
        store.update_draft_status("Two", "M2", None).unwrap();
        store.update_publish_status("M1", Some("P1"), None).unwrap();
        store.update_publish_status("M2", Some("P2"), None).unwrap();

        assert!(store.update_mass_send_status("P2", Some(99)).unwrap());

        let history = store.get_generation_history(10);
        let one = history.iter().find(|r| r.title == "One").unwrap();
        let two = history.iter().find(|r| r.title == "Two").unwrap();
        assert!(!one.mass_sent);
        assert!(two.mass_sent);
        assert_eq!(two.mass_msg_id, Some(99));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let (store, dir) = scratch_store("corrupt");
        std::fs::write(dir.join("history.json"), "not json").unwrap();
        assert!(store.get_generation_history(10).is_empty());
        // Store remains usable afterwards.
        store.add_generation_history(&article("Recovered")).unwrap();
        assert_eq!(store.get_generation_history(10).len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
