//! Boot-time recovery: re-register scheduled publishes from the history
//! store after a restart wiped the in-process state.

use chrono::Utc;
use wepress_history::{HistoryStore, RecordStatus};

use crate::engine::PublishScheduler;

/// Scan recent history and re-register every saved draft whose publish time
/// is still in the future. Returns the number of jobs restored. Run this
/// before the HTTP listener binds, so no request can observe a half-recovered
/// scheduler.
pub fn recover_jobs(history: &HistoryStore, scheduler: &mut PublishScheduler) -> usize {
    let now = Utc::now();
    let mut restored = 0;

    for record in history.get_generation_history(100) {
        if record.status != RecordStatus::Saved {
            continue;
        }
        let (Some(media_id), Some(publish_time)) = (&record.media_id, record.publish_time)
        else {
            continue;
        };

        if publish_time <= now {
            // The trigger passed while we were down. Refiring automatically
            // could double-publish against an already-live article, so leave
            // it to the operator.
            tracing::warn!(
                "Scheduled publish for media_id {media_id} was missed at {} — not re-registered",
                publish_time.to_rfc3339()
            );
            continue;
        }

        match scheduler.schedule(media_id, publish_time, record.enable_mass_send) {
            Ok(job_id) => {
                tracing::info!(
                    "Recovered publish job {job_id} for {} (mass_send={})",
                    publish_time.to_rfc3339(),
                    record.enable_mass_send
                );
                restored += 1;
            }
            Err(e) => tracing::error!("Failed to recover job for media_id {media_id}: {e}"),
        }
    }

    if restored > 0 {
        tracing::info!("Recovery restored {restored} scheduled publish job(s)");
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wepress_history::NewArticle;

    fn store(name: &str) -> (HistoryStore, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("wepress-recovery-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        (HistoryStore::new(&dir), dir)
    }

    fn saved_with_schedule(
        history: &HistoryStore,
        title: &str,
        media_id: &str,
        publish_time: chrono::DateTime<Utc>,
        enable_mass_send: bool,
    ) {
        history
            .add_generation_history(&NewArticle {
                title: title.into(),
                ..Default::default()
            })
            .unwrap();
        history.update_draft_status(title, media_id, None).unwrap();
        history
            .update_schedule(media_id, publish_time, enable_mass_send)
            .unwrap();
    }

    #[test]
    fn test_future_saved_record_is_restored_with_flag() {
        let (history, dir) = store("future");
        let when = Utc::now() + Duration::hours(2);
        saved_with_schedule(&history, "Pending", "M1", when, true);

        let mut scheduler = PublishScheduler::open_in_memory().unwrap();
        assert_eq!(recover_jobs(&history, &mut scheduler), 1);

        let job = &scheduler.jobs()[0];
        assert_eq!(job.media_id, "M1");
        assert_eq!(job.trigger_time, when);
        assert!(job.enable_mass_send);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_published_record_is_ignored() {
        let (history, dir) = store("published");
        let when = Utc::now() + Duration::hours(2);
        saved_with_schedule(&history, "Done", "M1", when, false);
        history.update_publish_status("M1", Some("P1"), None).unwrap();

        let mut scheduler = PublishScheduler::open_in_memory().unwrap();
        assert_eq!(recover_jobs(&history, &mut scheduler), 0);
        assert_eq!(scheduler.job_count(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missed_trigger_is_not_refired() {
        let (history, dir) = store("missed");
        saved_with_schedule(
            &history,
            "Missed",
            "M1",
            Utc::now() - Duration::minutes(10),
            false,
        );

        let mut scheduler = PublishScheduler::open_in_memory().unwrap();
        assert_eq!(recover_jobs(&history, &mut scheduler), 0);
        assert_eq!(scheduler.job_count(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_record_without_schedule_is_ignored() {
        let (history, dir) = store("unscheduled");
        history
            .add_generation_history(&NewArticle {
                title: "Draft only".into(),
                ..Default::default()
            })
            .unwrap();
        history.update_draft_status("Draft only", "M1", None).unwrap();

        let mut scheduler = PublishScheduler::open_in_memory().unwrap();
        assert_eq!(recover_jobs(&history, &mut scheduler), 0);
        std::fs::remove_dir_all(&dir).ok();
    }
}
