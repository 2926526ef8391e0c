//! SQLite-backed persistence for publish jobs — registrations survive an
//! unclean process exit.

use std::path::Path;

use chrono::{DateTime, Utc};
use wepress_core::{Result, WePressError};

use crate::jobs::PublishJob;

/// Durable job store. One table, one row per pending job.
pub struct JobStore {
    conn: rusqlite::Connection,
}

impl JobStore {
    /// Open or create the job database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| WePressError::Scheduler(format!("DB open: {e}")))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| WePressError::Scheduler(format!("DB open: {e}")))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS publish_jobs (
                job_id TEXT PRIMARY KEY,
                media_id TEXT NOT NULL,
                trigger_time TEXT NOT NULL,
                enable_mass_send INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
         ",
            )
            .map_err(|e| WePressError::Scheduler(format!("Migration: {e}")))?;
        Ok(())
    }

    /// Upsert a job. The primary key on job_id makes re-registration for the
    /// same media_id a replace, never a duplicate.
    pub fn save_job(&self, job: &PublishJob) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO publish_jobs
                 (job_id, media_id, trigger_time, enable_mass_send, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    job.job_id,
                    job.media_id,
                    job.trigger_time.to_rfc3339(),
                    job.enable_mass_send as i32,
                    job.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| WePressError::Scheduler(format!("Save job: {e}")))?;
        Ok(())
    }

    /// Load all pending jobs, soonest trigger first.
    pub fn load_jobs(&self) -> Vec<PublishJob> {
        let mut stmt = match self.conn.prepare(
            "SELECT job_id, media_id, trigger_time, enable_mass_send, created_at
             FROM publish_jobs ORDER BY trigger_time",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        let rows = stmt
            .query_map([], |row| {
                let job_id: String = row.get(0)?;
                let media_id: String = row.get(1)?;
                let trigger_time_str: String = row.get(2)?;
                let enable_mass_send: bool = row.get::<_, i32>(3)? != 0;
                let created_at_str: String = row.get(4)?;

                let trigger_time = DateTime::parse_from_rfc3339(&trigger_time_str)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                Ok(PublishJob {
                    job_id,
                    media_id,
                    trigger_time,
                    enable_mass_send,
                    created_at,
                })
            })
            .ok();

        rows.map(|r| r.filter_map(|j| j.ok()).collect())
            .unwrap_or_default()
    }

    /// Delete a job row. Deleting an absent job is not an error.
    pub fn delete_job(&self, job_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM publish_jobs WHERE job_id = ?1", [job_id])
            .map_err(|e| WePressError::Scheduler(format!("Delete job: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_open_and_migrate() {
        let store = JobStore::open_in_memory().unwrap();
        assert!(store.load_jobs().is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let store = JobStore::open_in_memory().unwrap();
        let job = PublishJob::new("M1", Utc::now() + Duration::hours(1), true);
        store.save_job(&job).unwrap();

        let loaded = store.load_jobs();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].job_id, "publish_M1");
        assert_eq!(loaded[0].media_id, "M1");
        assert!(loaded[0].enable_mass_send);
        assert_eq!(loaded[0].trigger_time, job.trigger_time);
    }

    #[test]
    fn test_upsert_replaces() {
        let store = JobStore::open_in_memory().unwrap();
        let t1 = Utc::now() + Duration::hours(1);
        let t2 = Utc::now() + Duration::hours(2);
        store.save_job(&PublishJob::new("M1", t1, false)).unwrap();
        store.save_job(&PublishJob::new("M1", t2, false)).unwrap();

        let loaded = store.load_jobs();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].trigger_time, t2);
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let store = JobStore::open_in_memory().unwrap();
        store.delete_job("publish_nope").unwrap();
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = std::env::temp_dir().join("wepress-jobstore-reopen");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("jobs.db");

        {
            let store = JobStore::open(&path).unwrap();
            store
                .save_job(&PublishJob::new("M2", Utc::now() + Duration::hours(1), false))
                .unwrap();
        }

        let store = JobStore::open(&path).unwrap();
        assert_eq!(store.load_jobs().len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
