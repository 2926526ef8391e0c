//! Scheduler engine — job registry plus the dispatch loop that fires due
//! publish actions.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use wepress_core::Result;

use crate::jobs::{PublishJob, parse_trigger_time};
use crate::publish::PublishAction;
use crate::store::JobStore;

/// In-process registry of pending publish jobs, backed by SQLite.
pub struct PublishScheduler {
    jobs: Vec<PublishJob>,
    store: JobStore,
}

impl PublishScheduler {
    /// Open the scheduler, loading any jobs persisted by a previous run.
    pub fn open(db_path: &Path) -> Result<Self> {
        let store = JobStore::open(db_path)?;
        let jobs = store.load_jobs();
        if !jobs.is_empty() {
            tracing::info!("Scheduler loaded {} pending job(s)", jobs.len());
        }
        Ok(Self { jobs, store })
    }

    /// In-memory scheduler, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            jobs: Vec::new(),
            store: JobStore::open_in_memory()?,
        })
    }

    /// Register (or re-register) a publish job for a draft. The job id is
    /// derived from the media_id, so a second call replaces the pending
    /// trigger time rather than creating a duplicate firing.
    pub fn schedule(
        &mut self,
        media_id: &str,
        trigger_time: DateTime<Utc>,
        enable_mass_send: bool,
    ) -> Result<String> {
        let job = PublishJob::new(media_id, trigger_time, enable_mass_send);
        let job_id = job.job_id.clone();

        self.store.save_job(&job)?;
        self.jobs.retain(|j| j.job_id != job_id);
        self.jobs.push(job);
        self.jobs.sort_by_key(|j| j.trigger_time);

        tracing::info!(
            "Publish job registered: {job_id} at {} (mass_send={enable_mass_send})",
            trigger_time.to_rfc3339()
        );
        Ok(job_id)
    }

    /// Register a job from a caller-supplied time string. Unparseable input
    /// is rejected here, before anything reaches the store.
    pub fn schedule_at(
        &mut self,
        media_id: &str,
        trigger_time: &str,
        enable_mass_send: bool,
    ) -> Result<String> {
        let parsed = parse_trigger_time(trigger_time)?;
        self.schedule(media_id, parsed, enable_mass_send)
    }

    /// Best-effort cancellation. A job that already fired or never existed is
    /// a silent no-op — callers must be able to cancel blindly.
    pub fn cancel(&mut self, job_id: &str) {
        let len = self.jobs.len();
        self.jobs.retain(|j| j.job_id != job_id);
        if let Err(e) = self.store.delete_job(job_id) {
            tracing::warn!("Failed to delete job {job_id} from store: {e}");
        }
        if self.jobs.len() < len {
            tracing::info!("Publish job cancelled: {job_id}");
        }
    }

    /// Remove and return all jobs due at `now`, soonest first. Rows are
    /// deleted from the durable store *before* the action runs: a crash
    /// mid-action costs that firing at most once per restart, instead of
    /// refiring on every boot.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<PublishJob> {
        let (due, pending): (Vec<_>, Vec<_>) =
            self.jobs.drain(..).partition(|j| j.is_due(now));
        self.jobs = pending;

        let mut due = due;
        due.sort_by_key(|j| j.trigger_time);
        for job in &due {
            if let Err(e) = self.store.delete_job(&job.job_id) {
                tracing::warn!("Failed to remove fired job {} from store: {e}", job.job_id);
            }
        }
        due
    }

    /// Pending jobs, soonest first.
    pub fn jobs(&self) -> &[PublishJob] {
        &self.jobs
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

/// One dispatch pass: fire every due job. Returns the number fired. Each
/// firing is isolated — a failed action is logged and terminal for that job,
/// never retried, never fatal to the caller.
pub async fn dispatch_once(
    scheduler: &Mutex<PublishScheduler>,
    action: &PublishAction,
) -> usize {
    let due = {
        let mut engine = scheduler.lock().await;
        engine.take_due(Utc::now())
    };

    let fired = due.len();
    for job in due {
        tracing::info!("Firing publish job {} (media_id={})", job.job_id, job.media_id);
        if let Err(e) = action.run(&job).await {
            tracing::error!("Scheduled publish failed for {}: {e}", job.job_id);
        }
    }
    fired
}

/// Background dispatch loop. Spawn this once at startup; it runs for the
/// process lifetime.
pub async fn run_dispatch_loop(
    scheduler: Arc<Mutex<PublishScheduler>>,
    action: Arc<PublishAction>,
    tick_secs: u64,
) {
    tracing::info!("Publish dispatch loop started (check every {tick_secs}s)");
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(tick_secs));

    loop {
        interval.tick().await;
        dispatch_once(&scheduler, &action).await;
    }
}
