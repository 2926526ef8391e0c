//! # WePress Scheduler
//!
//! Durable, in-process scheduled-publish engine. Jobs are persisted in SQLite
//! and survive unclean process exits; the dispatch loop fires each job's
//! two-phase action (publish draft → optional mass-send) with at-least-once
//! semantics.
//!
//! ## Architecture
//! ```text
//! schedule(media_id, time, mass_send)
//!   └── PublishScheduler (memory + SQLite, job id derived from media_id)
//!         └── dispatch loop (tokio interval)
//!               └── PublishAction
//!                     ├── fetch access token
//!                     ├── freepublish/submit
//!                     ├── history: saved → published
//!                     └── optional mass-send → history in-place update
//!
//! On boot: recovery scans the history store for saved records with a future
//! publish_time and re-registers them before the HTTP listener binds.
//! ```

pub mod engine;
pub mod jobs;
pub mod publish;
pub mod recovery;
pub mod store;

pub use engine::{PublishScheduler, dispatch_once, run_dispatch_loop};
pub use jobs::{PublishJob, parse_trigger_time};
pub use publish::PublishAction;
pub use recovery::recover_jobs;
pub use store::JobStore;
