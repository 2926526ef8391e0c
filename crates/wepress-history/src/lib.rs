//! # WePress History
//!
//! Durable append/update log of article lifecycle records, persisted as two
//! JSON-array files under the data directory:
//!
//! - `history.json` — one [`GenerationRecord`] per generated article, newest
//!   first, capped at 100 entries.
//! - `publish_history.json` — denormalised publish log, capped at 50 entries.
//!
//! Every mutation is a whole-file read-modify-write serialized behind a mutex:
//! the scheduler dispatch loop, the token-refresh loop, and HTTP handlers all
//! write here concurrently.

pub mod record;
pub mod store;

pub use record::{GenerationRecord, NewArticle, PublishRecord, RecordStatus};
pub use store::HistoryStore;
