//! # WePress Gateway
//!
//! HTTP API surface: draft creation, immediate and scheduled publishing,
//! mass-send, history queries, and runtime config updates. Thin handlers over
//! the injected scheduler/history/platform services — no business logic of
//! its own.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
