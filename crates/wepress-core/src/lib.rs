//! # WePress Core
//!
//! Shared foundation for the WePress publishing service: the TOML
//! configuration system and the common error type used across crates.

pub mod config;
pub mod error;

pub use config::WePressConfig;
pub use error::{Result, WePressError};
