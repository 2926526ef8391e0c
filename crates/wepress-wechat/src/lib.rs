//! # WePress WeChat
//!
//! HTTP client for the WeChat Official Account platform: access-token fetch,
//! draft creation, free-publish submission, and mass broadcast. The scheduler
//! consumes this through the [`PublishApi`] trait so job execution can be
//! tested against a mock platform.

pub mod client;
pub mod token;
pub mod types;

pub use client::{PublishApi, WeChatClient};
pub use token::{TokenCache, spawn_token_refresh_loop};
pub use types::{AccessTokenInfo, DraftArticle, MassSendResult, PublishResult};
