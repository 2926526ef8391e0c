//! WePress error types.

/// Errors produced anywhere in the WePress stack.
#[derive(Debug, thiserror::Error)]
pub enum WePressError {
    /// Configuration load/save/validation failure.
    #[error("Config error: {0}")]
    Config(String),

    /// Caller-supplied input rejected before any work started.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// History store read/write failure.
    #[error("History error: {0}")]
    History(String),

    /// Scheduler job store or registration failure.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// WeChat platform call failed (network, credential, or errcode != 0).
    #[error("WeChat error: {0}")]
    WeChat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, WePressError>;
