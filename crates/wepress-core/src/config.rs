//! WePress configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, WePressError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WePressConfig {
    #[serde(default)]
    pub wechat: WeChatConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for WePressConfig {
    fn default() -> Self {
        Self {
            wechat: WeChatConfig::default(),
            gateway: GatewayConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl WePressConfig {
    /// Load config from the default path (~/.wepress/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WePressError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| WePressError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| WePressError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the WePress home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wepress")
    }

    /// Check that the Official Account credentials are present.
    pub fn wechat_configured(&self) -> bool {
        !self.wechat.app_id.is_empty() && !self.wechat.app_secret.is_empty()
    }
}

/// WeChat Official Account configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeChatConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Byline stamped on published articles.
    #[serde(default = "default_author")]
    pub author: String,
    /// "Read original" link attached to articles.
    #[serde(default)]
    pub content_source_url: String,
}

fn default_base_url() -> String {
    "https://api.weixin.qq.com".into()
}
fn default_author() -> String {
    "WePress".into()
}

impl Default for WeChatConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            base_url: default_base_url(),
            author: default_author(),
            content_source_url: String::new(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Dispatch loop check interval. Minute-level firing precision is the
    /// contract; 30s keeps us comfortably inside it.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Access-token expiry poll interval.
    #[serde(default = "default_token_refresh_secs")]
    pub token_refresh_secs: u64,
    /// Data directory for history files, the job database, and the token
    /// snapshot. Empty means `~/.wepress/data`.
    #[serde(default)]
    pub data_dir: String,
}

fn default_tick_secs() -> u64 {
    30
}
fn default_token_refresh_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            token_refresh_secs: default_token_refresh_secs(),
            data_dir: String::new(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve the data directory, falling back to `~/.wepress/data`.
    pub fn data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            WePressConfig::home_dir().join("data")
        } else {
            PathBuf::from(&self.data_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WePressConfig::default();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.wechat.base_url, "https://api.weixin.qq.com");
        assert_eq!(config.scheduler.tick_secs, 30);
        assert!(!config.wechat_configured());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [wechat]
            app_id = "wx123"
            app_secret = "secret"
            author = "AI Notes"

            [gateway]
            port = 8080
        "#;

        let config: WePressConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.wechat.app_id, "wx123");
        assert_eq!(config.wechat.author, "AI Notes");
        assert_eq!(config.gateway.port, 8080);
        assert!(config.wechat_configured());
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: WePressConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.scheduler.token_refresh_secs, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("wepress-config-test");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("config.toml");

        let mut config = WePressConfig::default();
        config.wechat.app_id = "wx42".into();
        config.save_to(&path).unwrap();

        let loaded = WePressConfig::load_from(&path).unwrap();
        assert_eq!(loaded.wechat.app_id, "wx42");
        std::fs::remove_dir_all(&dir).ok();
    }
}
