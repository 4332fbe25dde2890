//! Sender configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/tilecast/send.toml`
//! - Windows: `%APPDATA%/tilecast/send.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tilecast_channel::{SenderConfig, TCP_CONNECT_TIMEOUT};
use tilecast_protocol::DEFAULT_PORT;

/// Sender configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host running the viewer.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Edge length of a square bucket.
    #[serde(default = "default_bucket_size")]
    pub bucket_size: u32,

    /// Samples per pixel: 3 for RGB, 4 for RGBA.
    #[serde(default = "default_samples_per_pixel")]
    pub samples_per_pixel: u32,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_ms() -> u64 {
    TCP_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_bucket_size() -> u32 {
    32
}

fn default_samples_per_pixel() -> u32 {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            width: default_width(),
            height: default_height(),
            bucket_size: default_bucket_size(),
            samples_per_pixel: default_samples_per_pixel(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("tilecast")
            .join("send.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("tilecast").join("send.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/tilecast/send.toml"))
    }
}
