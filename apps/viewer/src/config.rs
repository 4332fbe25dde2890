//! Viewer configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/tilecast/viewer.toml`
//! - Windows: `%APPDATA%/tilecast/viewer.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tilecast_channel::ListenerConfig;
use tilecast_protocol::DEFAULT_PORT;

/// Viewer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on.
    #[serde(default = "default_host")]
    pub host: String,

    /// First port to try (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Try the following ports when `port` is taken.
    #[serde(default = "default_true")]
    pub search: bool,

    /// Per-message read limit in milliseconds (0 = wait forever).
    #[serde(default)]
    pub receive_timeout_ms: u64,

    /// Channels per framebuffer pixel.
    #[serde(default = "default_channels")]
    pub channels: usize,

    /// Directory for finished frames. Nothing is written when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_channels() -> usize {
    tilecast_frame::DEFAULT_CHANNELS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            search: default_true(),
            receive_timeout_ms: 0,
            channels: default_channels(),
            output_dir: None,
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

    /// Listener settings derived from this configuration.
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            host: self.host.clone(),
            port: self.port,
            search: self.search,
            receive_timeout: (self.receive_timeout_ms > 0)
                .then(|| Duration::from_millis(self.receive_timeout_ms)),
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
            .join("viewer.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("tilecast").join("viewer.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/tilecast/viewer.toml"))
    }
}
