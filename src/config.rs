//! Configuration for the last-upgrade service

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Package manager history log to scan
    #[serde(default = "default_history_log")]
    pub history_log: PathBuf,

    /// Pause before every scan that misses the cache, 0 disables it
    #[serde(default = "default_scan_delay_ms")]
    pub scan_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            history_log: default_history_log(),
            scan_delay_ms: default_scan_delay_ms(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read configuration file")?;
        let config: ServiceConfig = toml::from_str(&contents)
            .context("Failed to parse configuration file")?;
        Ok(config)
    }

    /// Load configuration from environment variables or use defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("APT_LAST_UPGRADE_ADDR") {
            if let Ok(ip) = addr.parse() {
                config.listen_addr = ip;
            }
        }

        if let Ok(port) = std::env::var("APT_LAST_UPGRADE_PORT") {
            if let Ok(p) = port.parse() {
                config.listen_port = p;
            }
        }

        if let Ok(path) = std::env::var("APT_LAST_UPGRADE_HISTORY_LOG") {
            config.history_log = PathBuf::from(path);
        }

        if let Ok(delay) = std::env::var("APT_LAST_UPGRADE_SCAN_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                config.scan_delay_ms = ms;
            }
        }

        config
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), contents)
            .context("Failed to write configuration file")?;
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }

    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }
}

fn default_listen_addr() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_listen_port() -> u16 {
    8080
}

fn default_history_log() -> PathBuf {
    PathBuf::from("/var/log/apt/history.log")
}

fn default_scan_delay_ms() -> u64 {
    5000
}
