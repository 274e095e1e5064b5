//! Configuration management for the update notifier service.
//!
//! This module handles loading and validation of the service configuration
//! from a TOML file, and converts it into the plugin descriptor the
//! utilities work with.

use anyhow::{bail, Context, Result};
use plugin_utils::remote::{DEFAULT_API_BASE, DEFAULT_TIMEOUT};
use plugin_utils::PluginDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

/// Default request timeout for serde deserialization
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The plugin being watched
    pub plugin: PluginSettings,
    /// Update API settings
    #[serde(default)]
    pub remote: RemoteSettings,
    /// Tick loop settings
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Identity and storage of the watched plugin.
///
/// When `descriptor` is set, name, version, slug and the `[utils]` table are
/// read from that `plugin.toml` and the inline `name`/`version` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Plugin display name
    pub name: String,
    /// Running version
    pub version: String,
    /// Listing slug, if it differs from the name
    #[serde(default)]
    pub slug: Option<String>,
    /// Folder holding the utility data file
    pub data_folder: String,
    /// Optional plugin descriptor to read instead of the inline values
    #[serde(default)]
    pub descriptor: Option<String>,
}

/// Update API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the plugin metadata API
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Tick loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plugin: PluginSettings {
                name: "MyPlugin".to_string(),
                version: "1.0.0".to_string(),
                slug: None,
                data_folder: "data".to_string(),
                descriptor: None,
            },
            remote: RemoteSettings::default(),
            scheduler: SchedulerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig =
                toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Builds the plugin descriptor, reading `plugin.descriptor` when set.
    pub fn to_descriptor(&self) -> Result<PluginDescriptor> {
        if let Some(path) = &self.plugin.descriptor {
            return PluginDescriptor::load(path)
                .with_context(|| format!("loading plugin descriptor {}", path));
        }

        let mut descriptor = PluginDescriptor::new(&self.plugin.name, &self.plugin.version);
        descriptor.slug = self.plugin.slug.clone();
        Ok(descriptor)
    }

    pub fn data_folder(&self) -> PathBuf {
        PathBuf::from(&self.plugin.data_folder)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<()> {
        if self.plugin.descriptor.is_none() {
            if self.plugin.name.trim().is_empty() {
                bail!("Plugin name cannot be empty");
            }
            if self.plugin.version.trim().is_empty() {
                bail!("Plugin version cannot be empty");
            }
        }

        if self.plugin.data_folder.is_empty() {
            bail!("Data folder cannot be empty");
        }

        if !(self.remote.base_url.starts_with("http://") || self.remote.base_url.starts_with("https://")) {
            bail!("Invalid update API URL: {}", self.remote.base_url);
        }

        if self.remote.timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }

        if self.scheduler.tick_interval_ms == 0 {
            bail!("Tick interval must be greater than zero");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            );
        }

        Ok(())
    }
}
