//! Options controlling the utilities.
//!
//! Defaults are derived from the plugin name, then overridden by the
//! optional `[utils]` table of the plugin descriptor, and finally by the
//! plugin itself before it calls `UtilPlugin::initialize_resources`.
//!
//! ```toml
//! [utils]
//! prefix = "MyPlugin"
//!
//! [utils.update]
//! enabled = true
//! changelog = "Fixed the thing."
//! permission_node = "myplugin.update"
//! ticks_between_checks = 864000
//! ```

use crate::types::DEFAULT_TICKS_BETWEEN_UPDATE_CHECKS;
use serde::{Deserialize, Serialize};

/// Default header written at the top of the utility data file.
pub const DEFAULT_FILE_HEADER: &str =
    "This is a data file from the plugin utilities. Please leave this alone. Thanks!";

/// Default alert permission when none is configured.
pub const UNASSIGNED_PERMISSION: &str = "Unassigned";

/// Runtime options of the utilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilsOptions {
    /// Whether the remote update check runs at all
    pub update_check_enabled: bool,
    /// Sent to alert-permission holders when a newer release is published
    pub update_available_message: String,
    /// Sent to alert-permission holders after a new version was installed
    pub update_installed_message: String,
    /// Whether the installed message is sent
    pub update_installed_message_enabled: bool,
    /// Header of the utility data file
    pub file_header: String,
    /// Permission node required to receive update messages
    pub update_alert_permission: String,
    /// Prefix used by beautified messages
    pub plugin_prefix: String,
    /// Changelog appended to the installed message
    pub changelog: String,
    /// Interval between remote checks, in ticks
    pub ticks_between_update_checks: u64,
}

impl UtilsOptions {
    /// Defaults for the plugin called `plugin_name`.
    pub fn new(plugin_name: &str) -> Self {
        Self {
            update_check_enabled: true,
            update_available_message: format!("There is an update available for {}", plugin_name),
            update_installed_message: format!("{} has updated. Here's what changed: ", plugin_name),
            update_installed_message_enabled: true,
            file_header: DEFAULT_FILE_HEADER.to_string(),
            update_alert_permission: UNASSIGNED_PERMISSION.to_string(),
            plugin_prefix: String::new(),
            changelog: String::new(),
            ticks_between_update_checks: DEFAULT_TICKS_BETWEEN_UPDATE_CHECKS,
        }
    }

    /// Applies every value present in a descriptor `[utils]` table.
    /// Absent values keep their current setting.
    pub fn merge(&mut self, section: &UtilsSection) {
        if let Some(prefix) = &section.prefix {
            self.plugin_prefix = prefix.clone();
        }

        let update = &section.update;
        if let Some(enabled) = update.enabled {
            self.update_check_enabled = enabled;
        }
        if let Some(changelog) = &update.changelog {
            self.changelog = changelog.clone();
        }
        if let Some(permission) = &update.permission_node {
            self.update_alert_permission = permission.clone();
        }
        if let Some(ticks) = update.ticks_between_checks {
            self.ticks_between_update_checks = ticks;
        }
        if let Some(message) = &update.available_message {
            self.update_available_message = message.clone();
        }
        if let Some(message) = &update.installed_message {
            self.update_installed_message = message.clone();
        }
        if let Some(enabled) = update.installed_message_enabled {
            self.update_installed_message_enabled = enabled;
        }
    }

    /// Full text of the "update installed" notification.
    pub fn installed_notification(&self) -> String {
        format!("{}{}", self.update_installed_message, self.changelog)
    }
}

/// `[utils]` table of the plugin descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilsSection {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub update: UpdateSection,
}

/// `[utils.update]` table of the plugin descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub permission_node: Option<String>,
    #[serde(default)]
    pub ticks_between_checks: Option<u64>,
    #[serde(default)]
    pub available_message: Option<String>,
    #[serde(default)]
    pub installed_message: Option<String>,
    #[serde(default)]
    pub installed_message_enabled: Option<bool>,
}
