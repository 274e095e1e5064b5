//! # Plugin Utils
//!
//! Helpers that game-server plugins otherwise write over and over:
//!
//! - **Options** loaded from the `[utils]` table of the plugin descriptor
//! - **Messages** with a plugin prefix, `&` color codes and localized bundles
//! - **Data files** for the plugin and for each player
//! - **Update notifications** for players holding an alert permission, both
//!   when a newer release is published and after a new version was deployed
//!
//! The host server is reached only through the traits in [`host`]. A host
//! without its own scheduler can use [`TickScheduler`] and [`PlayerEvents`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plugin_utils::*;
//! use std::sync::Arc;
//!
//! fn enable(host: Arc<dyn Host>) -> Result<UtilPlugin, UtilsError> {
//!     let descriptor = PluginDescriptor::load("plugin.toml")?;
//!     let mut plugin = UtilPlugin::new(descriptor, "plugins/Shops", host)?;
//!
//!     plugin.options_mut().update_alert_permission = "shops.update".to_string();
//!     plugin.initialize_resources()?;
//!
//!     plugin.log_to_console("Enabled");
//!     Ok(plugin)
//! }
//! ```

pub mod error;
pub mod events;
pub mod host;
pub mod language;
pub mod notifier;
pub mod options;
pub mod plugin;
pub mod remote;
pub mod scheduler;
pub mod storage;
pub mod types;
pub mod version;

pub use error::{UpdateCheckError, UtilsError};
pub use events::PlayerEvents;
pub use host::{AsyncTask, EventBus, Host, JoinHandler, Player, RepeatingTask, Scheduler, SyncTask};
pub use language::{ChatColor, I18n, Language, LanguageManager, MessageProvider};
pub use notifier::{NotifierContext, UpdateNotifier};
pub use options::UtilsOptions;
pub use plugin::{PluginDescriptor, UtilPlugin};
pub use remote::{RemoteUpdateChecker, VersionSource};
pub use scheduler::TickScheduler;
pub use storage::DataFile;
pub use types::{PlayerId, TaskId, TICKS_PER_SECOND};
pub use version::{PluginVersion, ReleaseChannel, UpdateCallback, VersionSet};
