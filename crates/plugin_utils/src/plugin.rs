//! Plugin façade.
//!
//! [`UtilPlugin`] is what a plugin embeds: it reads the descriptor, owns the
//! options and the data folder, hands out data files, and starts the update
//! notifier once the plugin has finished adjusting its options.

use crate::error::UtilsError;
use crate::host::{AsyncTask, Host, SyncTask};
use crate::language::{ChatColor, LanguageManager, MessageProvider};
use crate::notifier::{NotifierContext, UpdateNotifier};
use crate::options::{UtilsOptions, UtilsSection};
use crate::remote::{normalize_slug, slug_for_plugin, RemoteUpdateChecker, VersionSource};
use crate::storage::DataFile;
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Folder inside the data folder that holds the utility data file.
pub const UTILS_FOLDER: &str = "PluginUtils";

/// Name of the utility data file.
pub const UTILS_FILE_NAME: &str = "data.toml";

/// Folder inside the data folder that holds per-player files.
pub const PLAYER_FILES_FOLDER: &str = "player_files";

/// Plugin descriptor (`plugin.toml`).
///
/// ```toml
/// name = "Shops"
/// version = "1.4.0"
/// slug = "shops-plus"   # optional, defaults to the name without spaces
///
/// [utils]
/// prefix = "Shops"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub utils: UtilsSection,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            slug: None,
            utils: UtilsSection::default(),
        }
    }

    /// Reads a descriptor from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UtilsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| UtilsError::io(path, e))?;
        toml::from_str(&content).map_err(|source| UtilsError::TomlRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `name vversion`, as shown in messages.
    pub fn full_name(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }

    /// Slug used for remote update checks.
    pub fn update_slug(&self) -> String {
        match &self.slug {
            Some(slug) => normalize_slug(slug),
            None => slug_for_plugin(&self.name),
        }
    }
}

/// Utilities bound to one plugin instance.
pub struct UtilPlugin {
    descriptor: PluginDescriptor,
    options: UtilsOptions,
    data_folder: PathBuf,
    host: Arc<dyn Host>,
    utils_file: Option<Arc<Mutex<DataFile>>>,
    notifier: Option<UpdateNotifier>,
}

impl UtilPlugin {
    /// Creates the data folder and derives the options from the descriptor.
    pub fn new(
        descriptor: PluginDescriptor,
        data_folder: impl Into<PathBuf>,
        host: Arc<dyn Host>,
    ) -> Result<Self, UtilsError> {
        let data_folder = data_folder.into();
        std::fs::create_dir_all(&data_folder).map_err(|e| UtilsError::io(&data_folder, e))?;

        let mut options = UtilsOptions::new(&descriptor.full_name());
        options.merge(&descriptor.utils);

        Ok(Self {
            descriptor,
            options,
            data_folder,
            host,
            utils_file: None,
            notifier: None,
        })
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &UtilsOptions {
        &self.options
    }

    /// Options may be changed until [`initialize_resources`](Self::initialize_resources)
    /// runs; later changes do not reach the notifier.
    pub fn options_mut(&mut self) -> &mut UtilsOptions {
        &mut self.options
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn is_initialized(&self) -> bool {
        self.notifier.is_some()
    }

    pub fn notifier(&self) -> Option<&UpdateNotifier> {
        self.notifier.as_ref()
    }

    /// Starts the notifier against the public update API.
    pub fn initialize_resources(&mut self) -> Result<(), UtilsError> {
        let checker = RemoteUpdateChecker::new()?;
        self.initialize_resources_with(Arc::new(checker))
    }

    /// Starts the notifier with a custom version source. Must be called on
    /// the main context.
    pub fn initialize_resources_with(&mut self, source: Arc<dyn VersionSource>) -> Result<(), UtilsError> {
        if let Some(notifier) = self.notifier.take() {
            debug!("Re-initializing resources for {}", self.descriptor.name);
            notifier.shutdown();
        }

        let data_file = self.utils_file()?;
        let notifier = UpdateNotifier::new(NotifierContext {
            host: self.host.clone(),
            source,
            options: self.options.clone(),
            data_file,
            slug: self.descriptor.update_slug(),
            running_version: self.descriptor.version.clone(),
        });
        self.notifier = Some(notifier);

        info!("Plugin utilities loaded for {}", self.descriptor.full_name());
        Ok(())
    }

    /// The utility data file, loaded and stamped with the header on first use.
    pub fn utils_file(&mut self) -> Result<Arc<Mutex<DataFile>>, UtilsError> {
        if let Some(file) = &self.utils_file {
            return Ok(file.clone());
        }

        let path = self.data_folder.join(UTILS_FOLDER).join(UTILS_FILE_NAME);
        let mut file = DataFile::load(&path)?;
        file.set_header(self.options.file_header.clone());
        file.save()?;

        let file = Arc::new(Mutex::new(file));
        self.utils_file = Some(file.clone());
        Ok(file)
    }

    /// Writes the utility data file, if it has been loaded.
    pub fn save_utils_file(&self) -> Result<(), UtilsError> {
        match &self.utils_file {
            Some(file) => file.lock().unwrap_or_else(|e| e.into_inner()).save(),
            None => Ok(()),
        }
    }

    /// Loads (creating if needed) a data file relative to the data folder.
    pub fn file(&self, relative_path: impl AsRef<Path>) -> Result<DataFile, UtilsError> {
        if !self.is_initialized() {
            return Err(UtilsError::NotInitialized);
        }
        DataFile::load(self.data_folder.join(relative_path))
    }

    /// Path of a player's data file.
    pub fn player_file_path(&self, player: PlayerId) -> PathBuf {
        self.data_folder
            .join(PLAYER_FILES_FOLDER)
            .join(format!("{}.toml", player))
    }

    /// Loads (creating if needed) a player's data file. Save it with
    /// [`DataFile::save`].
    pub fn player_file(&self, player: PlayerId) -> Result<DataFile, UtilsError> {
        DataFile::load(self.player_file_path(player))
    }

    /// Logs `message` with the plugin prefix.
    pub fn log_to_console(&self, message: &str) {
        self.log_to_console_colored(None, message);
    }

    pub fn log_to_console_colored(&self, start_color: Option<ChatColor>, message: &str) {
        info!(
            "{}",
            LanguageManager::beautify(start_color, message, &self.options.plugin_prefix)
        );
    }

    /// Language manager using this plugin's prefix and scheduler.
    pub fn language_manager(&self, provider: Arc<dyn MessageProvider>) -> LanguageManager {
        LanguageManager::new(
            provider,
            self.options.plugin_prefix.clone(),
            self.host.scheduler(),
        )
    }

    /// Runs `task` on the main context.
    pub fn run_sync(&self, task: SyncTask) {
        self.host.scheduler().run_sync(task);
    }

    /// Runs `task` on the worker context.
    pub fn run_async(&self, task: AsyncTask) {
        self.host.scheduler().run_async(task);
    }
}
