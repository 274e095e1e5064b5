//! Update notifications for players holding the alert permission.
//!
//! The notifier covers two independent events:
//!
//! - **Remote update**: a newer release is published. Checked on a repeating
//!   main-context task whose network call runs on the worker context. The
//!   first positive result cancels the task, and the broadcast is marshaled
//!   back to the main context.
//! - **Local update**: the plugin was redeployed with a different version
//!   since the last start. Detected once, at construction, by comparing the
//!   running version with `last_version` in the utility data file.
//!
//! Players who join later receive each message once per process lifetime.

use crate::host::{Host, JoinHandler, Player, RepeatingTask};
use crate::options::UtilsOptions;
use crate::remote::VersionSource;
use crate::storage::DataFile;
use crate::types::{PlayerId, TaskId};
use crate::version::UpdateCallback;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, error, info};

/// Data file key holding the version seen on the previous start.
pub const LAST_VERSION_KEY: &str = "last_version";

/// Data file key holding the schema marker of the data file.
pub const FILE_VERSION_KEY: &str = "BPU_version";

/// Current schema marker written next to [`LAST_VERSION_KEY`].
pub const DATA_FILE_VERSION: &str = "1";

/// Compares the persisted last version against `running_version`.
///
/// - no persisted value: records the running version, returns `false`;
/// - a different value: records the running version, returns `true`;
/// - the same value: leaves the file alone, returns `false`.
///
/// A failed save is logged; the returned answer stands either way.
pub fn has_file_updated(file: &mut DataFile, running_version: &str) -> bool {
    let updated = match file.get(LAST_VERSION_KEY) {
        None => false,
        Some(previous) if previous.as_str() == Some(running_version) => return false,
        Some(_) => true,
    };

    file.set(LAST_VERSION_KEY, running_version);
    file.set(FILE_VERSION_KEY, DATA_FILE_VERSION);
    if let Err(e) = file.save() {
        error!("Failed to record version {}: {}", running_version, e);
    }

    updated
}

/// Everything the notifier needs from its plugin.
pub struct NotifierContext {
    pub host: Arc<dyn Host>,
    pub source: Arc<dyn VersionSource>,
    pub options: UtilsOptions,
    pub data_file: Arc<Mutex<DataFile>>,
    /// Slug the plugin is listed under
    pub slug: String,
    /// Version of the running plugin build
    pub running_version: String,
}

#[derive(Debug, Default)]
struct NotifierState {
    remote_update_found: bool,
    file_updated: bool,
    task_id: Option<TaskId>,
    notified_of_remote_update: HashSet<PlayerId>,
    notified_of_file_update: HashSet<PlayerId>,
}

struct NotifierInner {
    host: Arc<dyn Host>,
    source: Arc<dyn VersionSource>,
    options: UtilsOptions,
    slug: String,
    running_version: String,
    state: Mutex<NotifierState>,
}

/// Tracks and announces plugin updates.
pub struct UpdateNotifier {
    inner: Arc<NotifierInner>,
}

impl UpdateNotifier {
    /// Registers the join handler, starts polling when enabled and runs local
    /// update detection. Must be called on the main context.
    pub fn new(context: NotifierContext) -> Self {
        let NotifierContext {
            host,
            source,
            options,
            data_file,
            slug,
            running_version,
        } = context;

        let inner = Arc::new(NotifierInner {
            host,
            source,
            options,
            slug,
            running_version,
            state: Mutex::new(NotifierState::default()),
        });

        let weak = Arc::downgrade(&inner);
        let handler: JoinHandler = Arc::new(move |player: &dyn Player| {
            if let Some(inner) = weak.upgrade() {
                inner.on_player_join(player);
            }
        });
        inner.host.events().on_player_join(handler);

        if inner.options.update_check_enabled {
            let weak: Weak<NotifierInner> = Arc::downgrade(&inner);
            let task: RepeatingTask = Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.check_for_remote_updates();
                }
            });
            let id = inner.host.scheduler().schedule_sync_repeating(
                0,
                inner.options.ticks_between_update_checks,
                task,
            );
            inner.state().task_id = Some(id);
            info!(
                "Checking {} for updates every {} ticks",
                inner.slug, inner.options.ticks_between_update_checks
            );
        } else {
            debug!("Remote update checks are disabled for {}", inner.slug);
        }

        let file_updated = {
            let mut file = data_file.lock().unwrap_or_else(|e| e.into_inner());
            has_file_updated(&mut file, &inner.running_version)
        };
        inner.state().file_updated = file_updated;

        if file_updated {
            info!("{} was updated to {}", inner.slug, inner.running_version);
            if inner.options.update_installed_message_enabled {
                inner.host.broadcast(
                    &inner.options.installed_notification(),
                    &inner.options.update_alert_permission,
                );
            }
        }

        Self { inner }
    }

    /// Runs one remote check now. The network call happens on the worker
    /// context.
    pub fn check_for_remote_updates(&self) {
        self.inner.check_for_remote_updates();
    }

    /// Delivers pending notifications to a joining player.
    pub fn on_player_join(&self, player: &dyn Player) {
        self.inner.on_player_join(player);
    }

    /// Whether a newer remote release has been found.
    pub fn is_remote_update(&self) -> bool {
        self.inner.state().remote_update_found
    }

    /// Whether the plugin version changed since the previous start.
    pub fn has_file_update(&self) -> bool {
        self.inner.state().file_updated
    }

    /// The polling task, while it is scheduled.
    pub fn task_id(&self) -> Option<TaskId> {
        self.inner.state().task_id
    }

    pub fn was_notified_of_remote_update(&self, player: PlayerId) -> bool {
        self.inner.state().notified_of_remote_update.contains(&player)
    }

    pub fn was_notified_of_file_update(&self, player: PlayerId) -> bool {
        self.inner.state().notified_of_file_update.contains(&player)
    }

    /// Stops polling.
    pub fn shutdown(&self) {
        self.inner.cancel_polling();
    }
}

impl Drop for UpdateNotifier {
    fn drop(&mut self) {
        self.inner.cancel_polling();
    }
}

impl NotifierInner {
    fn state(&self) -> MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_polling(&self) {
        let id = self.state().task_id.take();
        if let Some(id) = id {
            self.host.scheduler().cancel_task(id);
        }
    }

    fn check_for_remote_updates(self: &Arc<Self>) {
        let inner = self.clone();
        self.host.scheduler().run_async(Box::pin(async move {
            let Some(callback) = inner
                .source
                .update_check(&inner.slug, &inner.running_version)
                .await
            else {
                return;
            };

            if !callback.is_update() {
                debug!("{} {} is up to date", inner.slug, inner.running_version);
                return;
            }

            inner.cancel_polling();
            let main = inner.clone();
            inner
                .host
                .scheduler()
                .run_sync(Box::new(move || main.on_remote_update(callback)));
        }));
    }

    fn on_remote_update(&self, callback: UpdateCallback) {
        {
            let mut state = self.state();
            if state.remote_update_found {
                return;
            }
            state.remote_update_found = true;
        }

        info!(
            "An update for {} is available: {} (running {})",
            self.slug,
            callback.version(),
            self.running_version
        );
        let recipients = self.host.broadcast(
            &self.options.update_available_message,
            &self.options.update_alert_permission,
        );
        debug!("Update notice sent to {} players", recipients);
    }

    fn on_player_join(&self, player: &dyn Player) {
        if !player.has_permission(&self.options.update_alert_permission) {
            return;
        }

        let id = player.id();
        let (send_remote, send_file) = {
            let mut state = self.state();
            let send_remote =
                state.remote_update_found && state.notified_of_remote_update.insert(id);
            let send_file = state.file_updated
                && self.options.update_installed_message_enabled
                && state.notified_of_file_update.insert(id);
            (send_remote, send_file)
        };

        if send_remote {
            player.send_message(&self.options.update_available_message);
        }
        if send_file {
            player.send_message(&self.options.installed_notification());
        }
    }
}
