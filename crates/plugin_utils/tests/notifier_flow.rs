//! End-to-end tests for update notifications
//!
//! These tests drive a `UtilPlugin` through the reference `TickScheduler`
//! with an in-memory host and a canned version source, covering local
//! redeploy detection, remote update polling and late join delivery.

use async_trait::async_trait;
use plugin_utils::notifier::LAST_VERSION_KEY;
use plugin_utils::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

const ALERT_PERMISSION: &str = "shops.update";

struct TestPlayer {
    id: PlayerId,
    name: String,
    permissions: HashSet<String>,
    inbox: Mutex<Vec<String>>,
}

impl TestPlayer {
    fn new(name: &str, permissions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: PlayerId::new(),
            name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            inbox: Mutex::new(Vec::new()),
        })
    }

    fn inbox(&self) -> Vec<String> {
        self.inbox.lock().unwrap().clone()
    }
}

impl Player for TestPlayer {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    fn send_message(&self, message: &str) {
        self.inbox.lock().unwrap().push(message.to_string());
    }
}

struct TestHost {
    scheduler: Arc<TickScheduler>,
    events: Arc<PlayerEvents>,
    online: Mutex<Vec<Arc<TestPlayer>>>,
    broadcasts: Mutex<Vec<String>>,
}

impl TestHost {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            scheduler: Arc::new(TickScheduler::try_current().unwrap()),
            events: Arc::new(PlayerEvents::new()),
            online: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
        })
    }

    fn join(&self, player: &Arc<TestPlayer>) {
        self.online.lock().unwrap().push(player.clone());
        self.events.emit_player_join(player.as_ref());
    }

    fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Runs one tick, lets workers finish, then runs another tick so their
    /// continuations land.
    async fn cycle(&self) {
        self.scheduler.tick();
        self.scheduler.wait_for_workers().await;
        self.scheduler.tick();
    }
}

impl Host for TestHost {
    fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    fn events(&self) -> Arc<dyn EventBus> {
        self.events.clone()
    }

    fn broadcast(&self, message: &str, permission: &str) -> usize {
        self.broadcasts.lock().unwrap().push(message.to_string());
        let online = self.online.lock().unwrap().clone();
        let mut sent = 0;
        for player in online.iter().filter(|p| p.has_permission(permission)) {
            player.send_message(message);
            sent += 1;
        }
        sent
    }
}

struct CannedSource {
    set: Option<VersionSet>,
    calls: AtomicUsize,
}

impl CannedSource {
    fn release(version: &str) -> Arc<Self> {
        Arc::new(Self {
            set: Some(VersionSet::from_versions(vec![PluginVersion::new(
                version,
                ReleaseChannel::Release,
            )])),
            calls: AtomicUsize::new(0),
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            set: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionSource for CannedSource {
    async fn version_data(&self, _slug: &str) -> Option<VersionSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.set.clone()
    }
}

fn descriptor(version: &str) -> PluginDescriptor {
    let mut descriptor = PluginDescriptor::new("Shops", version);
    descriptor.utils.update.permission_node = Some(ALERT_PERMISSION.to_string());
    descriptor.utils.update.changelog = Some("Faster checkout.".to_string());
    descriptor
}

fn start(
    host: &Arc<TestHost>,
    data_folder: &Path,
    version: &str,
    source: Arc<CannedSource>,
) -> UtilPlugin {
    let mut plugin = UtilPlugin::new(descriptor(version), data_folder, host.clone()).unwrap();
    plugin.initialize_resources_with(source).unwrap();
    plugin
}

#[tokio::test]
async fn test_first_run_records_version_silently() {
    let dir = tempdir().unwrap();
    let host = TestHost::new();

    let plugin = start(&host, dir.path(), "1.0", CannedSource::unavailable());

    assert!(host.broadcasts().is_empty());
    assert!(!plugin.notifier().unwrap().has_file_update());

    let file = DataFile::load(dir.path().join("PluginUtils").join("data.toml")).unwrap();
    assert_eq!(file.get_str(LAST_VERSION_KEY), Some("1.0"));
}

#[tokio::test]
async fn test_redeploy_broadcasts_installed_message_once() {
    let dir = tempdir().unwrap();

    {
        let host = TestHost::new();
        let _first = start(&host, dir.path(), "1.0", CannedSource::unavailable());
    }

    let host = TestHost::new();
    let plugin = start(&host, dir.path(), "1.1", CannedSource::unavailable());
    let installed = "Shops v1.1 has updated. Here's what changed: Faster checkout.";

    assert_eq!(host.broadcasts(), vec![installed.to_string()]);
    assert!(plugin.notifier().unwrap().has_file_update());

    let file = DataFile::load(dir.path().join("PluginUtils").join("data.toml")).unwrap();
    assert_eq!(file.get_str(LAST_VERSION_KEY), Some("1.1"));

    let admin = TestPlayer::new("admin", &[ALERT_PERMISSION]);
    let guest = TestPlayer::new("guest", &[]);
    host.join(&admin);
    host.join(&admin);
    host.join(&guest);

    assert_eq!(admin.inbox(), vec![installed.to_string()]);
    assert!(guest.inbox().is_empty());
    assert!(plugin.notifier().unwrap().was_notified_of_file_update(admin.id));
    assert!(!plugin.notifier().unwrap().was_notified_of_file_update(guest.id));
}

#[tokio::test]
async fn test_same_version_restart_is_silent() {
    let dir = tempdir().unwrap();

    {
        let host = TestHost::new();
        let _first = start(&host, dir.path(), "1.0", CannedSource::unavailable());
    }

    let host = TestHost::new();
    let plugin = start(&host, dir.path(), "1.0", CannedSource::unavailable());

    assert!(host.broadcasts().is_empty());
    assert!(!plugin.notifier().unwrap().has_file_update());
}

#[tokio::test]
async fn test_remote_update_cancels_polling_and_notifies() {
    let dir = tempdir().unwrap();
    let host = TestHost::new();
    let source = CannedSource::release("1.1");
    let plugin = start(&host, dir.path(), "1.0", source.clone());
    let notifier = plugin.notifier().unwrap();
    assert!(notifier.task_id().is_some());

    let online_admin = TestPlayer::new("online", &[ALERT_PERMISSION]);
    host.join(&online_admin);

    host.cycle().await;

    let available = "There is an update available for Shops v1.0";
    assert!(notifier.is_remote_update());
    assert_eq!(host.broadcasts(), vec![available.to_string()]);
    assert_eq!(online_admin.inbox(), vec![available.to_string()]);
    assert!(notifier.task_id().is_none());
    assert_eq!(host.scheduler.active_tasks(), 0);

    let late_admin = TestPlayer::new("late", &[ALERT_PERMISSION]);
    host.join(&late_admin);
    host.join(&late_admin);
    assert_eq!(late_admin.inbox(), vec![available.to_string()]);
    assert!(notifier.was_notified_of_remote_update(late_admin.id));

    for _ in 0..5 {
        host.cycle().await;
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_up_to_date_keeps_polling() {
    let dir = tempdir().unwrap();
    let host = TestHost::new();
    let source = CannedSource::release("1.0");

    let mut plugin = UtilPlugin::new(descriptor("1.0"), dir.path(), host.clone()).unwrap();
    plugin.options_mut().ticks_between_update_checks = 2;
    plugin.initialize_resources_with(source.clone()).unwrap();

    host.cycle().await; // ticks 1 and 2: first check
    host.cycle().await; // ticks 3 and 4: second check

    assert_eq!(source.calls(), 2);
    assert!(!plugin.notifier().unwrap().is_remote_update());
    assert!(plugin.notifier().unwrap().task_id().is_some());
    assert!(host.broadcasts().is_empty());
}

#[tokio::test]
async fn test_unavailable_api_is_retried_next_interval() {
    let dir = tempdir().unwrap();
    let host = TestHost::new();
    let source = CannedSource::unavailable();

    let mut plugin = UtilPlugin::new(descriptor("1.0"), dir.path(), host.clone()).unwrap();
    plugin.options_mut().ticks_between_update_checks = 1;
    plugin.initialize_resources_with(source.clone()).unwrap();

    host.cycle().await; // check on tick 1, retry on tick 2
    host.scheduler.wait_for_workers().await;

    assert_eq!(source.calls(), 2);
    assert_eq!(host.scheduler.active_tasks(), 1);
}

#[tokio::test]
async fn test_disabled_checks_schedule_nothing() {
    let dir = tempdir().unwrap();
    let host = TestHost::new();
    let source = CannedSource::release("9.9");

    let mut plugin = UtilPlugin::new(descriptor("1.0"), dir.path(), host.clone()).unwrap();
    plugin.options_mut().update_check_enabled = false;
    plugin.initialize_resources_with(source.clone()).unwrap();

    host.cycle().await;

    assert_eq!(host.scheduler.active_tasks(), 0);
    assert!(plugin.notifier().unwrap().task_id().is_none());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_both_notifications_reach_the_same_player() {
    let dir = tempdir().unwrap();

    {
        let host = TestHost::new();
        let _first = start(&host, dir.path(), "0.9", CannedSource::unavailable());
    }

    let host = TestHost::new();
    let _plugin = start(&host, dir.path(), "1.0", CannedSource::release("1.1"));
    host.cycle().await;

    let admin = TestPlayer::new("admin", &[ALERT_PERMISSION]);
    host.join(&admin);
    host.join(&admin);

    assert_eq!(
        admin.inbox(),
        vec![
            "There is an update available for Shops v1.0".to_string(),
            "Shops v1.0 has updated. Here's what changed: Faster checkout.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_file_helpers_require_initialization() {
    let dir = tempdir().unwrap();
    let host = TestHost::new();

    let mut plugin = UtilPlugin::new(descriptor("1.0"), dir.path(), host.clone()).unwrap();
    assert!(matches!(plugin.file("shops.toml"), Err(UtilsError::NotInitialized)));

    plugin
        .initialize_resources_with(CannedSource::unavailable())
        .unwrap();
    let mut shops = plugin.file("shops.toml").unwrap();
    shops.set("count", 3);
    shops.save().unwrap();

    let admin = PlayerId::new();
    let mut player_file = plugin.player_file(admin).unwrap();
    player_file.set("balance", 12);
    player_file.save().unwrap();

    assert!(dir.path().join("shops.toml").exists());
    assert!(dir
        .path()
        .join("player_files")
        .join(format!("{}.toml", admin))
        .exists());
}
