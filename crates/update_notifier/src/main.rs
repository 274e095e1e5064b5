//! Standalone update notifier
//!
//! Runs the plugin utilities' update notifier outside a game server: loads
//! the configuration, drives the tick scheduler and logs every notification.

mod cli;
mod config;
mod console;
mod logging;
mod signals;

use anyhow::{Context, Result};
use cli::CliArgs;
use config::AppConfig;
use console::ConsoleHost;
use plugin_utils::{RemoteUpdateChecker, TickScheduler, UtilPlugin, VersionSource};
use std::sync::Arc;
use tracing::{error, info};

/// The configured service, ready to run.
struct Application {
    config: AppConfig,
    checker: Arc<RemoteUpdateChecker>,
}

impl Application {
    async fn new(args: &CliArgs) -> Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = &args.log_level {
            config.logging.level = log_level.clone();
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        config
            .validate()
            .context("Configuration validation failed")?;
        logging::setup_logging(&config.logging)?;

        let checker = RemoteUpdateChecker::with_base_url(&config.remote.base_url, config.request_timeout())?;

        info!(
            "Config: {} | API: {}",
            args.config_path.display(),
            config.remote.base_url
        );
        Ok(Self {
            config,
            checker: Arc::new(checker),
        })
    }

    /// Performs a single check and prints the outcome.
    async fn check_once(self) -> Result<()> {
        let descriptor = self.config.to_descriptor()?;
        let slug = descriptor.update_slug();

        match self.checker.update_check(&slug, &descriptor.version).await {
            Some(callback) if callback.is_update() => {
                println!(
                    "{} {} -> {} available",
                    descriptor.name,
                    descriptor.version,
                    callback.version().version()
                );
            }
            Some(_) => {
                println!("{} {} is up to date", descriptor.name, descriptor.version);
            }
            None => {
                println!("No update data for slug '{}'", slug);
            }
        }
        Ok(())
    }

    /// Runs the notifier until a shutdown signal arrives.
    async fn run(self) -> Result<()> {
        let scheduler = Arc::new(TickScheduler::try_current()?);
        let host = Arc::new(ConsoleHost::new(scheduler.clone()));

        let descriptor = self.config.to_descriptor()?;
        let mut plugin = UtilPlugin::new(descriptor, self.config.data_folder(), host.clone())?;
        plugin.initialize_resources_with(self.checker.clone())?;

        info!(
            "Watching {} (slug '{}'), tick every {:?}",
            plugin.descriptor().full_name(),
            plugin.descriptor().update_slug(),
            self.config.tick_interval()
        );

        let shutdown = async {
            if let Err(e) = signals::wait_for_shutdown_signal().await {
                error!("Signal handling failed: {}", e);
            }
        };
        scheduler.run(self.config.tick_interval(), shutdown).await;

        if let Some(notifier) = plugin.notifier() {
            notifier.shutdown();
        }
        scheduler.wait_for_workers().await;
        if let Err(e) = plugin.save_utils_file() {
            error!("Failed to save utility data file: {}", e);
        }

        info!(
            "Stopped after {} ticks and {} broadcasts",
            scheduler.current_tick(),
            host.broadcast_count()
        );
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let app = Application::new(&args).await?;

    if args.once {
        app.check_once().await
    } else {
        app.run().await
    }
}
