//! Host implementation for running without a game server.
//!
//! There are no players: broadcasts go to the log, where the operator
//! running the service reads them.

use plugin_utils::{EventBus, Host, PlayerEvents, Scheduler, TickScheduler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

pub struct ConsoleHost {
    scheduler: Arc<TickScheduler>,
    events: Arc<PlayerEvents>,
    broadcasts: AtomicUsize,
}

impl ConsoleHost {
    pub fn new(scheduler: Arc<TickScheduler>) -> Self {
        Self {
            scheduler,
            events: Arc::new(PlayerEvents::new()),
            broadcasts: AtomicUsize::new(0),
        }
    }

    /// Number of broadcasts written so far.
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

impl Host for ConsoleHost {
    fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    fn events(&self) -> Arc<dyn EventBus> {
        self.events.clone()
    }

    fn broadcast(&self, message: &str, permission: &str) -> usize {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        info!(permission = permission, "[broadcast] {}", message);
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_console() {
        let host = ConsoleHost::new(Arc::new(TickScheduler::try_current().unwrap()));

        assert_eq!(host.broadcast("hello", "any.permission"), 1);
        assert_eq!(host.broadcast_count(), 1);
    }
}
