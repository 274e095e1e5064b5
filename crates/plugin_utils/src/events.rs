//! Callback registry for host player events.

use crate::host::{EventBus, JoinHandler, Player};
use std::sync::RwLock;
use tracing::debug;

/// In-process [`EventBus`] that hosts feed with [`PlayerEvents::emit_player_join`].
#[derive(Default)]
pub struct PlayerEvents {
    join_handlers: RwLock<Vec<JoinHandler>>,
}

impl PlayerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches a join to every registered handler, in registration order.
    ///
    /// Must be called from the main context.
    pub fn emit_player_join(&self, player: &dyn Player) {
        // Clone the list so handlers may register further handlers.
        let handlers: Vec<JoinHandler> = self
            .join_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        debug!(
            "Dispatching join of {} ({}) to {} handlers",
            player.name(),
            player.id(),
            handlers.len()
        );
        for handler in handlers {
            handler(player);
        }
    }

    /// Number of registered join handlers.
    pub fn handler_count(&self) -> usize {
        self.join_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl EventBus for PlayerEvents {
    fn on_player_join(&self, handler: JoinHandler) {
        self.join_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }
}
