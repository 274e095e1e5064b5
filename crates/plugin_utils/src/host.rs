//! Host service traits.
//!
//! The utilities never talk to a concrete server. Everything they need from
//! the host (permission checks, messaging, scheduling and the player join
//! notification) goes through the traits in this module, so any server that
//! can provide these services can embed the library.
//!
//! ## Threading contract
//!
//! The host has a single *main context* that owns player state. Messaging
//! calls (`Player::send_message`, `Host::broadcast`) must only be made from
//! it. Blocking or slow work is submitted with [`Scheduler::run_async`] and
//! its continuation is marshaled back with [`Scheduler::run_sync`].

use crate::types::{PlayerId, TaskId};
use futures::future::BoxFuture;
use std::sync::Arc;

/// One-shot callback executed on the main context.
pub type SyncTask = Box<dyn FnOnce() + Send + 'static>;

/// Callback fired on every period of a repeating task.
pub type RepeatingTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Work submitted to the worker context.
pub type AsyncTask = BoxFuture<'static, ()>;

/// Handler invoked on the main context when a player joins.
pub type JoinHandler = Arc<dyn Fn(&dyn Player) + Send + Sync + 'static>;

/// A connected player as seen by the plugin.
pub trait Player: Send + Sync {
    /// Stable identity of the player.
    fn id(&self) -> PlayerId;

    /// Display name.
    fn name(&self) -> &str;

    /// Whether the player holds the given permission node.
    fn has_permission(&self, permission: &str) -> bool;

    /// Sends a chat message to the player. Main context only.
    fn send_message(&self, message: &str);
}

/// Task submission with a serialized main context and a worker context.
pub trait Scheduler: Send + Sync {
    /// Runs `task` on the main context after `delay` ticks, then every
    /// `period` ticks until cancelled.
    fn schedule_sync_repeating(&self, delay: u64, period: u64, task: RepeatingTask) -> TaskId;

    /// Queues `task` to run once on the main context.
    fn run_sync(&self, task: SyncTask);

    /// Runs `task` off the main context.
    fn run_async(&self, task: AsyncTask);

    /// Cancels a repeating task. Unknown ids are ignored.
    fn cancel_task(&self, id: TaskId);
}

/// Subscription side of the host event bus.
pub trait EventBus: Send + Sync {
    /// Registers a handler for player session joins.
    fn on_player_join(&self, handler: JoinHandler);
}

/// Services the host provides to an embedded plugin.
pub trait Host: Send + Sync + 'static {
    /// The host scheduler.
    fn scheduler(&self) -> Arc<dyn Scheduler>;

    /// The host event bus.
    fn events(&self) -> Arc<dyn EventBus>;

    /// Sends `message` to every online player holding `permission`.
    /// Returns the number of recipients.
    fn broadcast(&self, message: &str, permission: &str) -> usize;
}
