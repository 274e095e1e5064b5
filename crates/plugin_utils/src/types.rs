//! Small identifier types shared by every module.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host clock rate. Scheduling intervals are expressed in ticks.
pub const TICKS_PER_SECOND: u64 = 20;

/// Default number of ticks between two remote update checks (twice a day).
pub const DEFAULT_TICKS_BETWEEN_UPDATE_CHECKS: u64 = 864_000;

/// Unique identifier for a player known to the host.
///
/// This is a wrapper around UUID that keeps player ids from being confused
/// with other identifiers, and is what the notifier records once a player
/// has been told about an update.
///
/// # Examples
///
/// ```rust
/// use plugin_utils::PlayerId;
///
/// let player_id = PlayerId::from_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
/// println!("Player ID: {}", player_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a player ID from a string representation.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by the scheduler for a repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Converts a tick count into wall-clock time at the host clock rate.
pub fn ticks_to_duration(ticks: u64) -> std::time::Duration {
    std::time::Duration::from_millis(ticks * 1000 / TICKS_PER_SECOND)
}
