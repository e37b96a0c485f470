//! Point-in-time connection health snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of the streaming session at one instant
///
/// Produced fresh on every poll and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// A connection handle exists and reports `CONNECTED`
    pub connected: bool,
    /// The gateway is connected to the broker backend
    pub connected_to_broker: bool,
    /// Terminal state has been synchronized to the gateway
    pub synchronized: bool,
    /// When the snapshot was taken
    pub observed_at: DateTime<Utc>,
}

impl HealthStatus {
    /// Snapshot for a session with no connection handle
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            connected_to_broker: false,
            synchronized: false,
            observed_at: Utc::now(),
        }
    }

    /// Connected and synchronized
    pub fn is_healthy(&self) -> bool {
        self.connected && self.synchronized
    }
}
