//! Shared cross-client state types.

use serde::Serialize;

/// Unified sync state published by the sync engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Offline,
    Idle,
    Syncing,
    Synced,
    Error,
}

impl SyncState {
    /// Whether a reconciliation cycle has just finished (successfully or not).
    pub const fn is_cycle_end(self) -> bool {
        matches!(self, Self::Synced | Self::Error)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Offline => "offline",
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}
