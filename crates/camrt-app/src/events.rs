//! Lifecycle events broadcast to subscribers

use camrt_core::LifecyclePhase;
use serde::Serialize;

/// Capacity of the lifecycle broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something observable happened to the lifecycle
///
/// Events are sent while the lifecycle lock is held, so every subscriber sees
/// them in transition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    PhaseChanged {
        epoch: u64,
        from: LifecyclePhase,
        to: LifecyclePhase,
    },

    InitializationFailed { epoch: u64, reason: String },

    /// A collaborator failed to release during teardown (teardown continued)
    ReleaseFailed { epoch: u64, reason: String },
}

impl LifecycleEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::InitializationFailed { .. } => "initialization_failed",
            Self::ReleaseFailed { .. } => "release_failed",
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            Self::PhaseChanged { epoch, .. }
            | Self::InitializationFailed { epoch, .. }
            | Self::ReleaseFailed { epoch, .. } => *epoch,
        }
    }
}
