//! Session lifecycle state.
//!
//! [`LifecycleState`] tracks where the bring-up sequence currently stands.
//! The state only advances forward or drops into [`Failed`]; it never
//! reverts from `Failed` within a session. Teardown ends the session and
//! resets the cell to `Uninitialized` so the host can start a fresh one.
//!
//! The cell is written exclusively by the engine context; any thread may
//! read it.
//!
//! [`Failed`]: LifecycleState::Failed

use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

use crate::engine::StatusCode;

/// Where the session currently stands in the bring-up sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// No bring-up has been requested yet (or the session was torn down).
    Uninitialized,

    /// Engine init is in flight.
    EngineInitializing,

    /// Engine init succeeded.
    EngineReady,

    /// Tracker registration is in flight.
    TrackersInitializing,

    /// All requested trackers that will register have registered.
    TrackersReady,

    /// Camera start is in flight.
    CameraStarting,

    /// The camera is running; the session is fully operational.
    CameraRunning,

    /// A bring-up stage failed with the given engine status. Terminal for
    /// the session; only teardown leaves this state.
    Failed(StatusCode),
}

impl LifecycleState {
    /// Returns true if the session has failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure status, if the session has failed.
    pub fn failure_code(&self) -> Option<StatusCode> {
        match self {
            Self::Failed(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the camera is running.
    pub fn is_camera_running(&self) -> bool {
        matches!(self, Self::CameraRunning)
    }

    /// Position in the forward bring-up order, for progress comparisons.
    /// `Failed` is not part of the forward order.
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Uninitialized => Some(0),
            Self::EngineInitializing => Some(1),
            Self::EngineReady => Some(2),
            Self::TrackersInitializing => Some(3),
            Self::TrackersReady => Some(4),
            Self::CameraStarting => Some(5),
            Self::CameraRunning => Some(6),
            Self::Failed(_) => None,
        }
    }

    /// Returns true if this state is at or past `other` in the forward
    /// bring-up order. `Failed` compares past nothing.
    pub fn has_reached(&self, other: LifecycleState) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::EngineInitializing => write!(f, "EngineInitializing"),
            Self::EngineReady => write!(f, "EngineReady"),
            Self::TrackersInitializing => write!(f, "TrackersInitializing"),
            Self::TrackersReady => write!(f, "TrackersReady"),
            Self::CameraStarting => write!(f, "CameraStarting"),
            Self::CameraRunning => write!(f, "CameraRunning"),
            Self::Failed(code) => write!(f, "Failed({})", code),
        }
    }
}

/// Shared lifecycle state cell.
///
/// Readable from any thread; written only by the engine context. The cell
/// itself does not drive transitions, it records them.
#[derive(Debug)]
pub struct StateCell {
    inner: RwLock<LifecycleState>,
}

impl StateCell {
    /// Creates a cell in `Uninitialized`.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LifecycleState::Uninitialized),
        }
    }

    /// Returns the current state.
    pub fn get(&self) -> LifecycleState {
        *self.inner.read()
    }

    /// Records a transition. Engine context only.
    pub(crate) fn set(&self, next: LifecycleState) {
        let mut guard = self.inner.write();
        debug!(from = %*guard, to = %next, "lifecycle transition");
        debug_assert!(
            !guard.is_failed() || next.is_failed(),
            "state must not leave Failed without a teardown"
        );
        *guard = next;
    }

    /// Resets to `Uninitialized` at the end of teardown, starting a fresh
    /// session. Engine context only.
    pub(crate) fn reset(&self) {
        let mut guard = self.inner.write();
        debug!(from = %*guard, "lifecycle reset");
        *guard = LifecycleState::Uninitialized;
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
