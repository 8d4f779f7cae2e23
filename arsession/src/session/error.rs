//! Session error types.

use std::fmt;

use crate::engine::{StatusCode, TrackerKind};
use crate::paths::PathError;
use crate::session::state::LifecycleState;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// A stage of the bring-up sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BringUpStage {
    /// Engine initialization.
    EngineInit,

    /// Registration of one tracker kind.
    Tracker(TrackerKind),

    /// Camera device start.
    CameraStart,
}

impl fmt::Display for BringUpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineInit => write!(f, "engine init"),
            Self::Tracker(kind) => write!(f, "{} tracker registration", kind),
            Self::CameraStart => write!(f, "camera start"),
        }
    }
}

/// Errors that can occur on the session control surface.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionError {
    /// The operation is not permitted in the current lifecycle state.
    InvalidState {
        /// The operation that was requested.
        operation: &'static str,
        /// The state the session was in.
        state: LifecycleState,
    },

    /// A bring-up stage reported failure.
    EngineStage {
        /// The stage that failed.
        stage: BringUpStage,
        /// Raw engine status.
        code: StatusCode,
    },

    /// The session is no longer accepting operations: a fatal stage failure
    /// occurred (`code` carries the engine status), or teardown has begun
    /// (`code` is `None`).
    SessionFailed {
        /// Engine status of the fatal failure, if any.
        code: Option<StatusCode>,
    },

    /// The engine rejected a live configuration change. The previous value
    /// remains in effect.
    ConfigurationRejected {
        /// The setting that was being changed.
        change: &'static str,
        /// Raw engine status.
        code: StatusCode,
    },

    /// The cache directory path was rejected.
    CacheDirectory(PathError),

    /// The engine context has shut down and can no longer accept work.
    Terminated,
}

impl SessionError {
    /// Error for an operation submitted after a fatal stage failure.
    pub fn failed(code: StatusCode) -> Self {
        Self::SessionFailed { code: Some(code) }
    }

    /// Error for an operation submitted after teardown began.
    pub fn closed() -> Self {
        Self::SessionFailed { code: None }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { operation, state } => {
                write!(f, "{} is not permitted in state {}", operation, state)
            }
            Self::EngineStage { stage, code } => {
                write!(f, "{} failed with engine status {}", stage, code)
            }
            Self::SessionFailed { code: Some(code) } => {
                write!(f, "session failed with engine status {}", code)
            }
            Self::SessionFailed { code: None } => {
                write!(f, "session closed by teardown")
            }
            Self::ConfigurationRejected { change, code } => {
                write!(
                    f,
                    "engine rejected {} change with status {}",
                    change, code
                )
            }
            Self::CacheDirectory(e) => {
                write!(f, "cache directory rejected: {}", e)
            }
            Self::Terminated => write!(f, "engine context has shut down"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CacheDirectory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PathError> for SessionError {
    fn from(e: PathError) -> Self {
        Self::CacheDirectory(e)
    }
}
