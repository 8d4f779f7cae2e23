//! The session's notification contract.
//!
//! The session reports bring-up progress and runtime errors through a
//! [`SessionObserver`] the host registers. Delivery happens on a dedicated
//! notification dispatch task, never on the engine context or an I/O
//! worker, so observer callbacks can safely touch host state that expects
//! a predictable execution context.
//!
//! The observer is held weakly: the session never keeps the host alive,
//! and events that fire while no observer is registered (or after the host
//! dropped it) are discarded, not queued.
//!
//! # Architecture
//!
//! ```text
//! engine context ──emit──► event channel ──► dispatch task ──► observer
//!                                              (weak upgrade      (host)
//!                                               under guard)
//! ```

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{CameraInfo, StatusCode, TrackerKind};
use crate::session::SessionError;

// =============================================================================
// Observer
// =============================================================================

/// Callback surface the host implements to receive session events.
///
/// All methods have empty default bodies so hosts only implement the events
/// they care about. Methods are invoked on the notification dispatch task.
pub trait SessionObserver: Send + Sync {
    /// Engine init succeeded; the session reached `EngineReady`.
    fn initialized(&self) {}

    /// A bring-up stage failed. Terminal for the session; fired at most
    /// once. `code` is the raw engine status.
    fn initialization_failed(&self, _code: StatusCode) {}

    /// The image tracker registered successfully.
    fn image_tracker_initialized(&self) {}

    /// The marker tracker registered successfully.
    fn marker_tracker_initialized(&self) {}

    /// The camera started; the session reached `CameraRunning`. `info`
    /// carries the camera parameters gathered at start time.
    fn camera_started(&self, _info: &CameraInfo) {}

    /// A non-fatal runtime error, such as the engine rejecting a live
    /// configuration change. The session remains operational.
    fn session_error(&self, _error: &SessionError) {}
}

// =============================================================================
// Events
// =============================================================================

/// An event traveling from the engine context to the dispatch task.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Engine init succeeded.
    Initialized,

    /// A bring-up stage failed with the given engine status.
    InitializationFailed(StatusCode),

    /// A tracker of the given kind registered successfully.
    TrackerInitialized(TrackerKind),

    /// The camera started with the given parameters.
    CameraStarted(CameraInfo),

    /// A non-fatal runtime error.
    Error(SessionError),
}

// =============================================================================
// Notifier
// =============================================================================

type ObserverSlot = Arc<RwLock<Option<Weak<dyn SessionObserver>>>>;

/// Hands events from the engine context to the registered observer.
///
/// Cloneable; the session facade holds one clone for observer registration
/// and the engine context holds another for emission. The dispatch task
/// runs until every clone is dropped.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<SessionEvent>,
    slot: ObserverSlot,
}

impl Notifier {
    /// Creates a notifier and spawns its dispatch task.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
        let slot: ObserverSlot = Arc::new(RwLock::new(None));

        let dispatch_slot = Arc::clone(&slot);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // Upgrade under the guard, deliver on the strong reference.
                let observer = dispatch_slot
                    .read()
                    .as_ref()
                    .and_then(Weak::upgrade);

                match observer {
                    Some(observer) => deliver(observer.as_ref(), &event),
                    None => debug!(event = ?event, "no observer registered, event dropped"),
                }
            }
        });

        Self { tx, slot }
    }

    /// Registers the observer, replacing any previous registration. Only a
    /// weak reference is kept.
    pub(crate) fn attach(&self, observer: Weak<dyn SessionObserver>) {
        *self.slot.write() = Some(observer);
    }

    /// Removes the observer registration.
    pub(crate) fn detach(&self) {
        *self.slot.write() = None;
    }

    /// Queues an event for delivery.
    pub(crate) fn emit(&self, event: SessionEvent) {
        // Send only fails when the dispatch task is gone, which means the
        // whole session is going away with it.
        let _ = self.tx.send(event);
    }
}

fn deliver(observer: &dyn SessionObserver, event: &SessionEvent) {
    match event {
        SessionEvent::Initialized => observer.initialized(),
        SessionEvent::InitializationFailed(code) => observer.initialization_failed(*code),
        SessionEvent::TrackerInitialized(TrackerKind::Image) => {
            observer.image_tracker_initialized()
        }
        SessionEvent::TrackerInitialized(TrackerKind::Marker) => {
            observer.marker_tracker_initialized()
        }
        SessionEvent::CameraStarted(info) => observer.camera_started(info),
        SessionEvent::Error(error) => observer.session_error(error),
    }
}

// =============================================================================
// Tests
// =============================================================================
