//! The engine context: a daemon task that owns the engine and executes all
//! engine-mutating operations one at a time, in submission order.
//!
//! The native engine is not safe for concurrent invocation, so every call
//! into it funnels through this loop. Commands arrive on an mpsc channel;
//! each command runs to completion (including its reply) before the next
//! one is taken, which gives the FIFO and no-interleaving guarantees the
//! control surface promises. A command may await the engine internally;
//! the loop suspends cooperatively, it never blocks a thread.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SessionDriver                          │
//! │                                                              │
//! │  Command ──► ┌───────────┐                                   │
//! │   channel    │ BeginInit │──► init ──► trackers ──► camera   │
//! │              ├───────────┤    (stage-boundary cancel checks) │
//! │              │   Apply   │──► buffer, or apply to engine     │
//! │              ├───────────┤                                   │
//! │              │   Exec    │──► arbitrary ordered operation    │
//! │              ├───────────┤                                   │
//! │              │ Teardown  │──► release in reverse order       │
//! │              └───────────┘                                   │
//! │                    │                                         │
//! │                    └──emit──► Notifier (dispatch task)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CameraChange, CameraConfig, SessionConfig, TrackerFailurePolicy};
use crate::engine::{Engine, StatusCode, TrackerHandle, TrackerKind, STATUS_OK};
use crate::events::{Notifier, SessionEvent};
use crate::session::error::{BringUpStage, SessionError, SessionResult};
use crate::session::state::{LifecycleState, StateCell};

// =============================================================================
// Commands
// =============================================================================

/// An arbitrary operation executed exclusively on the engine context.
pub(crate) type EngineOp = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Commands the facade sends to the engine context.
pub(crate) enum Command {
    /// Run the bring-up sequence.
    BeginInit {
        reply: oneshot::Sender<SessionResult<()>>,
    },

    /// Buffer or apply a camera setting change.
    Apply { change: CameraChange },

    /// Run an arbitrary operation in queue order.
    Exec {
        op: EngineOp,
        reply: oneshot::Sender<SessionResult<()>>,
    },

    /// Release all resources and end the session.
    Teardown { reply: oneshot::Sender<()> },
}

// =============================================================================
// Tracker Registry
// =============================================================================

/// Tracker handles owned by the session, in acquisition order.
#[derive(Debug, Default)]
pub(crate) struct TrackerRegistry {
    entries: Vec<(TrackerKind, TrackerHandle)>,
}

impl TrackerRegistry {
    /// Records a registered tracker. A kind already present is left as is.
    pub(crate) fn insert(&mut self, kind: TrackerKind, handle: TrackerHandle) {
        if !self.contains(kind) {
            self.entries.push((kind, handle));
        }
    }

    /// Returns true if a tracker of this kind is registered.
    pub(crate) fn contains(&self, kind: TrackerKind) -> bool {
        self.entries.iter().any(|(k, _)| *k == kind)
    }

    /// Returns the number of registered trackers.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no trackers are registered.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all entries in reverse acquisition order.
    pub(crate) fn drain_reverse(&mut self) -> Vec<(TrackerKind, TrackerHandle)> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries
    }
}

// =============================================================================
// Session Driver
// =============================================================================

/// Owns the engine and runs the engine context loop.
pub(crate) struct SessionDriver<E: Engine> {
    engine: E,
    config: SessionConfig,
    state: Arc<StateCell>,
    camera: Arc<Mutex<CameraConfig>>,
    cache_dir: Arc<Mutex<Option<PathBuf>>>,
    cancel: Arc<Mutex<CancellationToken>>,
    notifier: Notifier,
    rx: mpsc::UnboundedReceiver<Command>,
    registry: TrackerRegistry,
    engine_initialized: bool,
    camera_active: bool,
    muted: bool,
}

impl<E: Engine> SessionDriver<E> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        engine: E,
        config: SessionConfig,
        state: Arc<StateCell>,
        camera: Arc<Mutex<CameraConfig>>,
        cache_dir: Arc<Mutex<Option<PathBuf>>>,
        cancel: Arc<Mutex<CancellationToken>>,
        notifier: Notifier,
        rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            engine,
            config,
            state,
            camera,
            cache_dir,
            cancel,
            notifier,
            rx,
            registry: TrackerRegistry::default(),
            engine_initialized: false,
            camera_active: false,
            muted: false,
        }
    }

    /// Runs the engine context until every facade handle is dropped, then
    /// releases any resources still held.
    pub(crate) async fn run(mut self) {
        info!("engine context started");

        while let Some(command) = self.rx.recv().await {
            let closing = self.teardown_requested();
            match command {
                Command::BeginInit { reply } => {
                    if closing {
                        let _ = reply.send(Err(SessionError::closed()));
                        continue;
                    }
                    self.handle_begin(reply).await;
                }
                Command::Apply { change } => {
                    if closing {
                        debug!(
                            change = change.label(),
                            "configuration change dropped: teardown in progress"
                        );
                        continue;
                    }
                    self.handle_apply(change).await;
                }
                Command::Exec { op, reply } => {
                    if closing {
                        let _ = reply.send(Err(SessionError::closed()));
                        continue;
                    }
                    self.handle_exec(op, reply).await;
                }
                Command::Teardown { reply } => {
                    self.handle_teardown().await;
                    let _ = reply.send(());
                }
            }
        }

        // Facade dropped without an explicit teardown; release everything.
        self.handle_teardown().await;
        info!("engine context stopped");
    }

    fn teardown_requested(&self) -> bool {
        self.cancel.lock().is_cancelled()
    }

    /// Emits an event unless the session is past its reporting window:
    /// once teardown is requested, no further events are delivered.
    fn emit(&self, event: SessionEvent) {
        if !self.muted && !self.teardown_requested() {
            self.notifier.emit(event);
        }
    }

    // -------------------------------------------------------------------------
    // Bring-up
    // -------------------------------------------------------------------------

    async fn handle_begin(&mut self, reply: oneshot::Sender<SessionResult<()>>) {
        let state = self.state.get();
        if state != LifecycleState::Uninitialized {
            warn!(%state, "begin_initialization rejected");
            let _ = reply.send(Err(SessionError::InvalidState {
                operation: "begin_initialization",
                state,
            }));
            return;
        }

        self.muted = false;
        self.state.set(LifecycleState::EngineInitializing);
        let _ = reply.send(Ok(()));

        self.bring_up().await;
    }

    async fn bring_up(&mut self) {
        // Stage 1: engine init
        let cache_dir = self.cache_dir.lock().clone();
        if let Some(dir) = &cache_dir {
            debug!(
                path = %crate::paths::file_system_escaped(dir),
                "engine data directory"
            );
        }
        info!(flags = ?self.config.init_flags, "engine init");
        let code = self.engine.init(self.config.init_flags, cache_dir).await;
        if code != STATUS_OK {
            self.fail(BringUpStage::EngineInit, code);
            return;
        }
        self.engine_initialized = true;
        self.state.set(LifecycleState::EngineReady);
        self.emit(SessionEvent::Initialized);

        if self.halt_between_stages("engine init") {
            return;
        }

        // Stage 2: tracker registration
        if !self.register_trackers().await {
            return;
        }

        if self.halt_between_stages("tracker registration") {
            return;
        }

        // Stage 3: camera start
        self.state.set(LifecycleState::CameraStarting);
        let snapshot = *self.camera.lock();
        info!(video_mode = %snapshot.video_mode, "camera start");
        let code = self.engine.start_camera(snapshot).await;
        if code != STATUS_OK {
            self.fail(BringUpStage::CameraStart, code);
            return;
        }
        self.camera_active = true;
        let camera_info = self.engine.camera_info();
        self.state.set(LifecycleState::CameraRunning);
        info!(
            width = camera_info.width,
            height = camera_info.height,
            "camera running"
        );
        self.emit(SessionEvent::CameraStarted(camera_info));
    }

    /// Registers the requested tracker kinds. Returns false if bring-up
    /// must halt (fatal failure or teardown).
    async fn register_trackers(&mut self) -> bool {
        if self.config.trackers.is_empty() {
            self.state.set(LifecycleState::TrackersReady);
            return true;
        }

        self.state.set(LifecycleState::TrackersInitializing);

        let mut last_failure = None;
        for kind in self.config.trackers.clone() {
            if self.teardown_requested() {
                info!(tracker = %kind, "tracker registration skipped: teardown requested");
                return false;
            }
            if self.registry.contains(kind) {
                continue;
            }

            match self.engine.register_tracker(kind).await {
                Ok(handle) => {
                    debug!(tracker = %kind, handle = handle.raw(), "tracker registered");
                    self.registry.insert(kind, handle);
                    self.emit(SessionEvent::TrackerInitialized(kind));
                }
                Err(code) => match self.config.tracker_failure_policy {
                    TrackerFailurePolicy::FailFast => {
                        self.fail(BringUpStage::Tracker(kind), code);
                        return false;
                    }
                    TrackerFailurePolicy::ContinueOnError => {
                        warn!(tracker = %kind, code, "tracker registration failed, continuing");
                        self.emit(SessionEvent::Error(SessionError::EngineStage {
                            stage: BringUpStage::Tracker(kind),
                            code,
                        }));
                        last_failure = Some((kind, code));
                    }
                },
            }
        }

        if self.registry.is_empty() {
            if let Some((kind, code)) = last_failure {
                self.fail(BringUpStage::Tracker(kind), code);
                return false;
            }
        }

        self.state.set(LifecycleState::TrackersReady);
        true
    }

    /// Marks the session failed and reports it. Terminal for the session.
    fn fail(&mut self, stage: BringUpStage, code: StatusCode) {
        error!(stage = %stage, code, "bring-up failed");
        self.state.set(LifecycleState::Failed(code));
        self.emit(SessionEvent::InitializationFailed(code));
    }

    /// Stage-boundary cancellation check. Teardown never interrupts an
    /// in-flight stage; it takes effect here, between stages.
    fn halt_between_stages(&self, after: &str) -> bool {
        if self.teardown_requested() {
            info!(after, "bring-up halted: teardown requested");
            return true;
        }
        false
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    async fn handle_apply(&mut self, change: CameraChange) {
        match self.state.get() {
            LifecycleState::Failed(code) => {
                warn!(
                    change = change.label(),
                    code, "configuration change rejected: session failed"
                );
                self.emit(SessionEvent::Error(SessionError::failed(code)));
            }
            LifecycleState::CameraRunning => {
                let code = self.engine.apply_setting(change).await;
                if code == STATUS_OK {
                    self.camera.lock().apply(change);
                    debug!(change = change.label(), "camera setting applied");
                } else {
                    // The previous value stays in effect; the session keeps
                    // running.
                    warn!(change = change.label(), code, "engine rejected camera setting");
                    self.emit(SessionEvent::Error(SessionError::ConfigurationRejected {
                        change: change.label(),
                        code,
                    }));
                }
            }
            _ => {
                // Camera not running yet: buffer for the start-time snapshot.
                self.camera.lock().apply(change);
                debug!(change = change.label(), "camera setting buffered");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Arbitrary operations
    // -------------------------------------------------------------------------

    async fn handle_exec(&mut self, op: EngineOp, reply: oneshot::Sender<SessionResult<()>>) {
        if let LifecycleState::Failed(code) = self.state.get() {
            let _ = reply.send(Err(SessionError::failed(code)));
            return;
        }
        op().await;
        let _ = reply.send(Ok(()));
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    async fn handle_teardown(&mut self) {
        self.muted = true;

        if !self.engine_initialized && self.registry.is_empty() && !self.camera_active {
            debug!("teardown: nothing to release");
        } else {
            info!("teardown: releasing session resources");

            // Release in reverse acquisition order: camera, trackers, engine.
            if self.camera_active {
                self.engine.stop_camera();
                self.camera_active = false;
            }
            for (kind, handle) in self.registry.drain_reverse() {
                debug!(tracker = %kind, handle = handle.raw(), "tracker released");
                self.engine.release_tracker(handle);
            }
            if self.engine_initialized {
                self.engine.shutdown();
                self.engine_initialized = false;
            }
        }

        self.state.reset();

        // Arm a fresh token so the next session can begin.
        *self.cancel.lock() = CancellationToken::new();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: u64) -> TrackerHandle {
        TrackerHandle::new(raw)
    }

    #[test]
    fn test_registry_insert_and_contains() {
        let mut registry = TrackerRegistry::default();
        assert!(registry.is_empty());

        registry.insert(TrackerKind::Image, handle(1));
        assert!(registry.contains(TrackerKind::Image));
        assert!(!registry.contains(TrackerKind::Marker));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_ignores_duplicate_kind() {
        let mut registry = TrackerRegistry::default();
        registry.insert(TrackerKind::Image, handle(1));
        registry.insert(TrackerKind::Image, handle(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_drains_in_reverse_order() {
        let mut registry = TrackerRegistry::default();
        registry.insert(TrackerKind::Image, handle(1));
        registry.insert(TrackerKind::Marker, handle(2));

        let drained = registry.drain_reverse();
        assert_eq!(
            drained,
            vec![
                (TrackerKind::Marker, handle(2)),
                (TrackerKind::Image, handle(1)),
            ]
        );
        assert!(registry.is_empty());
    }
}
