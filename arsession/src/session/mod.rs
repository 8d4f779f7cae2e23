//! Session facade: the thread-safe control surface over the engine context.
//!
//! A [`Session`] owns one engine for its lifetime and brings it up through
//! the fixed sequence engine init → tracker registration → camera start.
//! Configuration calls are accepted from any thread and never block the
//! caller; everything that mutates the engine is forwarded to the engine
//! context (see [`driver`]) where it executes in submission order, one
//! operation at a time. Progress and errors come back through the
//! [`SessionObserver`](crate::events::SessionObserver) the host registers.
//!
//! # Example
//!
//! ```ignore
//! use arsession::{Session, SessionConfig, TrackerKind, VideoMode};
//!
//! let config = SessionConfig::new()
//!     .with_tracker(TrackerKind::Image)
//!     .with_tracker(TrackerKind::Marker);
//!
//! let session = Session::spawn(engine, config);
//! session.set_cache_directory("/tmp/ar-cache")?;
//! session.set_observer(&observer);
//! session.set_video_mode(VideoMode::OptimizeSpeed)?;
//!
//! session.begin_initialization().await?;
//! // ... events arrive on the observer ...
//! session.teardown().await;
//! ```

mod driver;
mod error;
mod state;

pub use error::{BringUpStage, SessionError, SessionResult};
pub use state::LifecycleState;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{
    CameraChange, CameraConfig, FocusMode, SessionConfig, VideoMode, ViewSize, Viewport,
};
use crate::engine::Engine;
use crate::events::{Notifier, SessionObserver};
use crate::paths;
use crate::workers::WorkerPool;

use driver::{Command, EngineOp, SessionDriver};
use state::StateCell;

/// Facade over one engine session.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self` and are safe
/// to call from any thread. Dropping the last handle shuts the engine
/// context down and releases any resources still held, but an explicit
/// [`teardown`](Session::teardown) is the orderly way out.
pub struct Session {
    tx: mpsc::UnboundedSender<Command>,
    state: Arc<StateCell>,
    camera: Arc<Mutex<CameraConfig>>,
    cache_dir: Arc<Mutex<Option<PathBuf>>>,
    cancel: Arc<Mutex<CancellationToken>>,
    notifier: Notifier,
    workers: WorkerPool,
}

impl Session {
    /// Creates a session around `engine` and spawns its engine context.
    ///
    /// Must be called from within a Tokio runtime. The session takes
    /// exclusive ownership of the engine; no other code may call into it
    /// afterwards.
    pub fn spawn<E: Engine>(engine: E, config: SessionConfig) -> Self {
        let worker_capacity = config.worker_capacity;
        let state = Arc::new(StateCell::new());
        let camera = Arc::new(Mutex::new(CameraConfig::default()));
        let cache_dir = Arc::new(Mutex::new(None));
        let cancel = Arc::new(Mutex::new(CancellationToken::new()));
        let notifier = Notifier::spawn();
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = SessionDriver::new(
            engine,
            config,
            Arc::clone(&state),
            Arc::clone(&camera),
            Arc::clone(&cache_dir),
            Arc::clone(&cancel),
            notifier.clone(),
            rx,
        );
        tokio::spawn(driver.run());

        Self {
            tx,
            state,
            camera,
            cache_dir,
            cancel,
            notifier,
            workers: WorkerPool::new(worker_capacity),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Starts the bring-up sequence.
    ///
    /// Resolves once the engine context has accepted the request and the
    /// first stage is underway; stage outcomes arrive on the observer.
    /// Fails with [`SessionError::InvalidState`] unless the session is
    /// `Uninitialized`, in particular when called a second time without an
    /// intervening [`teardown`](Session::teardown).
    pub async fn begin_initialization(&self) -> SessionResult<()> {
        if self.cancel.lock().is_cancelled() {
            return Err(SessionError::closed());
        }
        // Fast-fail here; the engine context re-validates authoritatively.
        let state = self.state.get();
        if state != LifecycleState::Uninitialized {
            return Err(SessionError::InvalidState {
                operation: "begin_initialization",
                state,
            });
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::BeginInit { reply: reply_tx })
            .map_err(|_| SessionError::Terminated)?;
        reply_rx.await.map_err(|_| SessionError::Terminated)?
    }

    /// Tears the session down: waits for any in-flight stage, releases
    /// trackers and engine resources in reverse acquisition order, and
    /// suppresses further events. Idempotent. Afterwards the session is
    /// `Uninitialized` again and may begin a fresh initialization.
    pub async fn teardown(&self) {
        self.cancel.lock().cancel();
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(Command::Teardown { reply: reply_tx })
            .is_err()
        {
            return;
        }
        let _ = reply_rx.await;
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    // -------------------------------------------------------------------------
    // Engine context access
    // -------------------------------------------------------------------------

    /// Runs `op` exclusively on the engine context.
    ///
    /// Operations from all callers execute in submission order; each one
    /// completes before the next begins. After a fatal stage failure the
    /// operation is rejected with [`SessionError::SessionFailed`] without
    /// running.
    pub async fn submit<F, Fut, T>(&self, op: F) -> SessionResult<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.cancel.lock().is_cancelled() {
            return Err(SessionError::closed());
        }

        let (value_tx, value_rx) = oneshot::channel();
        let boxed: EngineOp = Box::new(move || -> BoxFuture<'static, ()> {
            Box::pin(async move {
                let _ = value_tx.send(op().await);
            })
        });

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Exec {
                op: boxed,
                reply: reply_tx,
            })
            .map_err(|_| SessionError::Terminated)?;
        reply_rx.await.map_err(|_| SessionError::Terminated)??;
        value_rx.await.map_err(|_| SessionError::Terminated)
    }

    /// Runs `work` on the I/O worker pool, then `on_complete` on the engine
    /// context with the result.
    ///
    /// The completion never runs on the worker itself, and it queues behind
    /// other engine operations like any submission. If the session fails or
    /// is torn down before the work finishes, the completion is dropped.
    pub fn submit_io<W, T, F>(&self, work: W, on_complete: F) -> SessionResult<()>
    where
        W: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        if self.cancel.lock().is_cancelled() {
            return Err(SessionError::closed());
        }
        if let Some(code) = self.state.get().failure_code() {
            return Err(SessionError::failed(code));
        }

        let tx = self.tx.clone();
        self.workers.spawn(async move {
            let value = work.await;
            let op: EngineOp = Box::new(move || -> BoxFuture<'static, ()> {
                Box::pin(async move {
                    on_complete(value);
                })
            });
            let (reply_tx, _reply_rx) = oneshot::channel();
            if tx.send(Command::Exec { op, reply: reply_tx }).is_err() {
                warn!("worker completion dropped: engine context has shut down");
            }
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Observer
    // -------------------------------------------------------------------------

    /// Registers the host's observer. Only a weak reference is held, so the
    /// session never keeps the host alive; events fired while no observer
    /// is alive are dropped.
    pub fn set_observer<O>(&self, observer: &Arc<O>)
    where
        O: SessionObserver + 'static,
    {
        let trait_object: Arc<dyn SessionObserver> = observer.clone();
        let weak: std::sync::Weak<dyn SessionObserver> = Arc::downgrade(&trait_object);
        self.notifier.attach(weak);
    }

    /// Removes the observer registration.
    pub fn clear_observer(&self) {
        self.notifier.detach();
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Sets the host view size. Pure geometry; settable anytime and never
    /// forwarded to the engine on its own.
    pub fn set_view_size(&self, size: ViewSize) {
        self.camera.lock().view_size = size;
    }

    /// Sets the camera feed viewport. Pure geometry; settable anytime.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.camera.lock().viewport = viewport;
    }

    /// Requests a video mode change.
    ///
    /// Before the camera runs the value is buffered and applied with the
    /// camera start snapshot; afterwards it is applied to the engine in
    /// queue order. An engine rejection keeps the previous mode and is
    /// reported through the observer's error path.
    pub fn set_video_mode(&self, mode: VideoMode) -> SessionResult<()> {
        self.queue_change(CameraChange::VideoMode(mode))
    }

    /// Requests a focus mode change. Same semantics as
    /// [`set_video_mode`](Session::set_video_mode).
    pub fn set_focus_mode(&self, mode: FocusMode) -> SessionResult<()> {
        self.queue_change(CameraChange::FocusMode(mode))
    }

    /// Requests a torch toggle. Same semantics as
    /// [`set_video_mode`](Session::set_video_mode).
    pub fn set_torch_enabled(&self, enabled: bool) -> SessionResult<()> {
        self.queue_change(CameraChange::Torch(enabled))
    }

    fn queue_change(&self, change: CameraChange) -> SessionResult<()> {
        if self.cancel.lock().is_cancelled() {
            return Err(SessionError::closed());
        }
        if let Some(code) = self.state.get().failure_code() {
            return Err(SessionError::failed(code));
        }
        self.tx
            .send(Command::Apply { change })
            .map_err(|_| SessionError::Terminated)
    }

    /// Sets the cache directory the engine loads its data files from.
    ///
    /// Only permitted while the session is `Uninitialized`; the path must
    /// be absolute. Fixed for the session once bring-up starts.
    pub fn set_cache_directory(&self, path: impl AsRef<Path>) -> SessionResult<()> {
        if self.cancel.lock().is_cancelled() {
            return Err(SessionError::closed());
        }
        let state = self.state.get();
        if state != LifecycleState::Uninitialized {
            return Err(SessionError::InvalidState {
                operation: "set_cache_directory",
                state,
            });
        }
        let normalized = paths::normalize_cache_dir(path.as_ref())?;
        *self.cache_dir.lock() = Some(normalized);
        Ok(())
    }

    /// Returns the configured cache directory, if any.
    pub fn cache_directory(&self) -> Option<PathBuf> {
        self.cache_dir.lock().clone()
    }

    /// Returns a snapshot of the camera configuration as the session
    /// currently knows it.
    pub fn camera_config(&self) -> CameraConfig {
        *self.camera.lock()
    }

    /// Returns the current video mode.
    pub fn video_mode(&self) -> VideoMode {
        self.camera.lock().video_mode
    }

    /// Returns the current focus mode.
    pub fn focus_mode(&self) -> FocusMode {
        self.camera.lock().focus_mode
    }

    /// Returns whether the torch is on.
    pub fn torch_enabled(&self) -> bool {
        self.camera.lock().torch_enabled
    }

    /// Returns the host view size.
    pub fn view_size(&self) -> ViewSize {
        self.camera.lock().view_size
    }

    /// Returns the camera feed viewport.
    pub fn viewport(&self) -> Viewport {
        self.camera.lock().viewport
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state.get())
            .field("camera", &self.camera.lock())
            .finish()
    }
}
