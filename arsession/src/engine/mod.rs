//! Opaque interface to the native tracking engine.
//!
//! The engine performs camera capture, frame tracking, and image/marker
//! recognition behind a small set of lifecycle calls. This module defines
//! the [`Engine`] trait the session drives, plus the value types that cross
//! that boundary: status codes, init flags, tracker kinds/handles, and the
//! camera parameters gathered at start time.
//!
//! Engine implementations are not required to be thread-safe. The session
//! guarantees that every call happens on a single logical execution context,
//! one call at a time, in submission order.
//!
//! # Example
//!
//! ```ignore
//! use arsession::engine::{Engine, InitFlags, TrackerKind, STATUS_OK};
//!
//! let code = engine.init(InitFlags::default()).await;
//! if code == STATUS_OK {
//!     let handle = engine.register_tracker(TrackerKind::Image).await?;
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::config::{CameraChange, CameraConfig, FocusMode, VideoMode};

// =============================================================================
// Status Codes
// =============================================================================

/// Raw status code reported by the engine. Zero means success; any other
/// value is an engine-defined error.
pub type StatusCode = i32;

/// Status code indicating a successful engine call.
pub const STATUS_OK: StatusCode = 0;

// =============================================================================
// Init Flags
// =============================================================================

/// Flags passed to [`Engine::init`].
///
/// The engine word selects tracking features; the render word selects the
/// rendering backend the engine binds its camera frames to. Both are opaque
/// to the session and forwarded verbatim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitFlags {
    /// Engine feature flags.
    pub engine: u32,

    /// Render backend flags.
    pub render: u32,
}

impl InitFlags {
    /// Creates a flag pair from raw flag words.
    pub fn new(engine: u32, render: u32) -> Self {
        Self { engine, render }
    }
}

// =============================================================================
// Trackers
// =============================================================================

/// The recognition capabilities an engine can register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackerKind {
    /// Natural-feature image target tracking.
    Image,

    /// Fiducial marker tracking.
    Marker,
}

impl TrackerKind {
    /// Returns a short name for logging and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Marker => "marker",
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Engine-issued identifier for a registered tracker.
///
/// Handles are opaque; the session holds them exclusively between
/// registration and release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackerHandle(u64);

impl TrackerHandle {
    /// Wraps a raw engine handle value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// Camera Info
// =============================================================================

/// Descriptive camera parameters gathered when the camera starts.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraInfo {
    /// Capture width in pixels.
    pub width: u32,

    /// Capture height in pixels.
    pub height: u32,

    /// Video mode the camera actually started with.
    pub video_mode: VideoMode,

    /// Focus mode active at start.
    pub focus_mode: FocusMode,

    /// Whether the torch was enabled at start.
    pub torch_enabled: bool,
}

impl CameraInfo {
    /// Flattens the parameters into a string map for bridge layers that
    /// forward the payload as a dictionary.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "resolution".to_string(),
            format!("{}x{}", self.width, self.height),
        );
        map.insert("video_mode".to_string(), self.video_mode.to_string());
        map.insert("focus_mode".to_string(), self.focus_mode.to_string());
        map.insert("torch".to_string(), self.torch_enabled.to_string());
        map
    }
}

// =============================================================================
// Engine Trait
// =============================================================================

/// The opaque tracking engine the session drives.
///
/// All methods are invoked exclusively from the session's engine context,
/// never concurrently. Asynchronous methods return boxed futures so the
/// trait stays object-safe for mock engines and FFI shims alike; the engine
/// context awaits each call to completion before issuing the next.
///
/// Status-returning methods follow the native convention: [`STATUS_OK`] for
/// success, any other value for an engine-defined failure.
pub trait Engine: Send + 'static {
    /// Initializes the engine with the given flags.
    ///
    /// `cache_dir` is the directory the engine may use for its data files;
    /// `None` when the host never configured one.
    fn init(&mut self, flags: InitFlags, cache_dir: Option<PathBuf>) -> BoxFuture<'_, StatusCode>;

    /// Registers a tracker of the given kind.
    ///
    /// Returns the engine-issued handle on success, or the failure status.
    fn register_tracker(
        &mut self,
        kind: TrackerKind,
    ) -> BoxFuture<'_, Result<TrackerHandle, StatusCode>>;

    /// Starts the camera device with the given configuration.
    fn start_camera(&mut self, config: CameraConfig) -> BoxFuture<'_, StatusCode>;

    /// Returns the camera parameters in effect.
    ///
    /// Only meaningful after [`start_camera`](Engine::start_camera) reported
    /// success.
    fn camera_info(&self) -> CameraInfo;

    /// Applies a single camera setting while the camera is running.
    fn apply_setting(&mut self, change: CameraChange) -> BoxFuture<'_, StatusCode>;

    /// Stops the camera device.
    fn stop_camera(&mut self);

    /// Releases a previously registered tracker.
    fn release_tracker(&mut self, handle: TrackerHandle);

    /// Shuts the engine down, releasing all native resources.
    fn shutdown(&mut self);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_flags_default_is_zero() {
        let flags = InitFlags::default();
        assert_eq!(flags.engine, 0);
        assert_eq!(flags.render, 0);
    }

    #[test]
    fn test_tracker_kind_labels() {
        assert_eq!(TrackerKind::Image.label(), "image");
        assert_eq!(TrackerKind::Marker.label(), "marker");
        assert_eq!(format!("{}", TrackerKind::Image), "image");
    }

    #[test]
    fn test_tracker_handle_roundtrip() {
        let handle = TrackerHandle::new(42);
        assert_eq!(handle.raw(), 42);
        assert_eq!(handle, TrackerHandle::new(42));
        assert_ne!(handle, TrackerHandle::new(43));
    }

    #[test]
    fn test_camera_info_to_map() {
        let info = CameraInfo {
            width: 1280,
            height: 720,
            video_mode: VideoMode::OptimizeSpeed,
            focus_mode: FocusMode::AutoContinuous,
            torch_enabled: false,
        };

        let map = info.to_map();
        assert_eq!(map.get("resolution"), Some(&"1280x720".to_string()));
        assert_eq!(map.get("video_mode"), Some(&"OptimizeSpeed".to_string()));
        assert_eq!(
            map.get("focus_mode"),
            Some(&"AutoContinuous".to_string())
        );
        assert_eq!(map.get("torch"), Some(&"false".to_string()));
    }
}
