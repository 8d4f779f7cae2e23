//! Camera and session configuration types.
//!
//! [`CameraConfig`] is the buffered configuration the session accumulates
//! before the camera starts and keeps in sync afterwards. Individual fields
//! change through [`CameraChange`] values so the engine context can apply
//! them one at a time. [`SessionConfig`] carries everything fixed at session
//! creation: init flags, the requested tracker set, the tracker failure
//! policy, and worker pool capacity.
//!
//! The mode enums mirror the native engine's integer constants; bridge
//! layers that receive raw integers from a host runtime convert them with
//! `from_raw`, which rejects values outside the defined set.

use std::fmt;

use crate::engine::{InitFlags, TrackerKind};

// =============================================================================
// Video Mode
// =============================================================================

/// Raw engine value for the default video mode.
pub const VIDEO_MODE_DEFAULT: i32 = -1;

/// Raw engine value for the speed-optimized video mode.
pub const VIDEO_MODE_OPTIMIZE_SPEED: i32 = -2;

/// Raw engine value for the quality-optimized video mode.
pub const VIDEO_MODE_OPTIMIZE_QUALITY: i32 = -3;

/// Camera capture mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VideoMode {
    /// Engine-selected default mode.
    Default,

    /// Prefer frame rate over resolution.
    OptimizeSpeed,

    /// Prefer resolution over frame rate.
    OptimizeQuality,
}

impl VideoMode {
    /// Converts a raw engine value, rejecting values outside the defined set.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            VIDEO_MODE_DEFAULT => Some(Self::Default),
            VIDEO_MODE_OPTIMIZE_SPEED => Some(Self::OptimizeSpeed),
            VIDEO_MODE_OPTIMIZE_QUALITY => Some(Self::OptimizeQuality),
            _ => None,
        }
    }

    /// Returns the raw engine value.
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Default => VIDEO_MODE_DEFAULT,
            Self::OptimizeSpeed => VIDEO_MODE_OPTIMIZE_SPEED,
            Self::OptimizeQuality => VIDEO_MODE_OPTIMIZE_QUALITY,
        }
    }
}

impl Default for VideoMode {
    fn default() -> Self {
        Self::Default
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "Default",
            Self::OptimizeSpeed => "OptimizeSpeed",
            Self::OptimizeQuality => "OptimizeQuality",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Focus Mode
// =============================================================================

/// Raw engine value for normal fixed focus.
pub const FOCUS_MODE_NORMAL: i32 = 0;

/// Raw engine value for single-shot autofocus.
pub const FOCUS_MODE_AUTO_TRIGGER: i32 = 1;

/// Raw engine value for continuous autofocus.
pub const FOCUS_MODE_AUTO_CONTINUOUS: i32 = 2;

/// Raw engine value for focus at infinity.
pub const FOCUS_MODE_INFINITY: i32 = 3;

/// Raw engine value for macro focus.
pub const FOCUS_MODE_MACRO: i32 = 4;

/// Camera focus mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FocusMode {
    /// Continuous autofocus.
    AutoContinuous,

    /// Focus locked at infinity.
    Infinity,

    /// Single-shot autofocus, triggered on demand.
    AutoTrigger,

    /// Close-range macro focus.
    Macro,

    /// Normal fixed focus.
    Normal,
}

impl FocusMode {
    /// Converts a raw engine value, rejecting values outside the defined set.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            FOCUS_MODE_AUTO_CONTINUOUS => Some(Self::AutoContinuous),
            FOCUS_MODE_INFINITY => Some(Self::Infinity),
            FOCUS_MODE_AUTO_TRIGGER => Some(Self::AutoTrigger),
            FOCUS_MODE_MACRO => Some(Self::Macro),
            FOCUS_MODE_NORMAL => Some(Self::Normal),
            _ => None,
        }
    }

    /// Returns the raw engine value.
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::AutoContinuous => FOCUS_MODE_AUTO_CONTINUOUS,
            Self::Infinity => FOCUS_MODE_INFINITY,
            Self::AutoTrigger => FOCUS_MODE_AUTO_TRIGGER,
            Self::Macro => FOCUS_MODE_MACRO,
            Self::Normal => FOCUS_MODE_NORMAL,
        }
    }
}

impl Default for FocusMode {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AutoContinuous => "AutoContinuous",
            Self::Infinity => "Infinity",
            Self::AutoTrigger => "AutoTrigger",
            Self::Macro => "Macro",
            Self::Normal => "Normal",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// View Geometry
// =============================================================================

/// Size of the host view the camera feed renders into, in points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewSize {
    /// View width.
    pub width: f32,

    /// View height.
    pub height: f32,
}

impl ViewSize {
    /// Creates a view size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Region of the host view the camera feed occupies, in points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,

    /// Top edge.
    pub y: f32,

    /// Viewport width.
    pub width: f32,

    /// Viewport height.
    pub height: f32,
}

impl Viewport {
    /// Creates a viewport.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// =============================================================================
// Camera Configuration
// =============================================================================

/// A single camera setting change.
///
/// Changes are routed through the engine context so that applying one never
/// interleaves with another engine operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraChange {
    /// Switch the capture mode.
    VideoMode(VideoMode),

    /// Switch the focus mode.
    FocusMode(FocusMode),

    /// Toggle the torch.
    Torch(bool),
}

impl CameraChange {
    /// Returns a short name for logging and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VideoMode(_) => "video_mode",
            Self::FocusMode(_) => "focus_mode",
            Self::Torch(_) => "torch",
        }
    }
}

/// The camera configuration applied at camera start and kept current while
/// the camera runs.
///
/// Writes that arrive before the camera starts are buffered here and handed
/// to the engine as one snapshot; the last write per field wins.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraConfig {
    /// Capture mode.
    pub video_mode: VideoMode,

    /// Focus mode.
    pub focus_mode: FocusMode,

    /// Whether the torch is on.
    pub torch_enabled: bool,

    /// Host view size.
    pub view_size: ViewSize,

    /// Camera feed viewport within the view.
    pub viewport: Viewport,
}

impl CameraConfig {
    /// Applies a single setting change to this configuration.
    pub fn apply(&mut self, change: CameraChange) {
        match change {
            CameraChange::VideoMode(mode) => self.video_mode = mode,
            CameraChange::FocusMode(mode) => self.focus_mode = mode,
            CameraChange::Torch(enabled) => self.torch_enabled = enabled,
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Default number of concurrent I/O worker tasks.
pub const DEFAULT_WORKER_CAPACITY: usize = 4;

/// How the bring-up sequence handles a tracker registration failure.
///
/// Engine init and camera start failures are always fatal to the session;
/// this policy only governs the tracker registration stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerFailurePolicy {
    /// The first tracker registration failure fails the session.
    ///
    /// This is the default: a missing tracker usually invalidates the whole
    /// AR experience the host asked for.
    FailFast,

    /// Remaining tracker kinds are still attempted after a failure.
    ///
    /// Bring-up proceeds to camera start if at least one requested kind
    /// registered. The session fails only if every requested kind failed.
    ContinueOnError,
}

impl Default for TrackerFailurePolicy {
    fn default() -> Self {
        Self::FailFast
    }
}

/// Configuration fixed at session creation.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Flags forwarded to engine init.
    pub init_flags: InitFlags,

    /// Tracker kinds to register, in registration order.
    pub trackers: Vec<TrackerKind>,

    /// How tracker registration failures are handled.
    pub tracker_failure_policy: TrackerFailurePolicy,

    /// Maximum concurrent I/O worker tasks.
    pub worker_capacity: usize,
}

impl SessionConfig {
    /// Creates a configuration with defaults and no trackers requested.
    pub fn new() -> Self {
        Self {
            init_flags: InitFlags::default(),
            trackers: Vec::new(),
            tracker_failure_policy: TrackerFailurePolicy::default(),
            worker_capacity: DEFAULT_WORKER_CAPACITY,
        }
    }

    /// Sets the engine init flags.
    pub fn with_init_flags(mut self, flags: InitFlags) -> Self {
        self.init_flags = flags;
        self
    }

    /// Requests a tracker kind. Requesting the same kind twice is a no-op.
    pub fn with_tracker(mut self, kind: TrackerKind) -> Self {
        if !self.trackers.contains(&kind) {
            self.trackers.push(kind);
        }
        self
    }

    /// Sets the tracker failure policy.
    pub fn with_tracker_failure_policy(mut self, policy: TrackerFailurePolicy) -> Self {
        self.tracker_failure_policy = policy;
        self
    }

    /// Sets the I/O worker pool capacity.
    pub fn with_worker_capacity(mut self, capacity: usize) -> Self {
        self.worker_capacity = capacity;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_video_mode_raw_roundtrip() {
        for mode in [
            VideoMode::Default,
            VideoMode::OptimizeSpeed,
            VideoMode::OptimizeQuality,
        ] {
            assert_eq!(VideoMode::from_raw(mode.as_raw()), Some(mode));
        }
    }

    #[test]
    fn test_video_mode_rejects_unknown_raw() {
        assert_eq!(VideoMode::from_raw(0), None);
        assert_eq!(VideoMode::from_raw(7), None);
    }

    #[test]
    fn test_focus_mode_raw_roundtrip() {
        for mode in [
            FocusMode::AutoContinuous,
            FocusMode::Infinity,
            FocusMode::AutoTrigger,
            FocusMode::Macro,
            FocusMode::Normal,
        ] {
            assert_eq!(FocusMode::from_raw(mode.as_raw()), Some(mode));
        }
    }

    #[test]
    fn test_focus_mode_rejects_unknown_raw() {
        assert_eq!(FocusMode::from_raw(-1), None);
        assert_eq!(FocusMode::from_raw(5), None);
    }

    #[test]
    fn test_camera_config_apply() {
        let mut config = CameraConfig::default();

        config.apply(CameraChange::VideoMode(VideoMode::OptimizeQuality));
        config.apply(CameraChange::FocusMode(FocusMode::Macro));
        config.apply(CameraChange::Torch(true));

        assert_eq!(config.video_mode, VideoMode::OptimizeQuality);
        assert_eq!(config.focus_mode, FocusMode::Macro);
        assert!(config.torch_enabled);

        // Geometry is untouched by setting changes
        assert_eq!(config.view_size, ViewSize::default());
        assert_eq!(config.viewport, Viewport::default());
    }

    #[test]
    fn test_session_config_builders() {
        let config = SessionConfig::new()
            .with_init_flags(InitFlags::new(0x2, 0x8))
            .with_tracker(TrackerKind::Image)
            .with_tracker(TrackerKind::Marker)
            .with_tracker_failure_policy(TrackerFailurePolicy::ContinueOnError)
            .with_worker_capacity(8);

        assert_eq!(config.init_flags, InitFlags::new(0x2, 0x8));
        assert_eq!(config.trackers, vec![TrackerKind::Image, TrackerKind::Marker]);
        assert_eq!(
            config.tracker_failure_policy,
            TrackerFailurePolicy::ContinueOnError
        );
        assert_eq!(config.worker_capacity, 8);
    }

    #[test]
    fn test_session_config_deduplicates_trackers() {
        let config = SessionConfig::new()
            .with_tracker(TrackerKind::Image)
            .with_tracker(TrackerKind::Image);

        assert_eq!(config.trackers, vec![TrackerKind::Image]);
    }

    #[test]
    fn test_tracker_failure_policy_default() {
        assert_eq!(TrackerFailurePolicy::default(), TrackerFailurePolicy::FailFast);
    }

    fn change_strategy() -> impl Strategy<Value = CameraChange> {
        prop_oneof![
            prop_oneof![
                Just(VideoMode::Default),
                Just(VideoMode::OptimizeSpeed),
                Just(VideoMode::OptimizeQuality),
            ]
            .prop_map(CameraChange::VideoMode),
            prop_oneof![
                Just(FocusMode::AutoContinuous),
                Just(FocusMode::Infinity),
                Just(FocusMode::AutoTrigger),
                Just(FocusMode::Macro),
                Just(FocusMode::Normal),
            ]
            .prop_map(CameraChange::FocusMode),
            any::<bool>().prop_map(CameraChange::Torch),
        ]
    }

    proptest! {
        /// The buffered configuration always equals the last write per field,
        /// regardless of the order and number of setter calls.
        #[test]
        fn test_last_write_wins(changes in proptest::collection::vec(change_strategy(), 0..32)) {
            let mut config = CameraConfig::default();
            for change in &changes {
                config.apply(*change);
            }

            let mut expected = CameraConfig::default();
            for change in &changes {
                match change {
                    CameraChange::VideoMode(mode) => expected.video_mode = *mode,
                    CameraChange::FocusMode(mode) => expected.focus_mode = *mode,
                    CameraChange::Torch(enabled) => expected.torch_enabled = *enabled,
                }
            }

            prop_assert_eq!(config, expected);
        }
    }
}
