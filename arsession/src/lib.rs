//! ARSession - lifecycle management for native AR tracking engines
//!
//! This library wraps a native augmented-reality tracking engine (camera
//! acquisition, frame tracking, image/marker recognition) in a narrow,
//! thread-safe control surface. It sequences the engine's multi-stage
//! bring-up, serializes every engine call onto one logical execution
//! context, and reports progress to the host through an observer on a
//! dedicated notification context.
//!
//! # Architecture
//!
//! ```text
//! host threads ──► Session (facade) ──► command queue ──► engine context
//!                     │                                       │
//!                     │ set_* / submit / teardown             │ Engine calls,
//!                     │                                       │ one at a time
//!                     ▼                                       ▼
//!                 WorkerPool (I/O)                 Notifier ──► SessionObserver
//! ```
//!
//! The engine itself stays opaque behind the [`Engine`] trait: the library
//! owns *when* and *in what order* engine calls happen, never what they do.

pub mod config;
pub mod engine;
pub mod events;
pub mod paths;
pub mod session;
pub mod workers;

pub use config::{
    CameraChange, CameraConfig, FocusMode, SessionConfig, TrackerFailurePolicy, VideoMode,
    ViewSize, Viewport,
};
pub use engine::{
    CameraInfo, Engine, InitFlags, StatusCode, TrackerHandle, TrackerKind, STATUS_OK,
};
pub use events::{SessionEvent, SessionObserver};
pub use session::{BringUpStage, LifecycleState, Session, SessionError, SessionResult};
pub use workers::WorkerPool;
