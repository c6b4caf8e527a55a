//! Third Eye: a focus & alert assistant for camera glasses.
//!
//! Each camera frame goes through an object detector, and the results are
//! narrowed down to what the wearer is looking at:
//!
//! - confident detections of allow-listed labels are kept
//! - a vertical band in the middle of the frame is the focus zone
//! - a tall in-focus box means the object is dangerously close
//! - at most one object utterance per frame, rate-limited per channel
//! - a separate low-light warning when the scene is too dark
//!
//! # Module Structure
//!
//! - `frame`: owned RGB frames, zeroized on drop
//! - `ingest`: frame sources (synthetic, image directory, V4L2)
//! - `detect`: detections, the confidence/label filter, detector backends
//! - `focus`: zone, proximity, darkness and the alert arbiter (`FocusEngine`)
//! - `speech`: non-blocking, bounded text-to-speech dispatch
//! - `hud`: styled overlay derived from each decision
//! - `runtime`: the session loop tying it all together
//! - `config`: file + environment configuration
//!
//! Frames never leave memory: nothing here writes pixels to disk or logs them.

pub mod config;
pub mod detect;
pub mod focus;
pub mod frame;
pub mod hud;
pub mod ingest;
pub mod runtime;
pub mod speech;

pub use config::{AssistConfig, CameraSettings, DetectorSettings, SpeechSettings};
pub use detect::{
    BackendRegistry, BoundingBox, Detection, DetectionFilter, DetectorBackend, ScriptedBackend,
    StubBackend,
};
pub use focus::{
    AlertKind, AlertPhase, AlertState, ClassifiedDetection, FocusConfig, FocusEngine, FocusZone,
    FrameDecision, Utterance,
};
pub use frame::Frame;
pub use hud::{HighlightStyle, HudOverlay, HudSink, LogHud};
pub use ingest::{open_source, FrameSource, SourceStats, SyntheticSource};
pub use runtime::{Session, SessionEnd, SessionStats};
pub use speech::{CommandEngine, Dispatch, LogEngine, SpeechDispatcher, SpeechEngine};
