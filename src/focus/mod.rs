//! Focus & alert decision engine.
//!
//! Per frame, leaves first:
//!
//! 1. `DetectionFilter` keeps confident, allow-listed detections.
//! 2. `FocusZone` splits them into in-focus and peripheral by horizontal center.
//! 3. `ProximityEstimator` flags in-focus detections that fill the frame vertically.
//! 4. `AmbientLightMonitor` runs the darkness channel on mean brightness.
//! 5. `AlertArbiter` picks at most one object utterance and updates the timers.
//!
//! All timers live in one `AlertState` owned by the `FocusEngine`. Nothing in
//! this module blocks, sleeps, or fails.

use std::time::Duration;

use crate::detect::{Detection, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TARGET_LABELS};

mod ambient;
mod arbiter;
mod engine;
mod proximity;
mod state;
mod zone;

pub use ambient::{AmbientLightMonitor, LightCheck, DEFAULT_DARK_THRESHOLD, LOW_LIGHT_MESSAGE};
pub use arbiter::AlertArbiter;
pub use engine::FocusEngine;
pub use proximity::{ProximityEstimator, DEFAULT_DANGER_HEIGHT};
pub use state::AlertState;
pub use zone::{FocusZone, DEFAULT_ZONE_HALF_WIDTH, DEFAULT_ZONE_MARGIN};

/// Startup constants for the decision engine.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusConfig {
    pub confidence_threshold: f32,
    pub target_labels: Vec<String>,
    pub zone_half_width: u32,
    pub zone_margin: u32,
    pub danger_height: i32,
    pub dark_threshold: f32,
    pub dark_cooldown: Duration,
    pub danger_cooldown: Duration,
    pub focus_cooldown: Duration,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            target_labels: DEFAULT_TARGET_LABELS.iter().map(|s| s.to_string()).collect(),
            zone_half_width: DEFAULT_ZONE_HALF_WIDTH,
            zone_margin: DEFAULT_ZONE_MARGIN,
            danger_height: DEFAULT_DANGER_HEIGHT,
            dark_threshold: DEFAULT_DARK_THRESHOLD,
            dark_cooldown: Duration::from_secs(15),
            danger_cooldown: Duration::from_secs(2),
            focus_cooldown: Duration::from_secs(3),
        }
    }
}

/// A filtered detection with its zone and proximity verdicts.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedDetection {
    pub detection: Detection,
    pub in_focus: bool,
    /// Only ever set for in-focus detections.
    pub danger_close: bool,
}

impl ClassifiedDetection {
    pub fn label(&self) -> &str {
        &self.detection.label
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Danger,
    Focus,
    LowLight,
    Greeting,
}

/// Text handed to the speech dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    pub kind: AlertKind,
    pub text: String,
}

impl Utterance {
    pub fn new(kind: AlertKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn danger(label: &str) -> Self {
        Self::new(AlertKind::Danger, format!("Stop! {} too close.", label))
    }

    pub fn focus(label: &str) -> Self {
        Self::new(AlertKind::Focus, label)
    }
}

/// What the object channel is doing this frame. Derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertPhase {
    Quiet,
    AnnouncingFocus,
    AnnouncingDanger,
}

/// Outcome of one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDecision {
    /// Filtered detections in detector order.
    pub classified: Vec<ClassifiedDetection>,
    pub is_dark: bool,
    /// Any in-focus detection is danger-close this frame.
    pub danger_close: bool,
    /// Darkness warning first (if any), then the object utterance (if any).
    pub utterances: Vec<Utterance>,
}

impl FrameDecision {
    pub fn phase(&self) -> AlertPhase {
        if self.danger_close {
            AlertPhase::AnnouncingDanger
        } else if self.classified.iter().any(|c| c.in_focus) {
            AlertPhase::AnnouncingFocus
        } else {
            AlertPhase::Quiet
        }
    }

    pub fn focused(&self) -> impl Iterator<Item = &ClassifiedDetection> {
        self.classified.iter().filter(|c| c.in_focus)
    }

    pub fn object_utterance(&self) -> Option<&Utterance> {
        self.utterances
            .iter()
            .find(|u| matches!(u.kind, AlertKind::Danger | AlertKind::Focus))
    }
}
