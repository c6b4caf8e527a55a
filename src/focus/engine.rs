use std::time::Instant;

use crate::detect::{Detection, DetectionFilter};
use crate::frame::Frame;

use super::{
    AlertArbiter, AlertState, AmbientLightMonitor, ClassifiedDetection, FocusConfig,
    FocusZone, FrameDecision, ProximityEstimator,
};

/// The per-frame decision pipeline with its session state.
///
/// `process` is synchronous and infallible. The caller supplies the clock so the
/// engine never assumes a frame interval.
pub struct FocusEngine {
    config: FocusConfig,
    filter: DetectionFilter,
    proximity: ProximityEstimator,
    ambient: AmbientLightMonitor,
    arbiter: AlertArbiter,
    zone: FocusZone,
    frame_size: (u32, u32),
    state: AlertState,
}

impl FocusEngine {
    pub fn new(config: FocusConfig, width: u32, height: u32) -> Self {
        let filter = DetectionFilter::new(
            config.confidence_threshold,
            config.target_labels.iter().cloned(),
        );
        let proximity = ProximityEstimator::new(config.danger_height);
        let ambient = AmbientLightMonitor::new(config.dark_threshold, config.dark_cooldown);
        let arbiter = AlertArbiter::new(config.focus_cooldown, config.danger_cooldown);
        let zone = FocusZone::for_frame(width, height, config.zone_half_width, config.zone_margin);
        Self {
            config,
            filter,
            proximity,
            ambient,
            arbiter,
            zone,
            frame_size: (width, height),
            state: AlertState::new(),
        }
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    pub fn zone(&self) -> FocusZone {
        self.zone
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Decide a captured frame, using its capture instant as the clock.
    pub fn process_frame(&mut self, frame: &Frame, detections: Vec<Detection>) -> FrameDecision {
        if (frame.width, frame.height) != self.frame_size {
            log::warn!(
                "frame size changed {}x{} -> {}x{}, recomputing focus zone",
                self.frame_size.0,
                self.frame_size.1,
                frame.width,
                frame.height
            );
            self.frame_size = (frame.width, frame.height);
            self.zone = FocusZone::for_frame(
                frame.width,
                frame.height,
                self.config.zone_half_width,
                self.config.zone_margin,
            );
        }
        self.process(detections, frame.mean_brightness(), frame.captured_at)
    }

    pub fn process(
        &mut self,
        detections: Vec<Detection>,
        mean_brightness: f32,
        now: Instant,
    ) -> FrameDecision {
        let classified = self.classify(self.filter.filter(detections));
        let light = self.ambient.observe(mean_brightness, now, &mut self.state);
        let spoken = self.arbiter.decide(&classified, now, &mut self.state);

        let danger_close = classified.iter().any(|c| c.danger_close);
        let utterances = light.warning.into_iter().chain(spoken).collect();
        FrameDecision {
            classified,
            is_dark: light.is_dark,
            danger_close,
            utterances,
        }
    }

    fn classify(&self, detections: Vec<Detection>) -> Vec<ClassifiedDetection> {
        detections
            .into_iter()
            .map(|detection| {
                let in_focus = self.zone.contains_center(&detection.bbox);
                let danger_close = in_focus && self.proximity.is_danger_close(&detection.bbox);
                ClassifiedDetection {
                    detection,
                    in_focus,
                    danger_close,
                }
            })
            .collect()
    }
}
