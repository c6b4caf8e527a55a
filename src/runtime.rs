//! The per-frame session loop.
//!
//! source -> detector -> focus engine -> (speech, HUD). One frame at a time, no
//! pacing: the loop runs as fast as the source delivers. Speech is handed off
//! without waiting, so a slow synthesizer never stalls the camera.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::detect::DetectorBackend;
use crate::focus::{AlertKind, FocusEngine};
use crate::hud::HudSink;
use crate::ingest::FrameSource;
use crate::speech::{Dispatch, SpeechDispatcher};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The source reported end of stream.
    SourceExhausted,
    /// The shutdown flag was raised.
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub detector_errors: u64,
    pub danger_alerts: u64,
    pub focus_alerts: u64,
    pub low_light_warnings: u64,
    /// Utterances the dispatcher refused because too many were in flight.
    pub dropped_utterances: u64,
    pub ended: SessionEnd,
}

/// The moving parts of one session. The source must already be connected.
pub struct Session<'a> {
    pub source: &'a mut dyn FrameSource,
    pub detector: &'a mut dyn DetectorBackend,
    pub engine: &'a mut FocusEngine,
    pub speech: &'a mut SpeechDispatcher,
    pub hud: &'a mut dyn HudSink,
}

impl Session<'_> {
    /// Run until the source ends, it fails, or `shutdown` is raised.
    ///
    /// A source error ends the session with that error. A detector error only
    /// costs that frame its detections.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<SessionStats> {
        let mut stats = SessionStats {
            frames: 0,
            detector_errors: 0,
            danger_alerts: 0,
            focus_alerts: 0,
            low_light_warnings: 0,
            dropped_utterances: 0,
            ended: SessionEnd::Shutdown,
        };
        let mut last_health_log = Instant::now();

        log::info!(
            "session running: source={} detector={}",
            self.source.stats().origin,
            self.detector.name()
        );

        loop {
            if shutdown.load(Ordering::SeqCst) {
                stats.ended = SessionEnd::Shutdown;
                break;
            }

            let Some(frame) = self.source.next_frame().context("frame source failed")? else {
                stats.ended = SessionEnd::SourceExhausted;
                break;
            };
            stats.frames += 1;

            let detections = match self.detector.detect(&frame) {
                Ok(detections) => detections,
                Err(err) => {
                    stats.detector_errors += 1;
                    log::warn!("{} detector failed: {:#}", self.detector.name(), err);
                    Vec::new()
                }
            };

            let decision = self.engine.process_frame(&frame, detections);

            for utterance in &decision.utterances {
                match utterance.kind {
                    AlertKind::Danger => {
                        stats.danger_alerts += 1;
                        log::warn!("{}", utterance.text);
                    }
                    AlertKind::Focus => {
                        stats.focus_alerts += 1;
                        log::info!("focused: {}", utterance.text);
                    }
                    AlertKind::LowLight => stats.low_light_warnings += 1,
                    AlertKind::Greeting => {}
                }
                if self.speech.speak(utterance.text.as_str()) == Dispatch::Dropped {
                    stats.dropped_utterances += 1;
                }
            }

            self.hud.render(&frame, &decision);

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let source_stats = self.source.stats();
                log::info!(
                    "source health={} frames={} origin={} speech_in_flight={}",
                    self.source.is_healthy(),
                    source_stats.frames_captured,
                    source_stats.origin,
                    self.speech.in_flight()
                );
                last_health_log = Instant::now();
            }
        }

        log::info!(
            "session ended ({:?}): frames={} focus={} danger={} low_light={} dropped_speech={} detector_errors={}",
            stats.ended,
            stats.frames,
            stats.focus_alerts,
            stats.danger_alerts,
            stats.low_light_warnings,
            stats.dropped_utterances,
            stats.detector_errors
        );
        Ok(stats)
    }
}
