//! Heads-up display output.
//!
//! The decision engine never draws. Each frame's `FrameDecision` is turned
//! into a `HudOverlay` (styled boxes, captions, low-light and flash flags) and
//! handed to a `HudSink`. The only sink shipped here writes to the log.

use crate::detect::BoundingBox;
use crate::focus::FrameDecision;
use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HighlightStyle {
    /// In focus and too close.
    Danger,
    Focused,
    /// Outside the focus zone. Drawn passively, never spoken.
    Peripheral,
}

impl HighlightStyle {
    pub fn caption(self, label: &str) -> Option<String> {
        match self {
            Self::Danger => Some(format!("STOP! {}", label)),
            Self::Focused => Some(label.to_string()),
            Self::Peripheral => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Highlight {
    pub style: HighlightStyle,
    pub label: String,
    pub bbox: BoundingBox,
    pub caption: Option<String>,
}

/// Everything the display needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HudOverlay {
    pub highlights: Vec<Highlight>,
    pub low_light: bool,
    /// Whole-frame danger flash.
    pub flash: bool,
}

impl HudOverlay {
    pub fn from_decision(decision: &FrameDecision) -> Self {
        let highlights = decision
            .classified
            .iter()
            .map(|c| {
                let style = match (c.in_focus, c.danger_close) {
                    (true, true) => HighlightStyle::Danger,
                    (true, false) => HighlightStyle::Focused,
                    (false, _) => HighlightStyle::Peripheral,
                };
                Highlight {
                    style,
                    label: c.label().to_string(),
                    bbox: c.detection.bbox,
                    caption: style.caption(c.label()),
                }
            })
            .collect();
        Self {
            highlights,
            low_light: decision.is_dark,
            flash: decision.danger_close,
        }
    }

    pub fn captions(&self) -> impl Iterator<Item = &str> {
        self.highlights.iter().filter_map(|h| h.caption.as_deref())
    }
}

pub trait HudSink {
    fn render(&mut self, frame: &Frame, decision: &FrameDecision);
}

/// Logs overlays at debug level and danger/low-light transitions at info/warn.
#[derive(Debug, Default)]
pub struct LogHud {
    flashing: bool,
    low_light: bool,
}

impl LogHud {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HudSink for LogHud {
    fn render(&mut self, frame: &Frame, decision: &FrameDecision) {
        let overlay = HudOverlay::from_decision(decision);

        if overlay.flash != self.flashing {
            if overlay.flash {
                log::warn!("hud: danger flash on");
            } else {
                log::info!("hud: danger flash off");
            }
            self.flashing = overlay.flash;
        }
        if overlay.low_light != self.low_light {
            if overlay.low_light {
                log::warn!("hud: low light indicator on");
            } else {
                log::info!("hud: low light indicator off");
            }
            self.low_light = overlay.low_light;
        }

        if !overlay.highlights.is_empty() {
            let styled: Vec<String> = overlay
                .highlights
                .iter()
                .map(|h| format!("{:?}:{}", h.style, h.label))
                .collect();
            log::debug!(
                "hud {}x{}: [{}]",
                frame.width,
                frame.height,
                styled.join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Detection;
    use crate::focus::ClassifiedDetection;

    fn classified(label: &str, in_focus: bool, danger_close: bool) -> ClassifiedDetection {
        ClassifiedDetection {
            detection: Detection::new(label, 0.9, BoundingBox::new(300, 60, 340, 120)),
            in_focus,
            danger_close,
        }
    }

    #[test]
    fn styles_and_captions() {
        let decision = FrameDecision {
            classified: vec![
                classified("person", true, true),
                classified("cup", true, false),
                classified("bottle", false, false),
            ],
            is_dark: false,
            danger_close: true,
            utterances: Vec::new(),
        };
        let overlay = HudOverlay::from_decision(&decision);
        let styles: Vec<_> = overlay.highlights.iter().map(|h| h.style).collect();
        assert_eq!(
            styles,
            vec![
                HighlightStyle::Danger,
                HighlightStyle::Focused,
                HighlightStyle::Peripheral
            ]
        );
        assert_eq!(overlay.captions().collect::<Vec<_>>(), vec!["STOP! person", "cup"]);
        assert!(overlay.flash);
        assert!(!overlay.low_light);
    }

    #[test]
    fn log_hud_tracks_transitions() -> anyhow::Result<()> {
        let frame = Frame::from_rgb(vec![0; 12], 2, 2)?;
        let mut hud = LogHud::new();
        let dark = FrameDecision {
            is_dark: true,
            ..FrameDecision::default()
        };
        hud.render(&frame, &dark);
        assert!(hud.low_light);
        hud.render(&frame, &FrameDecision::default());
        assert!(!hud.low_light);
        assert!(!hud.flashing);
        Ok(())
    }
}
