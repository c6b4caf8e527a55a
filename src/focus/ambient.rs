use std::time::{Duration, Instant};

use super::state::{cooldown_expired, AlertState};
use super::{AlertKind, Utterance};

pub const DEFAULT_DARK_THRESHOLD: f32 = 40.0;
pub const LOW_LIGHT_MESSAGE: &str = "Low light detected.";

/// Result of one brightness check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightCheck {
    pub is_dark: bool,
    pub warning: Option<Utterance>,
}

/// Darkness channel. Runs on its own cooldown and never competes with the
/// object channel.
#[derive(Clone, Copy, Debug)]
pub struct AmbientLightMonitor {
    threshold: f32,
    cooldown: Duration,
}

impl AmbientLightMonitor {
    pub fn new(threshold: f32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
        }
    }

    pub fn is_dark(&self, mean_brightness: f32) -> bool {
        mean_brightness < self.threshold
    }

    pub fn observe(&self, mean_brightness: f32, now: Instant, state: &mut AlertState) -> LightCheck {
        let is_dark = self.is_dark(mean_brightness);
        let warning = if is_dark && cooldown_expired(state.last_dark_warning_at, now, self.cooldown)
        {
            state.last_dark_warning_at = Some(now);
            Some(Utterance::new(AlertKind::LowLight, LOW_LIGHT_MESSAGE))
        } else {
            None
        };
        LightCheck { is_dark, warning }
    }
}

impl Default for AmbientLightMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DARK_THRESHOLD, Duration::from_secs(15))
    }
}
