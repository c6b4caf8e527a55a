use std::time::{Duration, Instant};

/// Session-lifetime alert timers.
///
/// Single writer: the `FocusEngine` that owns it. Speech threads never see it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertState {
    /// Last object-channel utterance (focus or danger).
    pub last_speech_at: Option<Instant>,
    /// Last danger utterance.
    pub last_danger_at: Option<Instant>,
    pub last_dark_warning_at: Option<Instant>,
    /// Label of the last announced focused object. Not cleared when the zone
    /// empties.
    pub current_label: Option<String>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_label(&self) -> Option<&str> {
        self.current_label.as_deref()
    }
}

/// True when strictly more than `cooldown` has passed since `last`.
/// A timer that never fired is always expired.
pub(crate) fn cooldown_expired(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    match last {
        Some(last) => now.saturating_duration_since(last) > cooldown,
        None => true,
    }
}
