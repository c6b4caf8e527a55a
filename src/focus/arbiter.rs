use std::time::{Duration, Instant};

use super::state::{cooldown_expired, AlertState};
use super::{ClassifiedDetection, Utterance};

/// Object-channel arbiter.
///
/// There is no stored phase. Each frame the decision is derived from the
/// classified detections and the timers in `AlertState`:
///
/// 1. No in-focus detection: stay quiet, leave `current_label` as it is.
/// 2. Any in-focus detection is danger-close: warn about the first one, on the
///    shorter danger cooldown. `current_label` is not touched.
/// 3. Otherwise announce the first in-focus detection if its label differs
///    from `current_label` or the focus cooldown has run out.
///
/// "First" is detector order. No closest or most-confident policy is applied.
#[derive(Clone, Copy, Debug)]
pub struct AlertArbiter {
    focus_cooldown: Duration,
    danger_cooldown: Duration,
}

impl AlertArbiter {
    pub fn new(focus_cooldown: Duration, danger_cooldown: Duration) -> Self {
        Self {
            focus_cooldown,
            danger_cooldown,
        }
    }

    pub fn decide(
        &self,
        classified: &[ClassifiedDetection],
        now: Instant,
        state: &mut AlertState,
    ) -> Option<Utterance> {
        let mut focused = classified.iter().filter(|c| c.in_focus).peekable();
        let first_focused = focused.peek().copied()?;

        if let Some(danger) = focused.find(|c| c.danger_close) {
            if !cooldown_expired(state.last_speech_at, now, self.danger_cooldown) {
                return None;
            }
            state.last_speech_at = Some(now);
            state.last_danger_at = Some(now);
            return Some(Utterance::danger(danger.label()));
        }

        let label = first_focused.label();
        let label_changed = state.current_label() != Some(label);
        if !label_changed && !cooldown_expired(state.last_speech_at, now, self.focus_cooldown) {
            return None;
        }
        state.last_speech_at = Some(now);
        state.current_label = Some(label.to_string());
        Some(Utterance::focus(label))
    }
}

impl Default for AlertArbiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};
    use crate::focus::AlertKind;

    fn classified(label: &str, in_focus: bool, danger_close: bool) -> ClassifiedDetection {
        ClassifiedDetection {
            detection: Detection::new(label, 0.9, BoundingBox::new(300, 100, 340, 200)),
            in_focus,
            danger_close,
        }
    }

    fn focused(label: &str) -> ClassifiedDetection {
        classified(label, true, false)
    }

    fn dangerous(label: &str) -> ClassifiedDetection {
        classified(label, true, true)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn nothing_in_focus_is_quiet() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let frame = [classified("person", false, false)];

        assert_eq!(arbiter.decide(&frame, Instant::now(), &mut state), None);
        assert_eq!(arbiter.decide(&[], Instant::now(), &mut state), None);
        assert_eq!(state, AlertState::new());
    }

    #[test]
    fn same_label_respects_focus_cooldown() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let t = Instant::now();
        let frame = [focused("bottle")];

        assert_eq!(
            arbiter.decide(&frame, t, &mut state),
            Some(Utterance::focus("bottle"))
        );
        assert_eq!(arbiter.decide(&frame, t + ms(2_900), &mut state), None);
        assert_eq!(
            arbiter.decide(&frame, t + ms(3_100), &mut state),
            Some(Utterance::focus("bottle"))
        );
        assert_eq!(state.last_speech_at, Some(t + ms(3_100)));
    }

    #[test]
    fn label_change_overrides_cooldown() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let t = Instant::now();

        arbiter.decide(&[focused("bottle")], t, &mut state);
        let next = arbiter.decide(&[focused("cup")], t + ms(100), &mut state);

        assert_eq!(next, Some(Utterance::focus("cup")));
        assert_eq!(state.current_label(), Some("cup"));
    }

    #[test]
    fn danger_preempts_focus_in_either_order() {
        let arbiter = AlertArbiter::default();
        for frame in [
            [dangerous("person"), focused("cup")],
            [focused("cup"), dangerous("person")],
        ] {
            let mut state = AlertState::new();
            let spoken = arbiter.decide(&frame, Instant::now(), &mut state);
            let spoken = spoken.expect("danger utterance");
            assert_eq!(spoken.kind, AlertKind::Danger);
            assert_eq!(spoken.text, "Stop! person too close.");
            assert_eq!(state.current_label, None);
        }
    }

    #[test]
    fn danger_uses_shorter_cooldown_and_shared_timer() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let t = Instant::now();
        let frame = [dangerous("chair")];

        assert!(arbiter.decide(&frame, t, &mut state).is_some());
        assert_eq!(state.last_danger_at, Some(t));
        assert_eq!(arbiter.decide(&frame, t + ms(1_900), &mut state), None);
        assert!(arbiter.decide(&frame, t + ms(2_100), &mut state).is_some());

        // A calm announcement also holds the danger warning back.
        let mut state = AlertState::new();
        arbiter.decide(&[focused("cup")], t, &mut state);
        assert_eq!(arbiter.decide(&frame, t + ms(1_000), &mut state), None);
        assert!(arbiter.decide(&frame, t + ms(2_001), &mut state).is_some());
    }

    #[test]
    fn danger_does_not_become_current_label() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let t = Instant::now();

        arbiter.decide(&[focused("person")], t, &mut state);
        arbiter.decide(&[dangerous("person")], t + ms(2_500), &mut state);
        assert_eq!(state.current_label(), Some("person"));

        // Same label once the danger passes: still within 3s of the warning.
        assert_eq!(
            arbiter.decide(&[focused("person")], t + ms(4_000), &mut state),
            None
        );
    }

    #[test]
    fn first_focused_detection_wins() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let frame = [
            classified("laptop", false, false),
            focused("mouse"),
            focused("keyboard"),
        ];

        let spoken = arbiter.decide(&frame, Instant::now(), &mut state);
        assert_eq!(spoken, Some(Utterance::focus("mouse")));
    }

    #[test]
    fn stale_label_suppresses_reannouncement_after_occlusion() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let t = Instant::now();

        arbiter.decide(&[focused("cup")], t, &mut state);
        assert_eq!(arbiter.decide(&[], t + ms(500), &mut state), None);
        assert_eq!(state.current_label(), Some("cup"));
        assert_eq!(arbiter.decide(&[focused("cup")], t + ms(1_000), &mut state), None);
        assert!(arbiter
            .decide(&[focused("cup")], t + ms(3_001), &mut state)
            .is_some());
    }

    #[test]
    fn peripheral_danger_is_ignored() {
        let arbiter = AlertArbiter::default();
        let mut state = AlertState::new();
        let frame = [classified("person", false, true)];
        assert_eq!(arbiter.decide(&frame, Instant::now(), &mut state), None);
    }
}
