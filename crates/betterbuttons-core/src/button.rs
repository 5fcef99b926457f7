//! Per-button press synthesis.
//!
//! Sensors such as the Hue dimmer report `press`, `hold` and `release`
//! phases instead of gestures. This module rebuilds exactly one
//! Single/Double/Long per physical activation from that stream:
//!
//! ```text
//!            Held                      Release
//!  Idle ─────────────▶ HeldActive ─────────────▶ Idle      (Long on entry)
//!   │ Press
//!   ▼        Release               Press, Release
//!  Pressed ─────────▶ ChainOpen ─────────────────▶ Idle    (Double)
//!                        │ window elapsed (tick)
//!                        └───────────────────────▶ Idle    (Single)
//! ```
//!
//! Long needs no debounce. Single and Double can only be told apart after
//! the window has passed, so the Single decision is made by [`ButtonState::on_tick`]
//! rather than on the inbound path.
//!
//! Transitions are pure: they take the state by value and return the next
//! state together with the event to deliver, if any.

use std::time::{Duration, Instant};

use crate::action::{ButtonAction, PressEvent};
use crate::capability::ButtonSpec;

/// Synthesis state of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Most recent raw symbol processed.
    pub last_action: ButtonAction,
    /// When `last_action` was recorded.
    pub action_time: Option<Instant>,
    /// 1 while a completed press/release cycle waits for a second one.
    pub press_chain: u8,
}

/// Coarse view of [`ButtonState`], mostly for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Idle,
    Pressed,
    PressChainOpen,
    HeldActive,
    /// Release seen without a preceding press; waits for the next input.
    Released,
}

/// Result of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: ButtonState,
    pub event: Option<PressEvent>,
}

impl Transition {
    fn quiet(state: ButtonState) -> Self {
        Self { state, event: None }
    }

    fn emit(state: ButtonState, event: PressEvent) -> Self {
        Self {
            state,
            event: Some(event),
        }
    }
}

impl ButtonState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ButtonPhase {
        match (self.last_action, self.press_chain) {
            (ButtonAction::Held, _) => ButtonPhase::HeldActive,
            (ButtonAction::Release, 1) => ButtonPhase::PressChainOpen,
            (ButtonAction::Release, _) => ButtonPhase::Released,
            (ButtonAction::Press, _) => ButtonPhase::Pressed,
            _ => ButtonPhase::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == ButtonPhase::Idle
    }

    /// Feed one raw symbol observed at `now`.
    pub fn on_action(self, action: ButtonAction, now: Instant) -> Transition {
        let previous = self.last_action;
        let mut next = ButtonState {
            last_action: action,
            action_time: Some(now),
            press_chain: self.press_chain,
        };

        match (action, previous) {
            (ButtonAction::Held, prev) if prev != ButtonAction::Held => {
                next.press_chain = 0;
                Transition::emit(next, PressEvent::Long)
            }
            (ButtonAction::Release, ButtonAction::Press) => {
                if self.press_chain == 1 {
                    Transition::emit(Self::settled(now), PressEvent::Double)
                } else {
                    next.press_chain = 1;
                    Transition::quiet(next)
                }
            }
            (ButtonAction::Release, ButtonAction::Held) => Transition::quiet(Self::settled(now)),
            _ => Transition::quiet(next),
        }
    }

    /// Periodic reconciliation: resolve an open press chain into a Single once
    /// more than `window` has passed since the release.
    pub fn on_tick(self, now: Instant, window: Duration) -> Transition {
        if self.phase() != ButtonPhase::PressChainOpen {
            return Transition::quiet(self);
        }

        let expired = self
            .action_time
            .map(|t| now.saturating_duration_since(t) > window)
            .unwrap_or(true);

        if expired {
            Transition::emit(Self::settled(now), PressEvent::Single)
        } else {
            Transition::quiet(self)
        }
    }

    fn settled(now: Instant) -> Self {
        Self {
            last_action: ButtonAction::None,
            action_time: Some(now),
            press_chain: 0,
        }
    }
}

/// One button of an admitted device: its static spec plus live state.
#[derive(Debug, Clone)]
pub struct Button {
    spec: ButtonSpec,
    state: ButtonState,
}

impl Button {
    pub fn new(spec: ButtonSpec) -> Self {
        Self {
            spec,
            state: ButtonState::idle(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ButtonSpec {
        &self.spec
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Apply a raw symbol, returning the event to deliver.
    pub fn handle(&mut self, action: ButtonAction, now: Instant) -> Option<PressEvent> {
        let transition = self.state.on_action(action, now);
        self.state = transition.state;
        transition.event
    }

    /// Apply the periodic flush, returning the event to deliver.
    pub fn tick(&mut self, now: Instant, window: Duration) -> Option<PressEvent> {
        let transition = self.state.on_tick(now, window);
        self.state = transition.state;
        transition.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    fn ms(t0: Instant, millis: u64) -> Instant {
        t0 + Duration::from_millis(millis)
    }

    fn button() -> Button {
        Button::new(ButtonSpec::all_gestures("On"))
    }

    /// Drive a button with (offset_ms, action) pairs, ticking every 100ms up to
    /// `until_ms`, and collect every emitted event.
    fn run(steps: &[(u64, ButtonAction)], until_ms: u64) -> (Vec<PressEvent>, Button) {
        let t0 = Instant::now();
        let mut b = button();
        let mut events = Vec::new();
        let mut steps = steps.iter().peekable();

        let mut now_ms = 0;
        while now_ms <= until_ms {
            while let Some((at, action)) = steps.peek() {
                if *at > now_ms {
                    break;
                }
                events.extend(b.handle(*action, ms(t0, *at)));
                steps.next();
            }
            if now_ms % 100 == 0 {
                events.extend(b.tick(ms(t0, now_ms), WINDOW));
            }
            now_ms += 10;
        }
        (events, b)
    }

    #[test]
    fn test_single_after_window() {
        let (events, b) = run(
            &[(0, ButtonAction::Press), (50, ButtonAction::Release)],
            1000,
        );
        assert_eq!(events, vec![PressEvent::Single]);
        assert!(b.state().is_idle());
    }

    #[test]
    fn test_single_not_emitted_before_window() {
        let t0 = Instant::now();
        let mut b = button();

        assert_eq!(b.handle(ButtonAction::Press, t0), None);
        assert_eq!(b.handle(ButtonAction::Release, ms(t0, 50)), None);
        assert_eq!(b.state().phase(), ButtonPhase::PressChainOpen);

        // Exactly at the window boundary nothing happens yet.
        assert_eq!(b.tick(ms(t0, 350), WINDOW), None);
        assert_eq!(b.tick(ms(t0, 351), WINDOW), Some(PressEvent::Single));
        assert_eq!(b.tick(ms(t0, 500), WINDOW), None);
    }

    #[test]
    fn test_double_within_window() {
        let (events, b) = run(
            &[
                (0, ButtonAction::Press),
                (50, ButtonAction::Release),
                (150, ButtonAction::Press),
                (200, ButtonAction::Release),
            ],
            1000,
        );
        assert_eq!(events, vec![PressEvent::Double]);
        assert!(b.state().is_idle());
    }

    #[test]
    fn test_double_survives_tick_between_presses() {
        let t0 = Instant::now();
        let mut b = button();

        b.handle(ButtonAction::Press, t0);
        b.handle(ButtonAction::Release, ms(t0, 100));
        b.handle(ButtonAction::Press, ms(t0, 350));
        // The chain is still open but the last action is a press, so the
        // flush must not fire even though the window has long passed.
        assert_eq!(b.tick(ms(t0, 700), WINDOW), None);
        assert_eq!(
            b.handle(ButtonAction::Release, ms(t0, 720)),
            Some(PressEvent::Double)
        );
    }

    #[test]
    fn test_two_slow_presses_are_two_singles() {
        let (events, _) = run(
            &[
                (0, ButtonAction::Press),
                (50, ButtonAction::Release),
                (600, ButtonAction::Press),
                (650, ButtonAction::Release),
            ],
            1500,
        );
        assert_eq!(events, vec![PressEvent::Single, PressEvent::Single]);
    }

    #[test]
    fn test_held_emits_long_immediately() {
        let t0 = Instant::now();
        let mut b = button();

        assert_eq!(b.handle(ButtonAction::Held, t0), Some(PressEvent::Long));
        assert_eq!(b.state().phase(), ButtonPhase::HeldActive);

        // Repeated hold reports do not produce more longs.
        assert_eq!(b.handle(ButtonAction::Held, ms(t0, 800)), None);
        assert_eq!(b.tick(ms(t0, 1500), WINDOW), None);

        assert_eq!(b.handle(ButtonAction::Release, ms(t0, 2000)), None);
        assert!(b.state().is_idle());
        assert_eq!(b.tick(ms(t0, 3000), WINDOW), None);
    }

    #[test]
    fn test_press_then_hold_is_only_long() {
        let (events, b) = run(
            &[
                (0, ButtonAction::Press),
                (400, ButtonAction::Held),
                (1200, ButtonAction::Held),
                (2000, ButtonAction::Release),
            ],
            3000,
        );
        assert_eq!(events, vec![PressEvent::Long]);
        assert!(b.state().is_idle());
    }

    #[test]
    fn test_hold_during_open_chain_clears_it() {
        let t0 = Instant::now();
        let mut b = button();

        b.handle(ButtonAction::Press, t0);
        b.handle(ButtonAction::Release, ms(t0, 50));
        b.handle(ButtonAction::Press, ms(t0, 100));
        assert_eq!(b.handle(ButtonAction::Held, ms(t0, 500)), Some(PressEvent::Long));
        assert_eq!(b.handle(ButtonAction::Release, ms(t0, 900)), None);

        // A fresh click afterwards is a single, not a double.
        b.handle(ButtonAction::Press, ms(t0, 2000));
        assert_eq!(b.handle(ButtonAction::Release, ms(t0, 2050)), None);
        assert_eq!(b.tick(ms(t0, 2400), WINDOW), Some(PressEvent::Single));
    }

    #[test]
    fn test_stray_release_is_not_a_single() {
        let t0 = Instant::now();
        let mut b = button();

        assert_eq!(b.handle(ButtonAction::Release, t0), None);
        assert_eq!(b.state().phase(), ButtonPhase::Released);
        assert_eq!(b.tick(ms(t0, 1000), WINDOW), None);
    }

    #[test]
    fn test_transitions_are_pure() {
        let t0 = Instant::now();
        let state = ButtonState::idle();

        let pressed = state.on_action(ButtonAction::Press, t0);
        assert_eq!(pressed.event, None);
        assert_eq!(state, ButtonState::idle());

        let released = pressed.state.on_action(ButtonAction::Release, ms(t0, 10));
        assert_eq!(released.state.press_chain, 1);
        assert_eq!(released.state.action_time, Some(ms(t0, 10)));

        // Same input twice gives the same answer.
        let a = released.state.on_tick(ms(t0, 400), WINDOW);
        let b = released.state.on_tick(ms(t0, 400), WINDOW);
        assert_eq!(a, b);
        assert_eq!(a.event, Some(PressEvent::Single));
    }
}
