//! Cognitive state engine
//!
//! Two independent trackers run every tick:
//!
//! - a discrete state classifier (ordered rule table, first match wins) whose
//!   transitions are edge-triggered: a transition is reported only when the
//!   computed state differs from the last announced one;
//! - an episode tracker detecting sustained flow periods with a looser
//!   qualifying condition, confirming an episode once it crosses a duration
//!   threshold and then starting over.

use crate::config::EngineConfig;
use crate::types::{AnalyzedSignals, BurnoutRisk, CognitiveState, RawSnapshot};
use log::{debug, info};

/// A single `(predicate, state)` classification rule
pub struct StateRule {
    pub predicate: fn(&AnalyzedSignals) -> bool,
    pub state: CognitiveState,
}

/// State rules in priority order. The deep focus threshold is stricter than
/// the episode qualifying band.
pub const STATE_RULES: &[StateRule] = &[
    StateRule {
        predicate: is_burning_out,
        state: CognitiveState::Burnout,
    },
    StateRule {
        predicate: is_deep_focus,
        state: CognitiveState::DeepFocus,
    },
    StateRule {
        predicate: is_context_switching,
        state: CognitiveState::ContextSwitch,
    },
    StateRule {
        predicate: is_thinking,
        state: CognitiveState::Thinking,
    },
];

fn is_burning_out(signals: &AnalyzedSignals) -> bool {
    signals.burnout_risk == BurnoutRisk::High
}

fn is_deep_focus(signals: &AnalyzedSignals) -> bool {
    signals.focus_score > 75 && signals.typing_speed > 120.0
}

fn is_context_switching(signals: &AnalyzedSignals) -> bool {
    signals.focus_score < 40 && signals.typing_speed < 40.0
}

fn is_thinking(signals: &AnalyzedSignals) -> bool {
    signals.typing_speed == 0.0 && signals.focus_score > 70
}

/// Compute the cognitive state for a tick; `Normal` when no rule matches
pub fn classify_state(signals: &AnalyzedSignals) -> CognitiveState {
    STATE_RULES
        .iter()
        .find(|rule| (rule.predicate)(signals))
        .map(|rule| rule.state)
        .unwrap_or(CognitiveState::Normal)
}

/// Flow episode bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeTracker {
    episode_start_ms: Option<u64>,
    max_episode_duration_ms: u64,
}

impl EpisodeTracker {
    /// Start of the open episode, if any
    pub fn episode_start_ms(&self) -> Option<u64> {
        self.episode_start_ms
    }

    pub fn is_open(&self) -> bool {
        self.episode_start_ms.is_some()
    }

    /// Longest episode duration seen since the last reset
    pub fn max_episode_duration_ms(&self) -> u64 {
        self.max_episode_duration_ms
    }

    /// Forget the recorded maximum (called when a session is flushed)
    pub fn reset_max(&mut self) {
        self.max_episode_duration_ms = 0;
    }

    /// Advance the tracker by one tick.
    ///
    /// `open_at_ms` is the start credited to a newly opened episode. Returns the
    /// episode duration when the episode is confirmed on this tick.
    pub fn observe(
        &mut self,
        qualifies: bool,
        now_ms: u64,
        open_at_ms: u64,
        confirm_ms: u64,
    ) -> Option<u64> {
        if !qualifies {
            if let Some(start) = self.episode_start_ms.take() {
                debug!("flow episode interrupted after {}ms", now_ms.saturating_sub(start));
            }
            return None;
        }

        if self.episode_start_ms.is_some_and(|start| now_ms < start) {
            debug!("clock moved back to {}ms; restarting flow episode", now_ms);
            self.episode_start_ms = None;
        }

        let start = *self.episode_start_ms.get_or_insert(open_at_ms.min(now_ms));
        let duration_ms = now_ms.saturating_sub(start);
        self.max_episode_duration_ms = self.max_episode_duration_ms.max(duration_ms);

        if duration_ms >= confirm_ms {
            // Confirmed episodes close so the next one has to accumulate again
            self.episode_start_ms = None;
            Some(duration_ms)
        } else {
            None
        }
    }
}

/// Result of evaluating one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateOutcome {
    /// State computed for this tick
    pub state: CognitiveState,
    /// `(from, to)` when the computed state differs from the last announced one
    pub transition: Option<(CognitiveState, CognitiveState)>,
    /// Duration of a flow episode confirmed on this tick
    pub episode_confirmed_ms: Option<u64>,
}

/// Stateful engine combining the state classifier and the episode tracker
#[derive(Debug, Clone)]
pub struct StateEngine {
    current: CognitiveState,
    episodes: EpisodeTracker,
    last_tick_ms: Option<u64>,
    tick_interval_ms: u64,
    episode_min_focus: u8,
    episode_min_speed: f64,
    episode_max_speed: f64,
    episode_confirm_ms: u64,
}

impl Default for StateEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl StateEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            current: CognitiveState::Normal,
            episodes: EpisodeTracker::default(),
            last_tick_ms: None,
            tick_interval_ms: config.tick_interval_ms,
            episode_min_focus: config.episode_min_focus,
            episode_min_speed: config.episode_min_speed,
            episode_max_speed: config.episode_max_speed,
            episode_confirm_ms: config.episode_confirm_ms,
        }
    }

    /// Last announced state
    pub fn current_state(&self) -> CognitiveState {
        self.current
    }

    pub fn episodes(&self) -> &EpisodeTracker {
        &self.episodes
    }

    /// Longest flow episode since the last session reset
    pub fn max_episode_duration_ms(&self) -> u64 {
        self.episodes.max_episode_duration_ms()
    }

    /// Reset the longest-episode record at a session boundary
    pub fn reset_session_max(&mut self) {
        self.episodes.reset_max();
    }

    /// Evaluate the tick at `now_ms`
    pub fn evaluate(
        &mut self,
        signals: &AnalyzedSignals,
        snapshot: &RawSnapshot,
        now_ms: u64,
    ) -> StateOutcome {
        let state = classify_state(signals);
        let transition = if state != self.current {
            let from = std::mem::replace(&mut self.current, state);
            info!("cognitive state changed: {} -> {}", from, state);
            Some((from, state))
        } else {
            None
        };

        // A new episode is credited from the previous tick, but never with
        // more than one tick interval.
        let one_tick_back = now_ms.saturating_sub(self.tick_interval_ms);
        let open_at_ms = self
            .last_tick_ms
            .map_or(one_tick_back, |last| last.max(one_tick_back));
        let episode_confirmed_ms = self.episodes.observe(
            self.qualifies_for_episode(signals, snapshot),
            now_ms,
            open_at_ms,
            self.episode_confirm_ms,
        );
        if let Some(duration_ms) = episode_confirmed_ms {
            info!("flow episode confirmed after {}ms", duration_ms);
        }

        self.last_tick_ms = Some(now_ms);

        StateOutcome {
            state,
            transition,
            episode_confirmed_ms,
        }
    }

    fn qualifies_for_episode(&self, signals: &AnalyzedSignals, snapshot: &RawSnapshot) -> bool {
        signals.focus_score > self.episode_min_focus
            && signals.typing_speed >= self.episode_min_speed
            && signals.typing_speed <= self.episode_max_speed
            && snapshot.is_focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_MS: u64 = 5_000;

    fn signals(focus_score: u8, typing_speed: f64, burnout_risk: BurnoutRisk) -> AnalyzedSignals {
        AnalyzedSignals {
            typing_speed,
            focus_score,
            burnout_risk,
            stability_index: 50,
        }
    }

    fn focused() -> RawSnapshot {
        RawSnapshot {
            is_focused: true,
            ..RawSnapshot::default()
        }
    }

    fn flow() -> AnalyzedSignals {
        signals(80, 130.0, BurnoutRisk::Low)
    }

    #[test]
    fn test_rule_priority() {
        // Burnout wins over everything
        assert_eq!(
            classify_state(&signals(80, 200.0, BurnoutRisk::High)),
            CognitiveState::Burnout
        );
        assert_eq!(
            classify_state(&signals(80, 121.0, BurnoutRisk::Low)),
            CognitiveState::DeepFocus
        );
        assert_eq!(
            classify_state(&signals(30, 39.0, BurnoutRisk::Low)),
            CognitiveState::ContextSwitch
        );
        assert_eq!(
            classify_state(&signals(80, 0.0, BurnoutRisk::Low)),
            CognitiveState::Thinking
        );
        assert_eq!(
            classify_state(&signals(80, 60.0, BurnoutRisk::Low)),
            CognitiveState::Normal
        );
    }

    #[test]
    fn test_idle_and_unfocused_is_context_switch_not_thinking() {
        assert_eq!(
            classify_state(&signals(30, 0.0, BurnoutRisk::Low)),
            CognitiveState::ContextSwitch
        );
    }

    #[test]
    fn test_initial_state_is_normal_and_silent() {
        let mut engine = StateEngine::default();
        assert_eq!(engine.current_state(), CognitiveState::Normal);

        let outcome = engine.evaluate(&signals(80, 60.0, BurnoutRisk::Low), &focused(), TICK_MS);
        assert_eq!(outcome.state, CognitiveState::Normal);
        assert!(outcome.transition.is_none());
    }

    #[test]
    fn test_transitions_are_edge_triggered() {
        let mut engine = StateEngine::default();
        let input = signals(80, 0.0, BurnoutRisk::Low);

        let transitions = (1..=10)
            .filter_map(|tick| engine.evaluate(&input, &focused(), tick * TICK_MS).transition)
            .count();

        assert_eq!(transitions, 1);
        assert_eq!(engine.current_state(), CognitiveState::Thinking);
    }

    #[test]
    fn test_burnout_announced_once() {
        let mut engine = StateEngine::default();
        let normal = signals(80, 60.0, BurnoutRisk::Low);
        let burnout = signals(80, 200.0, BurnoutRisk::High);

        assert!(engine.evaluate(&normal, &focused(), TICK_MS).transition.is_none());

        let outcome = engine.evaluate(&burnout, &focused(), 2 * TICK_MS);
        assert_eq!(
            outcome.transition,
            Some((CognitiveState::Normal, CognitiveState::Burnout))
        );

        let outcome = engine.evaluate(&burnout, &focused(), 3 * TICK_MS);
        assert_eq!(outcome.state, CognitiveState::Burnout);
        assert!(outcome.transition.is_none());
    }

    #[test]
    fn test_return_to_normal_is_announced() {
        let mut engine = StateEngine::default();
        engine.evaluate(&signals(80, 200.0, BurnoutRisk::High), &focused(), TICK_MS);

        let outcome = engine.evaluate(&signals(80, 60.0, BurnoutRisk::Low), &focused(), 2 * TICK_MS);
        assert_eq!(
            outcome.transition,
            Some((CognitiveState::Burnout, CognitiveState::Normal))
        );
    }

    #[test]
    fn test_sustained_episode_confirms_once_on_sixth_tick() {
        let mut engine = StateEngine::default();

        let confirmations: Vec<(u64, u64)> = (1..=7)
            .filter_map(|tick| {
                engine
                    .evaluate(&flow(), &focused(), tick * TICK_MS)
                    .episode_confirmed_ms
                    .map(|duration| (tick, duration))
            })
            .collect();

        assert_eq!(confirmations, vec![(6, 30_000)]);
        // Tick 7 reopened a fresh episode from tick 6
        assert_eq!(engine.episodes().episode_start_ms(), Some(30_000));
        assert_eq!(engine.max_episode_duration_ms(), 30_000);
    }

    #[test]
    fn test_episode_closes_immediately_on_interruption() {
        let mut engine = StateEngine::default();
        engine.evaluate(&flow(), &focused(), TICK_MS);
        engine.evaluate(&flow(), &focused(), 2 * TICK_MS);
        assert!(engine.episodes().is_open());

        // Speed outside the qualifying band
        engine.evaluate(&signals(80, 60.0, BurnoutRisk::Low), &focused(), 3 * TICK_MS);
        assert!(!engine.episodes().is_open());
        assert_eq!(engine.max_episode_duration_ms(), 10_000);
    }

    #[test]
    fn test_episode_requires_window_focus() {
        let mut engine = StateEngine::default();
        engine.evaluate(&flow(), &RawSnapshot::default(), TICK_MS);
        assert!(!engine.episodes().is_open());
    }

    #[test]
    fn test_interruption_forfeits_progress() {
        let mut engine = StateEngine::default();
        for tick in 1..=4 {
            engine.evaluate(&flow(), &focused(), tick * TICK_MS);
        }
        engine.evaluate(&signals(30, 130.0, BurnoutRisk::Low), &focused(), 5 * TICK_MS);

        // Needs a full threshold again: reopened at tick 5, confirms at tick 11
        let confirmed: Vec<u64> = (6..=11)
            .filter_map(|tick| {
                engine
                    .evaluate(&flow(), &focused(), tick * TICK_MS)
                    .episode_confirmed_ms
                    .map(|_| tick)
            })
            .collect();
        assert_eq!(confirmed, vec![11]);
    }

    #[test]
    fn test_max_duration_is_monotonic_until_reset() {
        let mut engine = StateEngine::default();
        let mut previous = 0;
        let pattern = [true, true, true, false, true, false, true, true, true, true];

        for (i, qualifies) in pattern.iter().enumerate() {
            let input = if *qualifies {
                flow()
            } else {
                signals(80, 0.0, BurnoutRisk::Low)
            };
            engine.evaluate(&input, &focused(), (i as u64 + 1) * TICK_MS);
            assert!(engine.max_episode_duration_ms() >= previous);
            previous = engine.max_episode_duration_ms();
        }
        assert_eq!(previous, 20_000);

        engine.reset_session_max();
        assert_eq!(engine.max_episode_duration_ms(), 0);
    }

    #[test]
    fn test_deep_focus_band_is_stricter_than_episode_band() {
        let mut engine = StateEngine::default();
        let outcome = engine.evaluate(&signals(80, 100.0, BurnoutRisk::Low), &focused(), TICK_MS);

        assert_eq!(outcome.state, CognitiveState::Normal);
        assert!(engine.episodes().is_open());
    }

    #[test]
    fn test_tracker_handles_zero_input() {
        let mut tracker = EpisodeTracker::default();
        assert_eq!(tracker.observe(false, 0, 0, 30_000), None);
        assert_eq!(tracker.observe(true, 0, 0, 0), Some(0));
        assert!(!tracker.is_open());
    }

    #[test]
    fn test_episode_after_long_gap_credits_one_tick() {
        let mut engine = StateEngine::default();
        engine.evaluate(&signals(80, 0.0, BurnoutRisk::Low), &focused(), TICK_MS);

        // One qualifying tick an hour later is not a sustained episode
        let resumed_at = TICK_MS + 3_600_000;
        let outcome = engine.evaluate(&flow(), &focused(), resumed_at);
        assert_eq!(outcome.episode_confirmed_ms, None);
        assert_eq!(engine.max_episode_duration_ms(), TICK_MS);
        assert_eq!(engine.episodes().episode_start_ms(), Some(resumed_at - TICK_MS));

        let confirmed: Vec<u64> = (1..=5)
            .filter(|k| {
                engine
                    .evaluate(&flow(), &focused(), resumed_at + k * TICK_MS)
                    .episode_confirmed_ms
                    .is_some()
            })
            .collect();
        assert_eq!(confirmed, vec![5]);
    }

    #[test]
    fn test_clock_moving_backwards_restarts_episode() {
        let mut engine = StateEngine::default();
        assert_eq!(
            engine.evaluate(&flow(), &focused(), 100_000).episode_confirmed_ms,
            None
        );

        let outcome = engine.evaluate(&flow(), &focused(), 90_000);
        assert_eq!(outcome.episode_confirmed_ms, None);
        assert_eq!(engine.episodes().episode_start_ms(), Some(90_000));
        assert_eq!(engine.max_episode_duration_ms(), TICK_MS);
    }

    #[test]
    fn test_tracker_never_reports_negative_durations() {
        let mut tracker = EpisodeTracker::default();
        assert_eq!(tracker.observe(true, 100_000, 95_000, 30_000), None);
        assert_eq!(tracker.observe(true, 50_000, 45_000, 30_000), None);
        assert_eq!(tracker.episode_start_ms(), Some(45_000));
        assert_eq!(tracker.max_episode_duration_ms(), 5_000);
    }
}
