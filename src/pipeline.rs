//! Tick pipeline orchestration
//!
//! This module provides the public API of the engine. A [`SignalProcessor`]
//! owns every piece of per-session state (sampler window, state engine,
//! session totals) and runs the full pipeline once per tick:
//! Sampler → Analyzer → Classifier + State Engine + Aggregator → Sink.

use crate::analyzer::SignalAnalyzer;
use crate::config::EngineConfig;
use crate::error::SignalError;
use crate::profile::ProfileClassifier;
use crate::sampler::{EventCounter, MetricsSampler, MetricsSource};
use crate::session::SessionAggregator;
use crate::sink::Sink;
use crate::state::{StateEngine, StateOutcome};
use crate::types::{
    AnalyzedSignals, DashboardUpdate, Notification, Profile, RawSnapshot, SessionSummary,
};
use log::debug;

/// Convert a single snapshot into a dashboard payload (stateless, one-shot).
///
/// Uses the default configuration; no state or episode tracking is involved.
pub fn snapshot_to_dashboard(snapshot: &RawSnapshot) -> DashboardUpdate {
    let signals = SignalAnalyzer::default().analyze(snapshot);
    let profile = ProfileClassifier::classify(&signals);
    DashboardUpdate::new(&signals, &profile)
}

/// Everything computed during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub now_ms: u64,
    pub snapshot: RawSnapshot,
    pub signals: AnalyzedSignals,
    pub profile: Profile,
    pub outcome: StateOutcome,
    /// Summary flushed on this tick, if the session window elapsed
    pub summary: Option<SessionSummary>,
}

/// Stateful processor composing the engine components.
///
/// Ticks take `&mut self`, so they are serialized by construction.
pub struct SignalProcessor<S: MetricsSource = MetricsSampler> {
    config: EngineConfig,
    source: S,
    analyzer: SignalAnalyzer,
    state: StateEngine,
    session: SessionAggregator,
    ticks: u64,
}

impl SignalProcessor<MetricsSampler> {
    /// Create a processor sampling a fresh [`EventCounter`], with its first
    /// window and session starting at `start_ms`
    pub fn new(config: EngineConfig, start_ms: u64) -> Result<Self, SignalError> {
        let sampler = MetricsSampler::new(EventCounter::new(), &config, start_ms);
        Self::with_source(sampler, config, start_ms)
    }

    /// Handle for delivering raw events into this processor
    pub fn counter(&self) -> EventCounter {
        self.source.counter()
    }
}

impl<S: MetricsSource> SignalProcessor<S> {
    /// Create a processor around any metrics source
    pub fn with_source(source: S, config: EngineConfig, start_ms: u64) -> Result<Self, SignalError> {
        config.validate()?;
        Ok(Self {
            analyzer: SignalAnalyzer::new(&config),
            state: StateEngine::new(&config),
            session: SessionAggregator::new(&config, start_ms),
            source,
            config,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state_engine(&self) -> &StateEngine {
        &self.state
    }

    pub fn session(&self) -> &SessionAggregator {
        &self.session
    }

    /// Number of ticks processed so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Run the pipeline for the tick at `now_ms` and forward results to `sink`.
    ///
    /// Engine state (sampler window, announced state, episode, session totals)
    /// is committed before delivery. When the sink fails, the error is returned
    /// and that tick's update and notifications are not delivered again.
    pub fn tick<K: Sink + ?Sized>(
        &mut self,
        now_ms: u64,
        sink: &mut K,
    ) -> Result<TickReport, SignalError> {
        self.ticks += 1;

        // Stage 1: Sample raw metrics
        let snapshot = self.source.snapshot(now_ms);

        // Stage 2: Analyze
        let signals = self.analyzer.analyze(&snapshot);

        // Stage 3: Classify profile
        let profile = ProfileClassifier::classify(&signals);

        // Stage 4: State engine and episode tracking
        let outcome = self.state.evaluate(&signals, &snapshot, now_ms);

        // Stage 5: Session accumulation
        self.session
            .accumulate(&signals, self.state.max_episode_duration_ms());

        debug!(
            "tick {} at {}ms: speed {:.1}, focus {}, burnout {}, stability {}, state {}",
            self.ticks,
            now_ms,
            signals.typing_speed,
            signals.focus_score,
            signals.burnout_risk,
            signals.stability_index,
            outcome.state
        );

        // Stage 6: Deliver
        sink.publish(&DashboardUpdate::new(&signals, &profile))?;

        if let Some((from, to)) = outcome.transition {
            sink.notify(&Notification::StateTransition { from, to })?;
        }

        if let Some(duration_ms) = outcome.episode_confirmed_ms {
            sink.notify(&Notification::EpisodeConfirmed { duration_ms })?;
        }

        let summary = self.session.maybe_flush(now_ms);
        if let Some(summary) = &summary {
            self.state.reset_session_max();
            sink.notify(&Notification::SessionSummary(summary.clone()))?;
        }

        Ok(TickReport {
            now_ms,
            snapshot,
            signals,
            profile,
            outcome,
            summary,
        })
    }

    /// Force a session summary now (e.g. on shutdown) and start a new session
    pub fn flush_session<K: Sink + ?Sized>(
        &mut self,
        now_ms: u64,
        sink: &mut K,
    ) -> Result<SessionSummary, SignalError> {
        let summary = self.session.flush(now_ms);
        self.state.reset_session_max();
        sink.notify(&Notification::SessionSummary(summary.clone()))?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use crate::types::{BurnoutRisk, CognitiveState};
    use pretty_assertions::assert_eq;

    const TICK_MS: u64 = 5_000;

    /// Source replaying fixed snapshots
    struct FixedSource(RawSnapshot);

    impl MetricsSource for FixedSource {
        fn snapshot(&mut self, _now_ms: u64) -> RawSnapshot {
            self.0
        }
    }

    fn fixed(typing_speed: f64, is_focused: bool) -> FixedSource {
        FixedSource(RawSnapshot {
            keystroke_count: 0,
            window_elapsed_ms: TICK_MS,
            is_focused,
            typing_speed,
        })
    }

    fn count_transitions(sink: &CollectingSink) -> usize {
        sink.notifications
            .iter()
            .filter(|n| matches!(n, Notification::StateTransition { .. }))
            .count()
    }

    fn count_episodes(sink: &CollectingSink) -> usize {
        sink.notifications
            .iter()
            .filter(|n| matches!(n, Notification::EpisodeConfirmed { .. }))
            .count()
    }

    #[test]
    fn test_snapshot_to_dashboard() {
        let update = snapshot_to_dashboard(&RawSnapshot {
            keystroke_count: 60,
            window_elapsed_ms: 60_000,
            is_focused: true,
            typing_speed: 60.0,
        });

        assert_eq!(update.typing_speed, 60.0);
        assert_eq!(update.focus, 80);
        assert_eq!(update.burnout, BurnoutRisk::Low);
        assert_eq!(update.stability, 60);
        assert_eq!(update.title, "Balanced Developer");
    }

    #[test]
    fn test_tick_from_counted_keystrokes() {
        let mut processor = SignalProcessor::new(EngineConfig::default(), 0).unwrap();
        processor.counter().record_keystrokes(60);

        let mut sink = CollectingSink::new();
        let report = processor.tick(60_000, &mut sink).unwrap();

        assert_eq!(report.snapshot.typing_speed, 60.0);
        assert_eq!(report.signals.focus_score, 80);
        assert_eq!(report.signals.burnout_risk, BurnoutRisk::Low);
        assert_eq!(report.signals.stability_index, 60);
        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].stability, 60);
    }

    #[test]
    fn test_sustained_state_notifies_once() {
        let mut processor =
            SignalProcessor::with_source(fixed(0.0, true), EngineConfig::default(), 0).unwrap();
        let mut sink = CollectingSink::new();

        for tick in 1..=10 {
            processor.tick(tick * TICK_MS, &mut sink).unwrap();
        }

        assert_eq!(sink.updates.len(), 10);
        assert_eq!(count_transitions(&sink), 1);
        assert_eq!(
            sink.notifications[0],
            Notification::StateTransition {
                from: CognitiveState::Normal,
                to: CognitiveState::Thinking,
            }
        );
    }

    #[test]
    fn test_flow_episode_scenario() {
        let mut processor =
            SignalProcessor::with_source(fixed(130.0, true), EngineConfig::default(), 0).unwrap();
        let mut sink = CollectingSink::new();

        let mut confirmed_on = Vec::new();
        for tick in 1..=7 {
            let report = processor.tick(tick * TICK_MS, &mut sink).unwrap();
            assert_eq!(report.signals.focus_score, 80);
            if report.outcome.episode_confirmed_ms.is_some() {
                confirmed_on.push(tick);
            }
        }

        assert_eq!(confirmed_on, vec![6]);
        assert_eq!(count_episodes(&sink), 1);
        assert!(sink
            .messages()
            .contains(&"Flow state active (30s)".to_string()));
        assert!(processor.state_engine().episodes().is_open());
    }

    #[test]
    fn test_session_summary_flushes_and_resets() {
        let mut processor =
            SignalProcessor::with_source(fixed(130.0, true), EngineConfig::default(), 0).unwrap();
        let mut sink = CollectingSink::new();

        let mut summaries = Vec::new();
        for tick in 1..=121 {
            if let Some(summary) = processor.tick(tick * TICK_MS, &mut sink).unwrap().summary {
                summaries.push((tick, summary));
            }
        }

        assert_eq!(summaries.len(), 1);
        let (tick, summary) = &summaries[0];
        assert_eq!(*tick, 121);
        assert_eq!(summary.tick_count, 121);
        assert_eq!(summary.average_focus, 80);
        assert_eq!(summary.peak_typing_speed, 130.0);
        assert_eq!(summary.burnout_ticks, 0);
        assert_eq!(summary.longest_episode_minutes, 0.5);

        assert_eq!(processor.state_engine().max_episode_duration_ms(), 0);
        assert_eq!(processor.session().current().tick_count, 0);
        assert!(matches!(
            sink.notifications.last(),
            Some(Notification::SessionSummary(_))
        ));
    }

    #[test]
    fn test_flush_session_with_no_ticks() {
        let mut processor = SignalProcessor::new(EngineConfig::default(), 0).unwrap();
        let mut sink = CollectingSink::new();

        let summary = processor.flush_session(1_000, &mut sink).unwrap();
        assert_eq!(summary.tick_count, 0);
        assert_eq!(summary.average_focus, 0);
        assert_eq!(sink.notifications.len(), 1);
    }

    #[test]
    fn test_burst_typing_triggers_burnout_once() {
        let mut processor = SignalProcessor::new(EngineConfig::default(), 0).unwrap();
        let counter = processor.counter();
        let mut sink = CollectingSink::new();

        // 5 keys in 5s = 60/min, normal
        counter.record_keystrokes(5);
        processor.tick(5_000, &mut sink).unwrap();
        assert_eq!(count_transitions(&sink), 0);

        // Paste-like burst, capped at 220/min -> High burnout
        counter.record_keystrokes(500);
        let report = processor.tick(10_000, &mut sink).unwrap();
        assert_eq!(report.snapshot.typing_speed, 220.0);
        assert_eq!(report.outcome.state, CognitiveState::Burnout);

        counter.record_keystrokes(500);
        processor.tick(15_000, &mut sink).unwrap();
        assert_eq!(count_transitions(&sink), 1);
        assert_eq!(processor.session().current().burnout_tick_count, 2);
    }

    /// Sink rejecting every notification
    struct RejectingNotifications(CollectingSink);

    impl Sink for RejectingNotifications {
        fn publish(&mut self, update: &DashboardUpdate) -> Result<(), SignalError> {
            self.0.publish(update)
        }

        fn notify(&mut self, _notification: &Notification) -> Result<(), SignalError> {
            Err(SignalError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "closed",
            )))
        }
    }

    #[test]
    fn test_failed_delivery_forfeits_notification() {
        let mut processor =
            SignalProcessor::with_source(fixed(0.0, true), EngineConfig::default(), 0).unwrap();

        let mut failing = RejectingNotifications(CollectingSink::new());
        assert!(matches!(
            processor.tick(TICK_MS, &mut failing),
            Err(SignalError::Io(_))
        ));
        assert_eq!(failing.0.updates.len(), 1);
        assert_eq!(
            processor.state_engine().current_state(),
            CognitiveState::Thinking
        );
        assert_eq!(processor.session().current().tick_count, 1);

        let mut sink = CollectingSink::new();
        processor.tick(2 * TICK_MS, &mut sink).unwrap();
        assert_eq!(count_transitions(&sink), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            tick_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SignalProcessor::new(config, 0),
            Err(SignalError::InvalidConfig(_))
        ));
    }
}
