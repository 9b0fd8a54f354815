//! Session aggregation
//!
//! Accumulates per-tick signals over a fixed session window and flushes a
//! [`SessionSummary`] when the window elapses, then starts a new session.

use crate::config::EngineConfig;
use crate::types::{AnalyzedSignals, BurnoutRisk, SessionSummary};
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use uuid::Uuid;

/// Milliseconds per minute
const MS_PER_MIN: f64 = 60_000.0;

/// Running totals of the current session.
///
/// Invariant: `tick_count >= burnout_tick_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAccumulator {
    pub session_id: String,
    pub session_start_ms: u64,
    pub tick_count: u64,
    pub focus_score_sum: u64,
    pub peak_typing_speed: f64,
    pub burnout_tick_count: u64,
    pub max_episode_duration_ms: u64,
}

impl SessionAccumulator {
    fn new(session_start_ms: u64) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            session_start_ms,
            tick_count: 0,
            focus_score_sum: 0,
            peak_typing_speed: 0.0,
            burnout_tick_count: 0,
            max_episode_duration_ms: 0,
        }
    }

    /// Average focus score rounded half-up; 0 when no ticks were accumulated
    pub fn average_focus(&self) -> u64 {
        if self.tick_count == 0 {
            return 0;
        }
        (self.focus_score_sum + self.tick_count / 2) / self.tick_count
    }
}

/// Session aggregator owning the [`SessionAccumulator`]
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    current: SessionAccumulator,
    window_ms: u64,
}

impl SessionAggregator {
    /// Create an aggregator whose first session starts at `start_ms`
    pub fn new(config: &EngineConfig, start_ms: u64) -> Self {
        Self {
            current: SessionAccumulator::new(start_ms),
            window_ms: config.session_window_ms,
        }
    }

    /// Totals of the session in progress
    pub fn current(&self) -> &SessionAccumulator {
        &self.current
    }

    /// Fold one tick into the session. `max_episode_duration_ms` is read from
    /// the state engine, which owns episode tracking.
    pub fn accumulate(&mut self, signals: &AnalyzedSignals, max_episode_duration_ms: u64) {
        let session = &mut self.current;
        session.tick_count += 1;
        session.focus_score_sum += u64::from(signals.focus_score);
        session.peak_typing_speed = session.peak_typing_speed.max(signals.typing_speed);
        if signals.burnout_risk == BurnoutRisk::High {
            session.burnout_tick_count += 1;
        }
        session.max_episode_duration_ms = session
            .max_episode_duration_ms
            .max(max_episode_duration_ms);
    }

    /// Flush a summary when more than the session window has elapsed
    pub fn maybe_flush(&mut self, now_ms: u64) -> Option<SessionSummary> {
        let elapsed_ms = now_ms.saturating_sub(self.current.session_start_ms);
        if elapsed_ms > self.window_ms {
            Some(self.flush(now_ms))
        } else {
            None
        }
    }

    /// Summarize the current session and start a new one at `now_ms`
    pub fn flush(&mut self, now_ms: u64) -> SessionSummary {
        let finished = std::mem::replace(&mut self.current, SessionAccumulator::new(now_ms));

        let summary = SessionSummary {
            session_id: finished.session_id.clone(),
            started_at: to_datetime(finished.session_start_ms),
            ended_at: to_datetime(now_ms),
            tick_count: finished.tick_count,
            average_focus: finished.average_focus(),
            peak_typing_speed: finished.peak_typing_speed,
            burnout_ticks: finished.burnout_tick_count,
            longest_episode_minutes: round_2dp(
                finished.max_episode_duration_ms as f64 / MS_PER_MIN,
            ),
        };

        info!(
            "session {} flushed: {} ticks, avg focus {}, {} burnout ticks",
            summary.session_id, summary.tick_count, summary.average_focus, summary.burnout_ticks
        );

        summary
    }
}

fn to_datetime(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
