//! Core data types
//!
//! This module defines the values that flow through the per-tick pipeline:
//! raw snapshots, analyzed signals, profiles, cognitive states and the payloads
//! handed to sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Tick-scoped reading produced by a metrics source.
///
/// Fields missing from external input, or carrying non-numeric values, are
/// coerced to `0` / `false` instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Keystrokes counted in the current sampler window
    #[serde(default, deserialize_with = "lenient_u64")]
    pub keystroke_count: u64,
    /// Milliseconds elapsed since the sampler window started
    #[serde(default, deserialize_with = "lenient_u64")]
    pub window_elapsed_ms: u64,
    /// Whether the editor window currently has focus
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_focused: bool,
    /// Raw typing speed in keys/min, already capped at the sampler ceiling
    #[serde(default, deserialize_with = "lenient_f64")]
    pub typing_speed: f64,
}

/// Burnout risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurnoutRisk {
    Low,
    Moderate,
    High,
}

impl fmt::Display for BurnoutRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BurnoutRisk::Low => "Low",
            BurnoutRisk::Moderate => "Moderate",
            BurnoutRisk::High => "High",
        };
        f.write_str(label)
    }
}

/// Signals derived from a single snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedSignals {
    /// Typing speed in keys/min (never negative)
    pub typing_speed: f64,
    /// Focus score (0-100)
    pub focus_score: u8,
    /// Burnout risk band
    pub burnout_risk: BurnoutRisk,
    /// Composite cognitive stability index (0-100)
    pub stability_index: u8,
}

/// Human-readable characterization of the current signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub title: String,
    pub insight: String,
}

/// Discrete cognitive state computed every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CognitiveState {
    #[default]
    Normal,
    DeepFocus,
    ContextSwitch,
    Thinking,
    Burnout,
}

impl CognitiveState {
    /// Message announced when the engine transitions into this state
    pub fn announcement(&self) -> &'static str {
        match self {
            CognitiveState::Burnout => "High burnout risk detected. Take a short break.",
            CognitiveState::DeepFocus => "Deep Focus Mode detected. Protect this flow state.",
            CognitiveState::ContextSwitch => {
                "Frequent context switching detected. Try batching tasks."
            }
            CognitiveState::Thinking => "You appear to be thinking. Stay intentional.",
            CognitiveState::Normal => "Workflow stabilized.",
        }
    }
}

impl fmt::Display for CognitiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CognitiveState::Normal => "normal",
            CognitiveState::DeepFocus => "deepFocus",
            CognitiveState::ContextSwitch => "contextSwitch",
            CognitiveState::Thinking => "thinking",
            CognitiveState::Burnout => "burnout",
        };
        f.write_str(label)
    }
}

/// Flat per-tick payload for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUpdate {
    pub typing_speed: f64,
    pub focus: u8,
    pub burnout: BurnoutRisk,
    pub stability: u8,
    pub title: String,
    pub insight: String,
}

impl DashboardUpdate {
    pub fn new(signals: &AnalyzedSignals, profile: &Profile) -> Self {
        Self {
            typing_speed: signals.typing_speed,
            focus: signals.focus_score,
            burnout: signals.burnout_risk,
            stability: signals.stability_index,
            title: profile.title.clone(),
            insight: profile.insight.clone(),
        }
    }
}

/// Statistics flushed at the end of a session window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique session identifier
    pub session_id: String,
    /// Session start
    pub started_at: DateTime<Utc>,
    /// Session end (flush time)
    pub ended_at: DateTime<Utc>,
    /// Ticks accumulated in the session
    pub tick_count: u64,
    /// Average focus score, 0 when no ticks were accumulated
    pub average_focus: u64,
    /// Highest typing speed observed
    pub peak_typing_speed: f64,
    /// Number of ticks with High burnout risk
    pub burnout_ticks: u64,
    /// Longest flow episode in minutes (two decimals)
    pub longest_episode_minutes: f64,
}

/// Ad-hoc notification delivered to sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The computed cognitive state differs from the last announced one
    StateTransition {
        from: CognitiveState,
        to: CognitiveState,
    },
    /// A flow episode was sustained past the confirmation threshold
    EpisodeConfirmed { duration_ms: u64 },
    /// A session window elapsed
    SessionSummary(SessionSummary),
}

impl Notification {
    /// Human-readable rendering for display surfaces
    pub fn message(&self) -> String {
        match self {
            Notification::StateTransition { to, .. } => to.announcement().to_string(),
            Notification::EpisodeConfirmed { duration_ms } => {
                format!("Flow state active ({}s)", (*duration_ms as f64 / 1000.0).round())
            }
            Notification::SessionSummary(summary) => format!(
                "Session Summary\n\nAvg Focus: {}\nPeak Typing Speed: {:.0}\nBurnout Events: {}\nLongest Flow Duration: {:.2} mins",
                summary.average_focus,
                summary.peak_typing_speed,
                summary.burnout_ticks,
                summary.longest_episode_minutes
            ),
        }
    }
}

// ============================================================================
// Lenient deserialization
// ============================================================================

pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(non_negative_finite).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().and_then(non_negative_finite).unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(non_negative_finite)
            .unwrap_or(0.0),
        _ => 0.0,
    })
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(matches!(value, Value::Bool(true)))
}

fn non_negative_finite(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}
