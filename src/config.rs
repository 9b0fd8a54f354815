//! Engine configuration
//!
//! Every tunable constant of the engine lives here. All fields have defaults so
//! a partial JSON document (or `{}`) yields a usable configuration.

use crate::error::SignalError;
use serde::{Deserialize, Serialize};

/// Default tick cadence (5 seconds)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;

/// Default sampler counting window (15 seconds)
pub const DEFAULT_SAMPLER_WINDOW_MS: u64 = 15_000;

/// Default realistic typing speed ceiling in keys/min
pub const DEFAULT_TYPING_SPEED_CEILING: f64 = 220.0;

/// Default session summary window (10 minutes)
pub const DEFAULT_SESSION_WINDOW_MS: u64 = 600_000;

/// Default sustained-flow confirmation threshold (30 seconds)
pub const DEFAULT_EPISODE_CONFIRM_MS: u64 = 30_000;

/// Tunable constants for sampling, analysis, state tracking and sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between ticks in milliseconds
    pub tick_interval_ms: u64,

    // Sampler
    /// Duration of the sampler's counting window
    pub sampler_window_ms: u64,
    /// Ceiling applied to raw typing speed (keys/min) to suppress paste bursts
    pub typing_speed_ceiling: f64,

    // Analyzer
    /// Focus score reported while the editor window is focused
    pub focused_score: u8,
    /// Focus score reported while the editor window is not focused
    pub unfocused_score: u8,
    /// Typing speed above which burnout risk is High
    pub burnout_high_speed: f64,
    /// Typing speed above which burnout risk is Moderate
    pub burnout_moderate_speed: f64,
    /// Weight of the focus score in the stability index
    pub stability_focus_weight: f64,
    /// Typing speed at which the speed term of the stability index saturates
    pub stability_speed_cap: f64,
    /// Maximum contribution of the speed term to the stability index
    pub stability_speed_weight: f64,

    // Episode tracker
    /// Focus score an episode requires (exclusive)
    pub episode_min_focus: u8,
    /// Lowest qualifying typing speed (inclusive)
    pub episode_min_speed: f64,
    /// Highest qualifying typing speed (inclusive)
    pub episode_max_speed: f64,
    /// Duration after which a sustained episode is confirmed
    pub episode_confirm_ms: u64,

    // Session
    /// Length of a session summary window
    pub session_window_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            sampler_window_ms: DEFAULT_SAMPLER_WINDOW_MS,
            typing_speed_ceiling: DEFAULT_TYPING_SPEED_CEILING,
            focused_score: 80,
            unfocused_score: 30,
            burnout_high_speed: 180.0,
            burnout_moderate_speed: 140.0,
            stability_focus_weight: 0.6,
            stability_speed_cap: 200.0,
            stability_speed_weight: 40.0,
            episode_min_focus: 75,
            episode_min_speed: 80.0,
            episode_max_speed: 160.0,
            episode_confirm_ms: DEFAULT_EPISODE_CONFIRM_MS,
            session_window_ms: DEFAULT_SESSION_WINDOW_MS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, SignalError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, SignalError> {
        serde_json::to_string_pretty(self).map_err(SignalError::JsonError)
    }

    /// Check that the constants describe a coherent policy
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be greater than zero");
        }
        if self.sampler_window_ms == 0 {
            return invalid("sampler_window_ms must be greater than zero");
        }
        if self.session_window_ms == 0 {
            return invalid("session_window_ms must be greater than zero");
        }

        let floats = [
            ("typing_speed_ceiling", self.typing_speed_ceiling),
            ("burnout_high_speed", self.burnout_high_speed),
            ("burnout_moderate_speed", self.burnout_moderate_speed),
            ("stability_focus_weight", self.stability_focus_weight),
            ("stability_speed_cap", self.stability_speed_cap),
            ("stability_speed_weight", self.stability_speed_weight),
            ("episode_min_speed", self.episode_min_speed),
            ("episode_max_speed", self.episode_max_speed),
        ];
        for (name, value) in floats {
            if !value.is_finite() || value < 0.0 {
                return invalid(&format!("{name} must be a finite non-negative number"));
            }
        }

        if self.typing_speed_ceiling == 0.0 {
            return invalid("typing_speed_ceiling must be greater than zero");
        }
        if self.stability_speed_cap == 0.0 {
            return invalid("stability_speed_cap must be greater than zero");
        }
        if self.focused_score > 100 || self.unfocused_score > 100 {
            return invalid("focus scores must lie in 0..=100");
        }
        if self.burnout_moderate_speed > self.burnout_high_speed {
            return invalid("burnout_moderate_speed must not exceed burnout_high_speed");
        }
        if self.episode_min_speed > self.episode_max_speed {
            return invalid("episode_min_speed must not exceed episode_max_speed");
        }

        // Worst case: focus 100 and speed at or above the cap
        let max_stability = self.stability_focus_weight * 100.0 + self.stability_speed_weight;
        if max_stability > 100.0 + f64::EPSILON {
            return invalid(&format!(
                "stability terms can reach {max_stability:.1}, must be at most 100"
            ));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> Result<(), SignalError> {
    Err(SignalError::InvalidConfig(msg.to_string()))
}
