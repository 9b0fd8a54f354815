//! Signal analysis
//!
//! Maps a tick's [`RawSnapshot`] to [`AnalyzedSignals`]. The focus score is
//! derived from the editor focus state (focused/unfocused bands); the burnout
//! thresholds and stability weights are tuned to that policy.

use crate::config::EngineConfig;
use crate::types::{AnalyzedSignals, BurnoutRisk, RawSnapshot};

/// Stateless analyzer holding the policy constants
#[derive(Debug, Clone)]
pub struct SignalAnalyzer {
    focused_score: u8,
    unfocused_score: u8,
    burnout_high_speed: f64,
    burnout_moderate_speed: f64,
    stability_focus_weight: f64,
    stability_speed_cap: f64,
    stability_speed_weight: f64,
}

impl Default for SignalAnalyzer {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SignalAnalyzer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            focused_score: config.focused_score,
            unfocused_score: config.unfocused_score,
            burnout_high_speed: config.burnout_high_speed,
            burnout_moderate_speed: config.burnout_moderate_speed,
            stability_focus_weight: config.stability_focus_weight,
            stability_speed_cap: config.stability_speed_cap,
            stability_speed_weight: config.stability_speed_weight,
        }
    }

    /// Derive signals from a snapshot
    pub fn analyze(&self, snapshot: &RawSnapshot) -> AnalyzedSignals {
        let typing_speed = sanitize_speed(snapshot.typing_speed);

        let focus_score = if snapshot.is_focused {
            self.focused_score
        } else {
            self.unfocused_score
        };

        let burnout_risk = self.burnout_risk(typing_speed);
        let stability_index = self.stability_index(focus_score, typing_speed);

        AnalyzedSignals {
            typing_speed,
            focus_score,
            burnout_risk,
            stability_index,
        }
    }

    fn burnout_risk(&self, typing_speed: f64) -> BurnoutRisk {
        if typing_speed > self.burnout_high_speed {
            BurnoutRisk::High
        } else if typing_speed > self.burnout_moderate_speed {
            BurnoutRisk::Moderate
        } else {
            BurnoutRisk::Low
        }
    }

    /// Composite cognitive stability index (0-100)
    ///
    /// Formula: `round(focus * 0.6 + min(speed, cap) / cap * weight)`
    fn stability_index(&self, focus_score: u8, typing_speed: f64) -> u8 {
        let focus_term = f64::from(focus_score) * self.stability_focus_weight;
        let speed_term = typing_speed.min(self.stability_speed_cap) / self.stability_speed_cap
            * self.stability_speed_weight;
        round_half_up(focus_term + speed_term).clamp(0.0, 100.0) as u8
    }
}

/// Treat negative or non-finite speeds as zero
fn sanitize_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        0.0
    }
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
