//! Decision Policy
//!
//! Maps a risk percentage to a recommended action. The cutoff is fixed;
//! a percentage equal to it stays on the follow-up side.

use serde::{Deserialize, Serialize};

/// Percentages strictly above this trigger an immediate appointment
pub const RISK_CUTOFF_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAction {
    /// Routine follow-up and check-ups
    FollowUp,
    /// Book a clinical appointment right away
    ImmediateAppointment,
}

impl RiskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskAction::FollowUp => "follow_up",
            RiskAction::ImmediateAppointment => "immediate_appointment",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskAction::FollowUp => "Follow-up recommended: schedule routine check-ups.",
            RiskAction::ImmediateAppointment => "Alert: book a clinical appointment immediately.",
        }
    }
}

impl std::fmt::Display for RiskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    cutoff_pct: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            cutoff_pct: RISK_CUTOFF_PCT,
        }
    }
}

impl DecisionPolicy {
    pub fn cutoff_pct(&self) -> f64 {
        self.cutoff_pct
    }

    pub fn decide(&self, risk_pct: f64) -> RiskAction {
        if risk_pct > self.cutoff_pct {
            RiskAction::ImmediateAppointment
        } else {
            RiskAction::FollowUp
        }
    }
}

/// Probability in [0, 1] to a percentage rounded to two decimals.
pub fn to_percentage(probability: f32) -> f64 {
    (f64::from(probability) * 100.0 * 100.0).round() / 100.0
}
