//! # Safety Gate — four-condition admission for pre-confirmation action
//!
//! Any enforcement taken before a threat is confirmed must clear all four
//! conditions. Confirmed threats never come through here; they use the
//! normal verdict path.

use tracing::debug;

use netward_core::config::BeliefConfig;
use netward_core::types::{AlertLevel, EnforcementAction};

use crate::types::{GateDecision, PreemptiveCandidate};

#[derive(Debug, Clone, Copy)]
pub struct SafetyGate {
    preemptive_gate: f64,
    confirmed_threshold: f64,
}

impl SafetyGate {
    pub fn new(preemptive_gate: f64, confirmed_threshold: f64) -> Self {
        Self {
            preemptive_gate,
            confirmed_threshold,
        }
    }

    pub fn from_config(c: &BeliefConfig) -> Self {
        Self::new(c.preemptive_gate, c.confirmed_threshold)
    }

    /// All four conditions must hold:
    /// 1. requested action is in the low-impact whitelist
    /// 2. alert level is exactly early_warning
    /// 3. predicted confidence clears the preemptive gate
    /// 4. current confidence is still below the confirmed threshold
    pub fn review(&self, candidate: &PreemptiveCandidate) -> GateDecision {
        let allowed = matches!(
            candidate.requested_action,
            EnforcementAction::RateLimit | EnforcementAction::ElevatedMonitor
        );
        if !allowed {
            return self.reject(candidate, format!(
                "action '{}' is not a permitted preemptive action",
                candidate.requested_action
            ));
        }

        if candidate.alert_level != AlertLevel::EarlyWarning {
            return self.reject(candidate, format!(
                "alert level '{}' is not early_warning",
                candidate.alert_level
            ));
        }

        if candidate.predicted_confidence < self.preemptive_gate {
            return self.reject(candidate, format!(
                "predicted confidence {:.2} below preemptive gate {:.2}",
                candidate.predicted_confidence, self.preemptive_gate
            ));
        }

        if candidate.current_confidence >= self.confirmed_threshold {
            return self.reject(candidate, format!(
                "current confidence {:.2} already at confirmed threshold {:.2}",
                candidate.current_confidence, self.confirmed_threshold
            ));
        }

        GateDecision::Approved
    }

    fn reject(&self, candidate: &PreemptiveCandidate, reason: String) -> GateDecision {
        debug!(
            source = %candidate.source,
            action = %candidate.requested_action,
            reason = %reason,
            "Preemptive candidate rejected"
        );
        GateDecision::Rejected { reason }
    }
}
