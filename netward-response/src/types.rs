//! Response-stage value types: verdicts, candidates, reports, gate decisions.

use serde::{Deserialize, Serialize};

use netward_core::types::{AlertLevel, EnforcementAction, StatisticsSnapshot};

/// A confirmed-threat verdict submitted for enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub source: String,
    pub predicted_category: String,
    pub confidence: f64,
    #[serde(default)]
    pub explanation: Option<String>,
    /// An explicit request always wins over the category fallback table.
    #[serde(default)]
    pub recommended_action: Option<EnforcementAction>,
    pub requester_id: String,
    /// Window statistics backing the verdict; absent stats record as zeros.
    #[serde(default)]
    pub stats: Option<StatisticsSnapshot>,
}

/// A pre-confirmation enforcement candidate; only the safety gate may
/// admit one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreemptiveCandidate {
    pub source: String,
    pub alert_level: AlertLevel,
    pub current_confidence: f64,
    pub predicted_confidence: f64,
    pub requested_action: EnforcementAction,
    pub requester_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub stats: Option<StatisticsSnapshot>,
}

/// The result of one enforcement decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementReport {
    pub action_taken: EnforcementAction,
    pub success: bool,
    pub responder_id: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Safety-gate outcome. Rejection is a designed result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Approved,
    Rejected { reason: String },
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateDecision::Approved)
    }
}
