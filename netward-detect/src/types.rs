//! Detection-stage value types.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use netward_core::types::{AlertLevel, EnforcementAction, ThreatCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other,
}

/// One captured flow observation. Immutable once ingested; owned by the
/// statistics window until it ages out of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowObservation {
    /// Capture time, unix millis.
    pub ts_ms: i64,
    pub src: IpAddr,
    pub dst: IpAddr,
    pub dst_port: u16,
    pub protocol: Protocol,
    pub bytes: u64,
    pub syn_only: bool,
}

/// Per-category Monte-Carlo confidences, each the fraction of trials in
/// which that category's rule fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfidences {
    pub flood: f64,
    pub scan: f64,
    pub exfiltration: f64,
}

impl CategoryConfidences {
    /// Highest category and its confidence.
    pub fn top(&self) -> (ThreatCategory, f64) {
        let mut top = (ThreatCategory::Flood, self.flood);
        if self.scan > top.1 {
            top = (ThreatCategory::Scan, self.scan);
        }
        if self.exfiltration > top.1 {
            top = (ThreatCategory::Exfiltration, self.exfiltration);
        }
        top
    }
}

/// One estimator output for a (source, tick) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatEstimate {
    pub confidences: CategoryConfidences,
    pub top_category: ThreatCategory,
    pub top_confidence: f64,
    pub recommended_action: EnforcementAction,
}

/// One entry in a source's bounded belief history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefEntry {
    pub confidence: f64,
    pub category: ThreatCategory,
    /// Tick time, unix millis; monotonically increasing within a history.
    pub tick_ts: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Linear-regression trend over a source's belief history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    /// Confidence delta per second of the fitted line.
    pub slope_per_sec: f64,
    /// Extrapolated confidence one tick ahead, clamped to [0, 1].
    pub predicted_confidence: f64,
}

impl TrendSummary {
    pub fn flat(current: f64) -> Self {
        Self {
            direction: TrendDirection::Stable,
            slope_per_sec: 0.0,
            predicted_confidence: current,
        }
    }
}

/// The per-source result of one inference tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAssessment {
    pub source: IpAddr,
    pub estimate: ThreatEstimate,
    pub trend: TrendSummary,
    pub alert_level: AlertLevel,
}
