//! Risk-stage value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use netward_core::types::{EnforcementAction, ThreatCategory};

/// One per-source threat finding entering the risk stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatObservation {
    pub source: String,
    pub threat_type: ThreatCategory,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub addr: String,
    pub threat_type: ThreatCategory,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub src: String,
    pub dst: String,
    pub threat_type: ThreatCategory,
    pub weight: f64,
}

/// Built fresh per batch; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttackGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl AttackGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn max_confidence(&self) -> f64 {
        self.nodes.iter().map(|n| n.confidence).fold(0.0, f64::max)
    }
}

/// One simulated lateral-movement trial. Ephemeral; consumed only by
/// aggregation.
#[derive(Debug, Clone)]
pub struct PropagationTrial {
    pub entry_node: String,
    pub nodes_reached: usize,
    pub path_length: usize,
    pub reached: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked containment recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub source: String,
    pub action: EnforcementAction,
    pub confidence: f64,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub avg_spread: f64,
    pub max_spread: f64,
    pub top_threats: Vec<ThreatObservation>,
    pub recommendations: Vec<Recommendation>,
    /// Unix seconds.
    pub timestamp: i64,
}
