//! # Risk Aggregator — trials and graph to a discrete risk level
//!
//! risk_score = 0.6·max_confidence + 0.4·avg_spread, clipped to [0, 1].
//! Levels cut at 0.70 / 0.40 / >0; a graph with zero edges and zero
//! simulated spread has no lateral path at all and is always `none`.

use tracing::debug;

use netward_core::types::{EnforcementAction, ThreatCategory};

use crate::types::{
    AttackGraph, PropagationTrial, Recommendation, RiskAssessment, RiskLevel, ThreatObservation,
};

const RISK_HIGH: f64 = 0.70;
const RISK_MEDIUM: f64 = 0.40;

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAggregator;

impl RiskAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, graph: &AttackGraph, trials: &[PropagationTrial]) -> RiskAssessment {
        let now = chrono::Utc::now().timestamp();

        if graph.nodes.is_empty() {
            return RiskAssessment {
                risk_level: RiskLevel::None,
                risk_score: 0.0,
                avg_spread: 0.0,
                max_spread: 0.0,
                top_threats: Vec::new(),
                recommendations: Vec::new(),
                timestamp: now,
            };
        }

        let total_nodes = graph.nodes.len().max(1) as f64;
        let (avg_spread, max_spread) = if trials.is_empty() {
            (0.0, 0.0)
        } else {
            let spreads: Vec<f64> = trials
                .iter()
                .map(|t| t.nodes_reached as f64 / total_nodes)
                .collect();
            let avg = spreads.iter().sum::<f64>() / spreads.len() as f64;
            let max = spreads.iter().fold(0.0, |a: f64, &b| a.max(b));
            (avg, max)
        };

        let max_confidence = graph.max_confidence();
        let risk_score = (max_confidence * 0.6 + avg_spread * 0.4).min(1.0);

        // No edges and no spread means no lateral path, whatever the
        // per-node confidences say.
        let risk_level = if graph.edges.is_empty() && avg_spread == 0.0 {
            RiskLevel::None
        } else if risk_score >= RISK_HIGH {
            RiskLevel::High
        } else if risk_score >= RISK_MEDIUM {
            RiskLevel::Medium
        } else if risk_score > 0.0 {
            RiskLevel::Low
        } else {
            RiskLevel::None
        };

        let mut top_threats: Vec<ThreatObservation> = graph
            .nodes
            .iter()
            .map(|n| ThreatObservation {
                source: n.addr.clone(),
                threat_type: n.threat_type,
                confidence: n.confidence,
            })
            .collect();
        top_threats.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let recommendations = Self::recommend(&top_threats);

        debug!(
            level = %risk_level,
            score = risk_score,
            avg_spread = avg_spread,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Risk assessed"
        );

        RiskAssessment {
            risk_level,
            risk_score,
            avg_spread,
            max_spread,
            top_threats,
            recommendations,
            timestamp: now,
        }
    }

    /// Per-node containment recommendations, already in descending
    /// confidence order because `threats` is sorted.
    fn recommend(threats: &[ThreatObservation]) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        for threat in threats {
            let c = threat.confidence;
            let rec = match threat.threat_type {
                ThreatCategory::Flood if c >= 0.70 => Some((
                    EnforcementAction::Block,
                    format!("Block {} immediately (flood confidence {:.0}%)", threat.source, c * 100.0),
                )),
                ThreatCategory::Scan => Some((
                    EnforcementAction::RedirectToHoneypot,
                    format!("Redirect {} to honeypot (scan confidence {:.0}%)", threat.source, c * 100.0),
                )),
                ThreatCategory::Exfiltration => Some((
                    EnforcementAction::Quarantine,
                    format!("Quarantine {} (exfiltration confidence {:.0}%)", threat.source, c * 100.0),
                )),
                _ if c >= 0.50 => Some((
                    EnforcementAction::Monitor,
                    format!("Monitor {} (elevated risk, confidence {:.0}%)", threat.source, c * 100.0),
                )),
                _ => None,
            };
            if let Some((action, note)) = rec {
                recs.push(Recommendation {
                    source: threat.source.clone(),
                    action,
                    confidence: c,
                    note,
                });
            }
        }
        recs
    }
}
