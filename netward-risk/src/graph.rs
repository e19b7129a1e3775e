//! # Attack Graph Builder — observations to nodes and edges
//!
//! Nodes deduplicate by source address, keeping the highest-confidence
//! observation per address. Edges connect two nodes sharing a threat type
//! when both confidences exceed the coordination floor; this is a coarse
//! coordination heuristic, not a causal inference.

use std::collections::HashMap;
use tracing::debug;

use crate::types::{AttackGraph, GraphEdge, GraphNode, ThreatObservation};

/// Both endpoints must exceed this confidence before an edge is drawn.
const EDGE_CONFIDENCE_FLOOR: f64 = 0.50;

#[derive(Debug, Clone, Copy)]
pub struct AttackGraphBuilder {
    edge_confidence_floor: f64,
}

impl AttackGraphBuilder {
    pub fn new() -> Self {
        Self {
            edge_confidence_floor: EDGE_CONFIDENCE_FLOOR,
        }
    }

    pub fn build(&self, observations: &[ThreatObservation]) -> AttackGraph {
        let mut by_addr: HashMap<&str, &ThreatObservation> = HashMap::new();
        for obs in observations {
            match by_addr.get(obs.source.as_str()) {
                Some(existing) if existing.confidence >= obs.confidence => {}
                _ => {
                    by_addr.insert(obs.source.as_str(), obs);
                }
            }
        }

        let mut nodes: Vec<GraphNode> = by_addr
            .values()
            .map(|o| GraphNode {
                addr: o.source.clone(),
                threat_type: o.threat_type,
                confidence: o.confidence,
            })
            .collect();
        // Deterministic node order regardless of map iteration
        nodes.sort_by(|a, b| a.addr.cmp(&b.addr));

        let mut edges = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for b in nodes.iter().skip(i + 1) {
                if a.threat_type == b.threat_type
                    && a.confidence > self.edge_confidence_floor
                    && b.confidence > self.edge_confidence_floor
                {
                    edges.push(GraphEdge {
                        src: a.addr.clone(),
                        dst: b.addr.clone(),
                        threat_type: a.threat_type,
                        weight: (a.confidence + b.confidence) / 2.0,
                    });
                }
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            "Attack graph built"
        );
        AttackGraph { nodes, edges }
    }
}

impl Default for AttackGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
