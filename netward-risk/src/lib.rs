//! # Netward Risk — lateral-movement risk modeling
//!
//! Stage two of the pipeline: batches of per-source threat observations
//! become an attack graph, a Monte-Carlo walk simulates lateral movement
//! over it, and the trial spread plus peak confidence aggregate into a
//! discrete risk level with ranked containment recommendations.

pub mod assess;
pub mod graph;
pub mod propagation;
pub mod types;


pub use assess::RiskAggregator;
pub use graph::AttackGraphBuilder;
pub use propagation::PropagationSimulator;
pub use types::{
    AttackGraph, GraphEdge, GraphNode, PropagationTrial, Recommendation, RiskAssessment,
    RiskLevel, ThreatObservation,
};
