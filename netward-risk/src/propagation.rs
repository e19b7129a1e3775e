//! # Propagation Simulator — Monte-Carlo lateral-movement walk
//!
//! Each trial picks an entry node with probability proportional to its
//! confidence, then expands a frontier: every unvisited neighbor is
//! reached with probability edge-weight plus a small Gaussian jitter.
//! A step cap at the node count guarantees termination on cyclic graphs.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::{BTreeSet, HashMap};

use crate::types::{AttackGraph, PropagationTrial};

pub struct PropagationSimulator {
    trials: usize,
    jitter_sigma: f64,
}

impl PropagationSimulator {
    pub fn new(trials: usize, jitter_sigma: f64) -> Self {
        Self {
            trials: trials.max(1),
            jitter_sigma,
        }
    }

    pub fn simulate(&self, graph: &AttackGraph) -> Vec<PropagationTrial> {
        if graph.nodes.is_empty() {
            return Vec::new();
        }

        let mut adjacency: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
        for edge in &graph.edges {
            adjacency
                .entry(edge.src.as_str())
                .or_default()
                .push((edge.dst.as_str(), edge.weight));
            adjacency
                .entry(edge.dst.as_str())
                .or_default()
                .push((edge.src.as_str(), edge.weight));
        }

        let mut rng = rand::thread_rng();
        let jitter = Normal::new(0.0, self.jitter_sigma).ok();
        let step_cap = graph.nodes.len();

        (0..self.trials)
            .map(|_| {
                let entry = self.pick_entry(graph, &mut rng);
                let mut reached: BTreeSet<String> = BTreeSet::new();
                reached.insert(entry.clone());
                let mut frontier = vec![entry.clone()];
                let mut steps = 0usize;

                while !frontier.is_empty() && steps < step_cap {
                    let mut next_frontier = Vec::new();
                    for node in &frontier {
                        let Some(neighbors) = adjacency.get(node.as_str()) else {
                            continue;
                        };
                        for (neighbor, weight) in neighbors {
                            if reached.contains(*neighbor) {
                                continue;
                            }
                            let noise = jitter.as_ref().map_or(0.0, |j| j.sample(&mut rng));
                            let probability = (weight + noise).min(1.0);
                            if rng.gen::<f64>() < probability {
                                reached.insert((*neighbor).to_string());
                                next_frontier.push((*neighbor).to_string());
                            }
                        }
                    }
                    frontier = next_frontier;
                    steps += 1;
                }

                PropagationTrial {
                    entry_node: entry,
                    nodes_reached: reached.len(),
                    path_length: steps,
                    reached,
                }
            })
            .collect()
    }

    /// Confidence-proportional entry selection; a graph with all-zero
    /// confidences falls back to uniform choice.
    fn pick_entry(&self, graph: &AttackGraph, rng: &mut impl Rng) -> String {
        let total: f64 = graph.nodes.iter().map(|n| n.confidence).sum();
        if total <= 0.0 {
            let idx = rng.gen_range(0..graph.nodes.len());
            return graph.nodes[idx].addr.clone();
        }
        let mut r = rng.gen::<f64>() * total;
        for node in &graph.nodes {
            r -= node.confidence;
            if r <= 0.0 {
                return node.addr.clone();
            }
        }
        graph.nodes[graph.nodes.len() - 1].addr.clone()
    }
}
