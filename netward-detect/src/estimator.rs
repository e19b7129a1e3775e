//! # Threat Estimator — Monte-Carlo threshold scoring
//!
//! Hard threshold crossings flap under noisy traffic. Instead of a binary
//! flag, each trial perturbs every metric with multiplicative Gaussian
//! noise and re-evaluates three independent threshold rules; the fraction
//! of trials in which a rule fired becomes that category's confidence.

use parking_lot::RwLock;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicU64, Ordering};

use netward_core::config::EstimatorConfig;
use netward_core::types::{EnforcementAction, StatisticsSnapshot, ThreatCategory};

use crate::types::{CategoryConfidences, ThreatEstimate};

/// The mutable detection-threshold set. Updated in place when threshold
/// evolution pushes a new genome into a live estimator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Thresholds {
    pub flood_pps: f64,
    pub flood_syn: f64,
    pub scan_unique_dests: f64,
    pub scan_entropy: f64,
    pub exfil_bps: f64,
    pub confidence_gate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            flood_pps: 500.0,
            flood_syn: 300.0,
            scan_unique_dests: 20.0,
            scan_entropy: 3.5,
            exfil_bps: 500_000.0,
            confidence_gate: 0.60,
        }
    }
}

impl From<&EstimatorConfig> for Thresholds {
    fn from(c: &EstimatorConfig) -> Self {
        Self {
            flood_pps: c.flood_pps_threshold,
            flood_syn: c.flood_syn_threshold,
            scan_unique_dests: c.scan_unique_dest_threshold,
            scan_entropy: c.scan_entropy_threshold,
            exfil_bps: c.exfil_bps_threshold,
            confidence_gate: c.confidence_gate,
        }
    }
}

pub struct ThreatEstimator {
    thresholds: RwLock<Thresholds>,
    trials: usize,
    noise_sigma: f64,
    normal_floor: f64,
    estimates_run: AtomicU64,
}

impl ThreatEstimator {
    pub fn new(thresholds: Thresholds, trials: usize, noise_sigma: f64, normal_floor: f64) -> Self {
        Self {
            thresholds: RwLock::new(thresholds),
            trials: trials.max(1),
            noise_sigma,
            normal_floor,
            estimates_run: AtomicU64::new(0),
        }
    }

    pub fn from_config(c: &EstimatorConfig) -> Self {
        Self::new(Thresholds::from(c), c.trials, c.noise_sigma, c.normal_floor)
    }

    pub fn thresholds(&self) -> Thresholds {
        *self.thresholds.read()
    }

    /// Replace the live threshold set. Called by threshold evolution.
    pub fn set_thresholds(&self, t: Thresholds) {
        *self.thresholds.write() = t;
    }

    pub fn estimates_run(&self) -> u64 {
        self.estimates_run.load(Ordering::Relaxed)
    }

    /// Score one snapshot. Never fails: degenerate noise parameters fall
    /// back to the unperturbed metrics.
    pub fn estimate(&self, snap: &StatisticsSnapshot) -> ThreatEstimate {
        let t = *self.thresholds.read();
        let mut rng = rand::thread_rng();
        let noise = Normal::new(0.0, self.noise_sigma).ok();

        let mut flood_hits = 0usize;
        let mut scan_hits = 0usize;
        let mut exfil_hits = 0usize;

        for _ in 0..self.trials {
            let mut perturb = |value: f64| -> f64 {
                match &noise {
                    Some(n) => value * (1.0 + n.sample(&mut rng)),
                    None => value,
                }
            };
            let pps = perturb(snap.packets_per_second);
            let bps = perturb(snap.bytes_per_second);
            let dests = perturb(snap.unique_dests as f64);
            let syn = perturb(snap.syn_count as f64);
            let entropy = perturb(snap.port_entropy);

            if pps > t.flood_pps || syn > t.flood_syn {
                flood_hits += 1;
            }
            if dests > t.scan_unique_dests || entropy > t.scan_entropy {
                scan_hits += 1;
            }
            if bps > t.exfil_bps {
                exfil_hits += 1;
            }
        }

        let n = self.trials as f64;
        let confidences = CategoryConfidences {
            flood: flood_hits as f64 / n,
            scan: scan_hits as f64 / n,
            exfiltration: exfil_hits as f64 / n,
        };

        let (top_category, top_confidence) = confidences.top();
        self.estimates_run.fetch_add(1, Ordering::Relaxed);

        if top_confidence < self.normal_floor {
            return ThreatEstimate {
                confidences,
                top_category: ThreatCategory::Normal,
                top_confidence: 0.0,
                recommended_action: EnforcementAction::Monitor,
            };
        }

        ThreatEstimate {
            confidences,
            top_category,
            top_confidence,
            recommended_action: Self::action_for(top_category),
        }
    }

    fn action_for(category: ThreatCategory) -> EnforcementAction {
        match category {
            ThreatCategory::Flood => EnforcementAction::Block,
            ThreatCategory::Scan => EnforcementAction::RedirectToHoneypot,
            ThreatCategory::Exfiltration => EnforcementAction::Quarantine,
            ThreatCategory::Normal => EnforcementAction::Monitor,
        }
    }
}
