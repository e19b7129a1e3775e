//! # Belief Tracker — confidence history, trend extrapolation, alert levels
//!
//! Keeps a bounded ring of past confidence estimates per source, fits a
//! linear trend, extrapolates one tick ahead, and classifies the alert
//! level from (current, predicted). The early_warning level exists to
//! trigger low-impact preemptive action before the hard threshold is
//! crossed.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use tracing::debug;

use netward_core::config::BeliefConfig;
use netward_core::types::AlertLevel;

use crate::types::{BeliefEntry, TrendDirection, TrendSummary};

pub struct BeliefTracker {
    history_len: usize,
    confirmed_threshold: f64,
    early_warning_threshold: f64,
    slope_deadband: f64,
    histories: RwLock<HashMap<IpAddr, VecDeque<BeliefEntry>>>,
}

impl BeliefTracker {
    pub fn new(
        history_len: usize,
        confirmed_threshold: f64,
        early_warning_threshold: f64,
        slope_deadband: f64,
    ) -> Self {
        Self {
            history_len: history_len.max(2),
            confirmed_threshold,
            early_warning_threshold,
            slope_deadband,
            histories: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(c: &BeliefConfig) -> Self {
        Self::new(
            c.history_len,
            c.confirmed_threshold,
            c.early_warning_threshold,
            c.slope_deadband,
        )
    }

    pub fn confirmed_threshold(&self) -> f64 {
        self.confirmed_threshold
    }

    /// Append one entry to a source's ring; the oldest entry drops once
    /// the ring is full.
    pub fn record(&self, source: IpAddr, entry: BeliefEntry) {
        let mut histories = self.histories.write();
        let buf = histories.entry(source).or_insert_with(VecDeque::new);
        if buf.len() >= self.history_len {
            buf.pop_front();
        }
        buf.push_back(entry);
    }

    pub fn history(&self, source: IpAddr) -> Vec<BeliefEntry> {
        self.histories
            .read()
            .get(&source)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn tracked_sources(&self) -> usize {
        self.histories.read().len()
    }

    /// Drop histories for sources no longer observed.
    pub fn retain_sources(&self, live: &[IpAddr]) {
        let mut histories = self.histories.write();
        histories.retain(|src, _| live.contains(src));
    }

    /// Fit a least-squares line over the history and extrapolate one tick
    /// ahead using the mean inter-tick spacing. Fewer than two points
    /// yields a flat trend at the latest confidence.
    pub fn trend(&self, source: IpAddr) -> TrendSummary {
        let histories = self.histories.read();
        let buf = match histories.get(&source) {
            Some(b) if b.len() >= 2 => b,
            Some(b) => {
                let current = b.back().map_or(0.0, |e| e.confidence);
                return TrendSummary::flat(current);
            }
            None => return TrendSummary::flat(0.0),
        };

        let t0 = buf.front().map_or(0, |e| e.tick_ts);
        let xs: Vec<f64> = buf.iter().map(|e| (e.tick_ts - t0) as f64 / 1_000.0).collect();
        let ys: Vec<f64> = buf.iter().map(|e| e.confidence).collect();
        let n = xs.len() as f64;

        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let mut num = 0.0;
        let mut den = 0.0;
        for (x, y) in xs.iter().zip(ys.iter()) {
            num += (x - mean_x) * (y - mean_y);
            den += (x - mean_x) * (x - mean_x);
        }
        // Identical tick times degrade to a flat trend
        if den <= f64::EPSILON {
            return TrendSummary::flat(*ys.last().unwrap_or(&0.0));
        }
        let slope = num / den;
        let intercept = mean_y - slope * mean_x;

        let last_x = *xs.last().unwrap_or(&0.0);
        let avg_dt = last_x / (n - 1.0);
        let predicted = (slope * (last_x + avg_dt) + intercept).clamp(0.0, 1.0);

        let delta_per_tick = slope * avg_dt;
        let direction = if delta_per_tick > self.slope_deadband {
            TrendDirection::Rising
        } else if delta_per_tick < -self.slope_deadband {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };

        debug!(
            source = %source,
            slope = slope,
            predicted = predicted,
            direction = ?direction,
            "Trend fitted"
        );

        TrendSummary {
            direction,
            slope_per_sec: slope,
            predicted_confidence: predicted,
        }
    }

    /// The alert decision table. Exhaustive and mutually exclusive over
    /// (current, predicted):
    /// - confirmed:     current ≥ confirmed
    /// - early_warning: current < confirmed AND predicted ≥ confirmed
    /// - elevated:      otherwise, predicted ≥ early_warning
    /// - normal:        otherwise
    pub fn alert_level(&self, current: f64, predicted: f64) -> AlertLevel {
        if current >= self.confirmed_threshold {
            AlertLevel::Confirmed
        } else if predicted >= self.confirmed_threshold {
            AlertLevel::EarlyWarning
        } else if predicted >= self.early_warning_threshold {
            AlertLevel::Elevated
        } else {
            AlertLevel::Normal
        }
    }
}
