//! # Rolling Inference — the per-tick detection driver
//!
//! One tick, in fixed order: drain new observations into the window,
//! evict stale ones, snapshot every source from a single consistent view
//! of the buffer, then per source: estimate → belief update → trend →
//! alert classification. Ticks never overlap; the caller owns the cadence.

use std::sync::Arc;
use tracing::info;

use netward_core::types::AlertLevel;

use crate::belief::BeliefTracker;
use crate::estimator::ThreatEstimator;
use crate::types::{BeliefEntry, FlowObservation, SourceAssessment};
use crate::window::StatisticsWindow;

pub struct RollingInference {
    pub window: Arc<StatisticsWindow>,
    pub estimator: Arc<ThreatEstimator>,
    pub belief: Arc<BeliefTracker>,
}

impl RollingInference {
    pub fn new(
        window: Arc<StatisticsWindow>,
        estimator: Arc<ThreatEstimator>,
        belief: Arc<BeliefTracker>,
    ) -> Self {
        Self {
            window,
            estimator,
            belief,
        }
    }

    /// Run one inference tick at `now_ms` over `new_observations`.
    pub fn tick(&self, new_observations: &[FlowObservation], now_ms: i64) -> Vec<SourceAssessment> {
        self.window.ingest(new_observations);
        self.window.evict(now_ms);

        // One snapshot of the buffer for the whole tick
        let snapshots = self.window.snapshot_all();
        let mut assessments = Vec::with_capacity(snapshots.len());

        for (source, stats) in snapshots {
            let estimate = self.estimator.estimate(&stats);
            self.belief.record(
                source,
                BeliefEntry {
                    confidence: estimate.top_confidence,
                    category: estimate.top_category,
                    tick_ts: now_ms,
                },
            );
            let trend = self.belief.trend(source);
            let alert_level = self
                .belief
                .alert_level(estimate.top_confidence, trend.predicted_confidence);

            assessments.push(SourceAssessment {
                source,
                estimate,
                trend,
                alert_level,
            });
        }

        let live: Vec<_> = assessments.iter().map(|a| a.source).collect();
        self.belief.retain_sources(&live);

        let alerts = assessments
            .iter()
            .filter(|a| a.alert_level != AlertLevel::Normal)
            .count();
        info!(
            sources = assessments.len(),
            alerts = alerts,
            ingested = new_observations.len(),
            "Inference tick complete"
        );

        assessments
    }
}
