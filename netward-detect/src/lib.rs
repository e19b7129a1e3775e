//! # Netward Detect — per-source threat detection
//!
//! Stage one of the pipeline: flow observations enter a sliding window,
//! derived statistics run through a Monte-Carlo threshold estimator, and
//! per-source confidence history feeds a trend extrapolation that drives
//! the early-warning / confirmed alert state machine.

pub mod belief;
pub mod estimator;
pub mod rolling;
pub mod types;
pub mod window;

#[cfg(test)]
mod tests;

pub use belief::BeliefTracker;
pub use estimator::{ThreatEstimator, Thresholds};
pub use rolling::RollingInference;
pub use types::{
    BeliefEntry, CategoryConfidences, FlowObservation, Protocol, SourceAssessment,
    ThreatEstimate, TrendDirection, TrendSummary,
};
pub use window::StatisticsWindow;
