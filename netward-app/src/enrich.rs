//! Verdict enrichment seam. The pipeline runs with the built-in
//! annotator; deployments with an external analysis service can plug in
//! their own.

use netward_detect::SourceAssessment;

pub trait Enrichment: Send + Sync {
    /// A human-readable explanation for a verdict, or `None` to leave the
    /// verdict bare. Must not block the tick.
    fn annotate(&self, assessment: &SourceAssessment) -> Option<String>;
}

/// Default annotator: a one-line summary from the numbers already in hand.
pub struct NoEnrichment;

impl Enrichment for NoEnrichment {
    fn annotate(&self, assessment: &SourceAssessment) -> Option<String> {
        Some(format!(
            "{} confidence {:.2}, trend {} toward {:.2}",
            assessment.estimate.top_category,
            assessment.estimate.top_confidence,
            assessment.trend.direction.as_str(),
            assessment.trend.predicted_confidence,
        ))
    }
}
