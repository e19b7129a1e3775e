//! # Pipeline Context — every stage wired together
//!
//! Owns the full detect → risk → respond → evolve chain behind one tick
//! method. Ticks are strictly sequential; producers only touch the
//! bounded ingest queue. Confirmed sources go straight to enforcement,
//! early-warning sources go through the safety gate, and every
//! `evolution.interval_ticks` ticks the outcome log is replayed into a
//! fresh threshold search.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use netward_core::types::{AlertLevel, EnforcementAction, ThreatCategory};
use netward_core::{Blocklist, EventBus, NetwardConfig, NetwardResult, OutcomeLog};
use netward_detect::{
    BeliefTracker, FlowObservation, RollingInference, SourceAssessment, StatisticsWindow,
    ThreatEstimator,
};
use netward_evolve::ThresholdEvolver;
use netward_response::{
    AutoExpiryScheduler, CommandRunner, EnforcementDecisionEngine, PreemptiveCandidate,
    RecordingRunner, SafetyGate, ShellRunner, Verdict,
};
use netward_risk::{AttackGraphBuilder, PropagationSimulator, RiskAggregator, ThreatObservation};

use crate::enrich::{Enrichment, NoEnrichment};

const MAX_QUEUED_OBSERVATIONS: usize = 100_000;
const REQUESTER_ID: &str = "netward-pipeline";

pub struct PipelineContext {
    pub rolling: RollingInference,
    pub graph_builder: AttackGraphBuilder,
    pub propagation: PropagationSimulator,
    pub aggregator: RiskAggregator,
    pub engine: Arc<EnforcementDecisionEngine>,
    pub gate: SafetyGate,
    pub expiry: Arc<AutoExpiryScheduler>,
    pub outcome_log: Arc<OutcomeLog>,
    pub blocklist: Arc<Blocklist>,
    pub bus: Arc<EventBus>,
    evolver: Mutex<ThresholdEvolver>,
    enrichment: Box<dyn Enrichment>,
    queue: Mutex<Vec<FlowObservation>>,
    evolution_interval: u64,
    best_genome_path: std::path::PathBuf,
    stop: AtomicBool,
    ticks: AtomicU64,
    queue_dropped: AtomicU64,
}

impl PipelineContext {
    pub fn new(config: &NetwardConfig, live_enforcement: bool) -> NetwardResult<Self> {
        std::fs::create_dir_all(config.data_dir())?;

        let bus = Arc::new(EventBus::new());
        let outcome_log = Arc::new(OutcomeLog::new(config.outcomes_path()));
        let blocklist = Arc::new(Blocklist::new(config.blocklist_path()));

        let window = Arc::new(StatisticsWindow::new(
            config.capture.window_seconds,
            config.capture.max_observations_per_source,
        ));
        let estimator = Arc::new(ThreatEstimator::from_config(&config.estimator));
        let belief = Arc::new(BeliefTracker::from_config(&config.belief));
        let rolling = RollingInference::new(window, estimator.clone(), belief);

        // A persisted genome from a previous run outranks the config file.
        let best_genome_path = config.best_genome_path();
        match ThresholdEvolver::load_best(&best_genome_path)? {
            Some(result) => {
                info!(fitness = result.fitness, "Restoring evolved thresholds");
                ThresholdEvolver::apply(&result, &estimator);
            }
            None => info!("No evolved genome on disk, using configured thresholds"),
        }

        // Forward actions and expiry reversals share one runner so every
        // network change and its eventual revert hit the same seam.
        let runner: Arc<dyn CommandRunner> = if live_enforcement {
            Arc::new(ShellRunner)
        } else {
            info!("Dry-run enforcement: commands recorded, host untouched");
            Arc::new(RecordingRunner::default())
        };
        let engine = Arc::new(
            EnforcementDecisionEngine::new(
                config.response.responder_id.clone(),
                runner.clone(),
                outcome_log.clone(),
                blocklist.clone(),
            )
            .with_bus(bus.clone()),
        );

        let expiry = Arc::new(
            AutoExpiryScheduler::new(
                outcome_log.clone(),
                blocklist.clone(),
                runner,
                &config.expiry,
                config.response.responder_id.clone(),
            )
            .with_bus(bus.clone()),
        );

        Ok(Self {
            rolling,
            graph_builder: AttackGraphBuilder::new(),
            propagation: PropagationSimulator::new(
                config.propagation.trials,
                config.propagation.jitter_sigma,
            ),
            aggregator: RiskAggregator::new(),
            engine,
            gate: SafetyGate::from_config(&config.belief),
            expiry,
            outcome_log,
            blocklist,
            bus,
            evolver: Mutex::new(ThresholdEvolver::new(&config.evolution)),
            enrichment: Box::new(NoEnrichment),
            queue: Mutex::new(Vec::new()),
            evolution_interval: config.evolution.interval_ticks as u64,
            best_genome_path,
            stop: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            queue_dropped: AtomicU64::new(0),
        })
    }

    pub fn with_enrichment(mut self, enrichment: Box<dyn Enrichment>) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn ticks_completed(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Queue observations for the next tick. Oversized batches are dropped
    /// whole rather than stalling the producer.
    pub fn submit(&self, observations: Vec<FlowObservation>) {
        let mut queue = self.queue.lock();
        if queue.len() + observations.len() > MAX_QUEUED_OBSERVATIONS {
            self.queue_dropped
                .fetch_add(observations.len() as u64, Ordering::Relaxed);
            warn!(queued = queue.len(), dropped = observations.len(), "Ingest queue full");
            return;
        }
        queue.extend(observations);
    }

    /// One full pipeline pass: detect, assess risk, enforce, and on the
    /// evolution cadence re-fit thresholds from the outcome log.
    pub fn tick(&self, now_ms: i64) -> Vec<SourceAssessment> {
        let batch = std::mem::take(&mut *self.queue.lock());
        let assessments = self.rolling.tick(&batch, now_ms);

        let recommendations = self.assess_risk(&assessments);
        self.enforce(&assessments, &recommendations);

        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if self.evolution_interval > 0 && tick % self.evolution_interval == 0 {
            self.run_evolution();
        }

        assessments
    }

    /// Feed non-normal assessments through graph, propagation, and
    /// aggregation; return per-source recommended actions.
    fn assess_risk(&self, assessments: &[SourceAssessment]) -> HashMap<String, EnforcementAction> {
        let threats: Vec<ThreatObservation> = assessments
            .iter()
            .filter(|a| a.estimate.top_category != ThreatCategory::Normal)
            .map(|a| ThreatObservation {
                source: a.source.to_string(),
                threat_type: a.estimate.top_category,
                confidence: a.estimate.top_confidence,
            })
            .collect();
        if threats.is_empty() {
            return HashMap::new();
        }

        let graph = self.graph_builder.build(&threats);
        let trials = self.propagation.simulate(&graph);
        let assessment = self.aggregator.assess(&graph, &trials);

        info!(
            level = %assessment.risk_level,
            score = assessment.risk_score,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Risk stage complete"
        );

        assessment
            .recommendations
            .into_iter()
            .map(|r| (r.source, r.action))
            .collect()
    }

    fn enforce(
        &self,
        assessments: &[SourceAssessment],
        recommendations: &HashMap<String, EnforcementAction>,
    ) {
        for assessment in assessments {
            let source = assessment.source.to_string();
            match assessment.alert_level {
                AlertLevel::Confirmed => {
                    // Re-blocking an already-contained source is a no-op
                    // worth skipping before it hits the log.
                    if self.blocklist.contains(&source) {
                        continue;
                    }
                    let verdict = Verdict {
                        source: source.clone(),
                        predicted_category: assessment.estimate.top_category.as_str().to_string(),
                        confidence: assessment.estimate.top_confidence,
                        explanation: self.enrichment.annotate(assessment),
                        recommended_action: recommendations.get(&source).copied(),
                        requester_id: REQUESTER_ID.to_string(),
                        stats: self.rolling.window.snapshot(assessment.source),
                    };
                    if let Err(e) = self.engine.execute(&verdict) {
                        warn!(source = %source, error = %e, "Enforcement failed");
                    }
                }
                AlertLevel::EarlyWarning => {
                    let candidate = PreemptiveCandidate {
                        source: source.clone(),
                        alert_level: assessment.alert_level,
                        current_confidence: assessment.estimate.top_confidence,
                        predicted_confidence: assessment.trend.predicted_confidence,
                        requested_action: EnforcementAction::RateLimit,
                        requester_id: REQUESTER_ID.to_string(),
                        category: Some(assessment.estimate.top_category.as_str().to_string()),
                        trend: Some(assessment.trend.direction.as_str().to_string()),
                        stats: self.rolling.window.snapshot(assessment.source),
                    };
                    match self.gate.review(&candidate) {
                        netward_response::GateDecision::Approved => {
                            if let Err(e) = self.engine.execute_preemptive(&candidate) {
                                warn!(source = %source, error = %e, "Preemptive enforcement failed");
                            }
                        }
                        netward_response::GateDecision::Rejected { .. } => {}
                    }
                }
                AlertLevel::Normal | AlertLevel::Elevated => {}
            }
        }
    }

    fn run_evolution(&self) {
        let outcomes = self.outcome_log.load();
        let result = self.evolver.lock().evolve(&outcomes);
        if let Err(e) = ThresholdEvolver::persist(&result, &self.best_genome_path) {
            warn!(error = %e, "Could not persist evolved genome");
        }
        ThresholdEvolver::apply(&result, &self.rolling.estimator);
    }

    /// Spawn the tick loop. The stop flag is checked between ticks only;
    /// a tick in flight always completes.
    pub fn start(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                if self.stop.load(Ordering::Relaxed) {
                    info!(ticks = self.ticks_completed(), "Pipeline stopped");
                    break;
                }
                let now_ms = chrono::Utc::now().timestamp_millis();
                self.tick(now_ms);
            }
        })
    }
}
