//! # Threshold Evolver — replay-driven genetic search
//!
//! Candidate genomes are scored by replaying recorded outcomes through a
//! fresh estimator: a genome is rewarded for agreeing with what each
//! enforcement decision turned out to be. False positives cost double —
//! blocking legitimate traffic hurts more than missing one threat — so
//! fitness is (TP + TN) / (TP + TN + 2·FP + FN + ε).
//!
//! The search itself is a plain generational GA: tournament selection,
//! blend crossover, per-gene Gaussian mutation, one-slot hall of fame.
//! The hand-tuned default genome is always seeded into the population, so
//! the result can never score worse than the baseline on the replay set.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use netward_core::config::EvolutionConfig;
use netward_core::persistence::{atomic_write_json, read_json};
use netward_core::types::{EnforcementAction, OutcomeRecord, StatisticsSnapshot, ThreatCategory};
use netward_core::NetwardResult;
use netward_detect::{ThreatEstimator, Thresholds};

use crate::genome::Genome;

const CXPB: f64 = 0.70;
const MUTPB: f64 = 0.30;
const INDPB: f64 = 0.30;
const BLEND_ALPHA: f64 = 0.5;
const TOURNAMENT_K: usize = 3;
const FITNESS_EPSILON: f64 = 1e-9;

/// Replay noise; matches the live estimator so replay scores transfer.
const REPLAY_NOISE_SIGMA: f64 = 0.10;
const REPLAY_NORMAL_FLOOR: f64 = 0.10;

/// The outcome of one evolution run, persisted as the best-genome file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    pub best_genome: Genome,
    pub thresholds: Thresholds,
    pub confidence_gate: f64,
    pub fitness: f64,
    pub generations_run: usize,
    pub population_size: usize,
    pub outcomes_used: usize,
    /// Unix seconds.
    pub timestamp: i64,
}

pub struct ThresholdEvolver {
    population: usize,
    generations: usize,
    replay_trials: usize,
    rng: StdRng,
}

impl ThresholdEvolver {
    pub fn new(config: &EvolutionConfig) -> Self {
        Self {
            population: config.population,
            generations: config.generations,
            replay_trials: config.replay_trials.max(1),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(config: &EvolutionConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(config)
        }
    }

    /// Score one genome against the replay set. A record counts as
    /// detected when the replayed top confidence clears the genome's own
    /// gate with a non-normal category.
    pub fn evaluate(&self, genome: &Genome, outcomes: &[OutcomeRecord]) -> f64 {
        let estimator = ThreatEstimator::new(
            genome.thresholds(),
            self.replay_trials,
            REPLAY_NOISE_SIGMA,
            REPLAY_NORMAL_FLOOR,
        );
        let gate = genome.confidence_gate();

        let (mut tp, mut tn, mut fp, mut fne) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for record in outcomes {
            let est = estimator.estimate(&record.stats);
            let detected = est.top_confidence > gate && est.top_category != ThreatCategory::Normal;
            match (record.was_threat, detected) {
                (true, true) => tp += 1.0,
                (true, false) => fne += 1.0,
                (false, true) => fp += 1.0,
                (false, false) => tn += 1.0,
            }
        }
        (tp + tn) / (tp + tn + 2.0 * fp + fne + FITNESS_EPSILON)
    }

    /// Run the full search. An empty or too-small replay set falls back to
    /// the built-in synthetic scenarios; a zero-sized search degrades to
    /// the default genome.
    pub fn evolve(&mut self, outcomes: &[OutcomeRecord]) -> EvolutionResult {
        let synthetic;
        let replay: &[OutcomeRecord] = if outcomes.is_empty() {
            warn!("No recorded outcomes, evolving against synthetic scenarios");
            synthetic = synthetic_outcomes();
            &synthetic
        } else {
            outcomes
        };

        if self.population == 0 || self.generations == 0 {
            warn!("Evolution disabled by configuration, keeping default thresholds");
            return self.default_result(replay.len());
        }

        // Individual 0 is the hand-tuned default.
        let mut population: Vec<Genome> = std::iter::once(Genome::default())
            .chain((1..self.population).map(|_| Genome::random(&mut self.rng)))
            .collect();
        let mut fitnesses: Vec<f64> = population.iter().map(|g| self.evaluate(g, replay)).collect();

        let mut best = population[0];
        let mut best_fitness = fitnesses[0];
        self.update_best(&population, &fitnesses, &mut best, &mut best_fitness);

        for gen in 1..=self.generations {
            let mut offspring = self.select(&population, &fitnesses);

            for pair in offspring.chunks_mut(2) {
                if pair.len() == 2 && self.rng.gen::<f64>() < CXPB {
                    let (c1, c2) = Genome::blend(&pair[0], &pair[1], BLEND_ALPHA, &mut self.rng);
                    pair[0] = c1;
                    pair[1] = c2;
                }
            }
            for child in offspring.iter_mut() {
                if self.rng.gen::<f64>() < MUTPB {
                    child.mutate(INDPB, &mut self.rng);
                }
            }

            population = offspring;
            fitnesses = population.iter().map(|g| self.evaluate(g, replay)).collect();
            self.update_best(&population, &fitnesses, &mut best, &mut best_fitness);

            debug!(generation = gen, best_fitness = best_fitness, "Evolution generation complete");
        }

        info!(
            fitness = best_fitness,
            generations = self.generations,
            outcomes = replay.len(),
            "Threshold evolution complete"
        );

        EvolutionResult {
            best_genome: best,
            thresholds: best.thresholds(),
            confidence_gate: best.confidence_gate(),
            fitness: best_fitness,
            generations_run: self.generations,
            population_size: self.population,
            outcomes_used: replay.len(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn default_result(&self, outcomes_used: usize) -> EvolutionResult {
        let genome = Genome::default();
        EvolutionResult {
            best_genome: genome,
            thresholds: genome.thresholds(),
            confidence_gate: genome.confidence_gate(),
            fitness: 0.0,
            generations_run: 0,
            population_size: self.population,
            outcomes_used,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn update_best(
        &self,
        population: &[Genome],
        fitnesses: &[f64],
        best: &mut Genome,
        best_fitness: &mut f64,
    ) {
        for (genome, fitness) in population.iter().zip(fitnesses.iter()) {
            if *fitness > *best_fitness {
                *best = *genome;
                *best_fitness = *fitness;
            }
        }
    }

    /// Tournament selection, with replacement, population-sized.
    fn select(&mut self, population: &[Genome], fitnesses: &[f64]) -> Vec<Genome> {
        (0..population.len())
            .map(|_| {
                let mut winner = self.rng.gen_range(0..population.len());
                for _ in 1..TOURNAMENT_K {
                    let contender = self.rng.gen_range(0..population.len());
                    if fitnesses[contender] > fitnesses[winner] {
                        winner = contender;
                    }
                }
                population[winner]
            })
            .collect()
    }

    /// Push an evolved result into a live estimator.
    pub fn apply(result: &EvolutionResult, estimator: &ThreatEstimator) {
        estimator.set_thresholds(result.thresholds);
        info!(
            fitness = result.fitness,
            confidence_gate = result.confidence_gate,
            "Evolved thresholds installed"
        );
    }

    pub fn persist(result: &EvolutionResult, path: &Path) -> NetwardResult<()> {
        atomic_write_json(path, result)
    }

    pub fn load_best(path: &Path) -> NetwardResult<Option<EvolutionResult>> {
        read_json(path)
    }
}

/// Labeled replay scenarios used when the outcome log is empty: three
/// floods, three scans, two exfiltrations, four benign profiles. Enough
/// signal to keep evolved thresholds honest from a cold start.
pub fn synthetic_outcomes() -> Vec<OutcomeRecord> {
    let scenario = |i: i64,
                    pps: f64,
                    bps: f64,
                    dests: u64,
                    syn: u64,
                    entropy: f64,
                    category: ThreatCategory,
                    action: EnforcementAction,
                    was_threat: bool| {
        OutcomeRecord {
            timestamp: i,
            source: format!("synthetic-{}", i),
            stats: StatisticsSnapshot {
                packets_per_second: pps,
                bytes_per_second: bps,
                unique_dests: dests,
                syn_count: syn,
                port_entropy: entropy,
                window_seconds: 10.0,
            },
            attack_type: category,
            original_confidence: if was_threat { 0.9 } else { 0.1 },
            action_taken: action,
            enforcement_success: true,
            was_threat,
        }
    };

    use EnforcementAction::{Block, Monitor, Quarantine, RedirectToHoneypot};
    use ThreatCategory::{Exfiltration, Flood, Normal, Scan};

    vec![
        scenario(0, 800.0, 400_000.0, 3, 500, 0.8, Flood, Block, true),
        scenario(1, 1_200.0, 600_000.0, 2, 800, 0.5, Flood, Block, true),
        scenario(2, 600.0, 300_000.0, 1, 400, 0.3, Flood, Block, true),
        scenario(3, 80.0, 8_000.0, 35, 35, 4.5, Scan, RedirectToHoneypot, true),
        scenario(4, 120.0, 12_000.0, 50, 50, 5.1, Scan, RedirectToHoneypot, true),
        scenario(5, 60.0, 6_000.0, 28, 28, 4.2, Scan, RedirectToHoneypot, true),
        scenario(6, 30.0, 800_000.0, 2, 5, 0.5, Exfiltration, Quarantine, true),
        scenario(7, 20.0, 1_200_000.0, 1, 2, 0.3, Exfiltration, Quarantine, true),
        scenario(8, 30.0, 15_000.0, 5, 10, 1.8, Normal, Monitor, false),
        scenario(9, 60.0, 30_000.0, 8, 20, 2.2, Normal, Monitor, false),
        scenario(10, 15.0, 5_000.0, 3, 4, 1.2, Normal, Monitor, false),
        scenario(11, 45.0, 22_000.0, 6, 12, 2.0, Normal, Monitor, false),
    ]
}
