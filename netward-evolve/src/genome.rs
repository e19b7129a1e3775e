//! # Genome — a six-gene detection threshold set
//!
//! Gene order is fixed: flood pps, flood SYN count, scan unique dests,
//! scan port entropy, exfil bytes/sec, confidence gate. Every variation
//! operator clamps back into `GENE_BOUNDS` so an evolved genome is always
//! directly installable.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use netward_detect::Thresholds;

pub const GENE_COUNT: usize = 6;

/// Hard (min, max) bounds per gene.
pub const GENE_BOUNDS: [(f64, f64); GENE_COUNT] = [
    (50.0, 2_000.0),        // flood pps
    (20.0, 1_000.0),        // flood SYN count
    (2.0, 100.0),           // scan unique dests
    (1.0, 6.0),             // scan port entropy (bits)
    (10_000.0, 2_000_000.0), // exfil bytes/sec
    (0.30, 0.90),           // confidence gate
];

/// The hand-tuned baseline. Always seeded into the initial population so
/// evolution can never regress below it.
pub const DEFAULT_GENOME: [f64; GENE_COUNT] = [500.0, 300.0, 20.0, 3.5, 500_000.0, 0.60];

/// Per-gene Gaussian mutation widths, scaled to each gene's range.
pub const MUT_SIGMA: [f64; GENE_COUNT] = [80.0, 40.0, 4.0, 0.25, 40_000.0, 0.04];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome(pub [f64; GENE_COUNT]);

impl Default for Genome {
    fn default() -> Self {
        Genome(DEFAULT_GENOME)
    }
}

impl Genome {
    /// Uniform random genome within bounds.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for (i, (lo, hi)) in GENE_BOUNDS.iter().enumerate() {
            genes[i] = rng.gen_range(*lo..=*hi);
        }
        Genome(genes)
    }

    /// Clamp every gene into its bounds. Applied after every variation.
    pub fn clamp(&mut self) {
        for (gene, (lo, hi)) in self.0.iter_mut().zip(GENE_BOUNDS.iter()) {
            *gene = gene.clamp(*lo, *hi);
        }
    }

    pub fn in_bounds(&self) -> bool {
        self.0
            .iter()
            .zip(GENE_BOUNDS.iter())
            .all(|(g, (lo, hi))| *g >= *lo && *g <= *hi)
    }

    /// The first five genes as an installable threshold set.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            flood_pps: self.0[0],
            flood_syn: self.0[1],
            scan_unique_dests: self.0[2],
            scan_entropy: self.0[3],
            exfil_bps: self.0[4],
            confidence_gate: self.0[5],
        }
    }

    pub fn confidence_gate(&self) -> f64 {
        self.0[5]
    }

    /// Blend crossover: each child gene is an interpolation past the two
    /// parents, reach controlled by `alpha`. Children are clamped.
    pub fn blend<R: Rng>(a: &Genome, b: &Genome, alpha: f64, rng: &mut R) -> (Genome, Genome) {
        let mut c1 = [0.0; GENE_COUNT];
        let mut c2 = [0.0; GENE_COUNT];
        for i in 0..GENE_COUNT {
            let gamma = (1.0 + 2.0 * alpha) * rng.gen::<f64>() - alpha;
            c1[i] = (1.0 - gamma) * a.0[i] + gamma * b.0[i];
            c2[i] = gamma * a.0[i] + (1.0 - gamma) * b.0[i];
        }
        let mut c1 = Genome(c1);
        let mut c2 = Genome(c2);
        c1.clamp();
        c2.clamp();
        (c1, c2)
    }

    /// Gaussian mutation: each gene mutates independently with probability
    /// `indpb`, using its own sigma from `MUT_SIGMA`.
    pub fn mutate<R: Rng>(&mut self, indpb: f64, rng: &mut R) {
        for i in 0..GENE_COUNT {
            if rng.gen::<f64>() < indpb {
                if let Ok(n) = Normal::new(0.0, MUT_SIGMA[i]) {
                    self.0[i] += n.sample(rng);
                }
            }
        }
        self.clamp();
    }
}
