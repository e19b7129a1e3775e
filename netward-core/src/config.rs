//! # Configuration — typed TOML configuration for every pipeline stage
//!
//! Each stage gets its own section with sensible defaults so a missing or
//! partial `netward.toml` still yields a runnable controller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{NetwardError, NetwardResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetwardConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub belief: BeliefConfig,
    #[serde(default)]
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub response: ResponseConfig,
    #[serde(default)]
    pub expiry: ExpiryConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            data_dir: "./netward-data".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Sliding-window horizon in seconds; observations older than this
    /// are evicted on every evaluation.
    pub window_seconds: f64,
    /// Bounded per-source buffer; oldest observations drop under load.
    pub max_observations_per_source: usize,
    pub tick_interval_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_seconds: 10.0,
            max_observations_per_source: 5_000,
            tick_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub trials: usize,
    /// Multiplicative Gaussian noise applied to each metric per trial.
    pub noise_sigma: f64,
    /// Top confidence below this collapses the estimate to "normal".
    pub normal_floor: f64,
    pub flood_pps_threshold: f64,
    pub flood_syn_threshold: f64,
    pub scan_unique_dest_threshold: f64,
    pub scan_entropy_threshold: f64,
    pub exfil_bps_threshold: f64,
    pub confidence_gate: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            trials: 200,
            noise_sigma: 0.10,
            normal_floor: 0.10,
            flood_pps_threshold: 500.0,
            flood_syn_threshold: 300.0,
            scan_unique_dest_threshold: 20.0,
            scan_entropy_threshold: 3.5,
            exfil_bps_threshold: 500_000.0,
            confidence_gate: 0.60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefConfig {
    /// k-most-recent confidence entries kept per source.
    pub history_len: usize,
    pub confirmed_threshold: f64,
    pub early_warning_threshold: f64,
    /// Minimum predicted confidence for the safety gate to admit a
    /// pre-confirmation action.
    pub preemptive_gate: f64,
    /// Per-tick confidence delta below which a trend counts as stable.
    pub slope_deadband: f64,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            history_len: 20,
            confirmed_threshold: 0.85,
            early_warning_threshold: 0.60,
            preemptive_gate: 0.75,
            slope_deadband: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationConfig {
    pub trials: usize,
    pub jitter_sigma: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            jitter_sigma: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    pub responder_id: String,
    /// When false (the default) enforcement commands are recorded but not
    /// issued against the host firewall.
    pub live_enforcement: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            responder_id: "netward-responder".into(),
            live_enforcement: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryConfig {
    pub sweep_interval_secs: u64,
    /// Rate limits expire faster than full blocks.
    pub rate_limit_ttl_secs: i64,
    pub block_ttl_secs: i64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            rate_limit_ttl_secs: 300,
            block_ttl_secs: 1_800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub population: usize,
    pub generations: usize,
    /// Monte-Carlo trials used when replaying outcomes through the
    /// estimator during fitness evaluation.
    pub replay_trials: usize,
    /// Run evolution every N ticks; 0 disables the background runs.
    pub interval_ticks: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: 30,
            generations: 20,
            replay_trials: 60,
            interval_ticks: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".into(),
        }
    }
}

impl NetwardConfig {
    /// Load config from a TOML file path; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> NetwardResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: NetwardConfig = toml::from_str(&content)
            .map_err(|e| NetwardError::Config(format!("failed to parse config: {}", e)))?;
        info!(
            path = %path.display(),
            window_secs = config.capture.window_seconds,
            estimator_trials = config.estimator.trials,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save current config to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> NetwardResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NetwardError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.data_dir)
    }

    pub fn outcomes_path(&self) -> PathBuf {
        self.data_dir().join("outcomes.jsonl")
    }

    pub fn best_genome_path(&self) -> PathBuf {
        self.data_dir().join("best_genome.json")
    }

    pub fn blocklist_path(&self) -> PathBuf {
        self.data_dir().join("blocked_addresses.txt")
    }
}
