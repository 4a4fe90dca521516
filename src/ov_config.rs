// Experiment configuration
//
// One struct carries every parameter an experiment needs. It can be built in
// code (the reference experiments below) or loaded from a YAML file.

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Deserialize;

use crate::ov_churn::{ChurnModel, OPTIMIZE_LIFETIME, SIMULATE_LIFETIME};
use crate::ov_error::{Result, SimError};
use crate::ov_interface::ArityLevel;
use crate::ov_optimizer::DegeneratePolicy;

// ============================================================================
// Main Configuration
// ============================================================================

/// Main configuration for an overlay experiment
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Label used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Driver mode and its mode-specific settings
    pub mode: ModeConfig,

    /// Number of overlay nodes
    pub size: usize,

    /// Lowest arity level (baseline links per node)
    pub k: ArityLevel,

    /// Highest arity level
    pub max_peer: ArityLevel,

    /// Run seed (None = generate random)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Where pairwise latencies come from
    pub latency: LatencySource,

    /// Trace file path
    pub output: PathBuf,

    /// Number of rounds
    pub rounds: usize,

    /// Expected node lifetime R in rounds; churn probability is 1 / (R + 1).
    /// None disables churn.
    #[serde(default)]
    pub churn_lifetime: Option<f64>,

    /// Candidate pool workers (None = one per candidate)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Log progress at info level every N rounds
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

/// Driver modes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeConfig {
    /// Churn plus full low-route update every round
    Simulate,

    /// Update the arity levels listed in a schedule file, one per round
    ReplayUpdate { schedule: PathBuf },

    /// Greedy search over which arity level to update next
    Optimize {
        #[serde(default)]
        on_degenerate: DegeneratePolicy,

        /// Also write the winning levels, ready to be replayed
        #[serde(default)]
        schedule_out: Option<PathBuf>,
    },

    /// Unavailability of failed-node copies at increasing failure fractions
    Availability {
        #[serde(default = "default_availability_step")]
        step: f64,
    },
}

/// Latency oracle source
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatencySource {
    /// `i j latency` dataset, nodes at or above `size` ignored
    Dataset { path: PathBuf },

    /// Random planar placement derived from the run seed
    Synthetic,
}

/// Loop parameters shared by every driver mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub rounds: usize,
    pub churn: ChurnModel,
    pub progress_interval: usize,
}

fn default_progress_interval() -> usize {
    100
}

fn default_availability_step() -> f64 {
    0.05
}

// ============================================================================
// Reference Experiments
// ============================================================================

/// Dataset the reference experiments were run against
pub const REFERENCE_DATASET: &str = "datasets/latency_2_2500";

impl ExperimentConfig {
    fn reference(mode: ModeConfig, rounds: usize, lifetime: f64, output: &str) -> Self {
        Self {
            name: None,
            mode,
            size: 2500,
            k: 10,
            max_peer: 30,
            seed: None,
            latency: LatencySource::Dataset {
                path: PathBuf::from(REFERENCE_DATASET),
            },
            output: PathBuf::from(output),
            rounds,
            churn_lifetime: Some(lifetime),
            threads: None,
            progress_interval: default_progress_interval(),
        }
    }

    /// 3000 rounds of churn (R = 100) and full updates
    pub fn reference_simulate() -> Self {
        let mut config = Self::reference(ModeConfig::Simulate, 3000, SIMULATE_LIFETIME, "out.csv");
        config.name = Some("simulate".to_string());
        config
    }

    /// 3000 rounds replaying `update_order` with churn R = 2500
    pub fn reference_replay() -> Self {
        let mode = ModeConfig::ReplayUpdate {
            schedule: PathBuf::from("update_order"),
        };
        let mut config = Self::reference(mode, 3000, OPTIMIZE_LIFETIME, "test_optimized_0.csv");
        config.name = Some("replay".to_string());
        config
    }

    /// 1000 greedy rounds with churn R = 2500
    pub fn reference_optimize() -> Self {
        let mode = ModeConfig::Optimize {
            on_degenerate: DegeneratePolicy::default(),
            schedule_out: None,
        };
        let mut config = Self::reference(mode, 1000, OPTIMIZE_LIFETIME, "out.csv");
        config.name = Some("optimize".to_string());
        config
    }

    /// Parse a YAML experiment file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations no driver can run
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(SimError::Config("k must be at least 1".to_string()));
        }
        if self.max_peer < self.k {
            return Err(SimError::Config(format!(
                "max_peer ({}) must not be below k ({})",
                self.max_peer, self.k
            )));
        }
        if self.size > 0 && self.k >= self.size {
            return Err(SimError::Config(format!(
                "k ({}) must be below the network size ({})",
                self.k, self.size
            )));
        }
        if self.rounds == 0 {
            return Err(SimError::Config("rounds must be at least 1".to_string()));
        }
        if let Some(lifetime) = self.churn_lifetime {
            if !lifetime.is_finite() || lifetime < 0.0 {
                return Err(SimError::Config(format!(
                    "churn_lifetime must be a non-negative number, got {}",
                    lifetime
                )));
            }
        }
        // a skipped round has no winning level, so the written order would
        // drift against the replayed rounds
        if let ModeConfig::Optimize {
            on_degenerate: DegeneratePolicy::Skip,
            schedule_out: Some(path),
        } = &self.mode
        {
            return Err(SimError::Config(format!(
                "schedule_out ({}) cannot be combined with on_degenerate: skip",
                path.display()
            )));
        }
        if let ModeConfig::Availability { step } = self.mode {
            if !(step > 0.0 && step < 1.0) {
                return Err(SimError::Config(format!(
                    "availability step must be in (0, 1), got {}",
                    step
                )));
            }
        }
        Ok(())
    }

    /// Number of candidate levels `maxPeer - k + 1`
    pub fn range(&self) -> usize {
        self.max_peer - self.k + 1
    }

    /// Configured seed, or a fresh random one
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::thread_rng().gen())
    }

    pub fn churn(&self) -> ChurnModel {
        self.churn_lifetime
            .map(ChurnModel::from_lifetime)
            .unwrap_or_else(ChurnModel::disabled)
    }

    pub fn run_params(&self) -> RunParams {
        RunParams {
            rounds: self.rounds,
            churn: self.churn(),
            progress_interval: self.progress_interval,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(match self.mode {
            ModeConfig::Simulate => "simulate",
            ModeConfig::ReplayUpdate { .. } => "replay",
            ModeConfig::Optimize { .. } => "optimize",
            ModeConfig::Availability { .. } => "availability",
        })
    }
}
