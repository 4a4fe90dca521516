//! # ov_rust - Overlay Arity Simulator
//!
//! Simulates a degree-bounded, latency-weighted overlay network under node
//! churn and searches for the order in which its "arity levels" (link slots
//! per node) should be grown to lower the average routed latency.
//!
//! ## Core Components
//!
//! - **Graph**: The overlay snapshot: per-node links, cached low routes, churn
//! - **RouteTable**: All-pairs routing with per-link usage and per-node transit
//! - **Latency**: Pairwise latency oracle loaded from a dataset or generated
//! - **GreedyOptimizer**: Parallel per-level candidates, one winner per round
//! - **Drivers**: Simulate, Replay-Update, Optimize and Availability loops
//!
//! ## Usage
//!
//! Experiments are described by an [`ExperimentConfig`], either built in code
//! or loaded from YAML, and run with [`run_experiment`]. Every driver writes
//! one trace row per round (or per failure fraction) to a CSV-like file.
//!
//! ```no_run
//! use ov_rust::{run_experiment, ExperimentConfig};
//!
//! let config = ExperimentConfig::from_yaml_file("scenarios/optimize_small.yaml")?;
//! let summary = run_experiment(&config)?;
//! summary.print_summary();
//! # Ok::<(), ov_rust::SimError>(())
//! ```
//!
//! The drivers are generic over [`OverlayState`], so any snapshot type that
//! can be cloned into independent copies can be optimized.

// Model
pub mod ov_interface;
pub mod ov_latency;
pub mod ov_routes;
pub mod ov_graph;
pub mod ov_churn;

// Drivers
pub mod ov_simulate;
pub mod ov_replay;
pub mod ov_optimizer;
pub mod ov_availability;
pub mod ov_experiment;

// Plumbing
pub mod ov_config;
pub mod ov_error;
pub mod ov_pool;
pub mod ov_schedule;
pub mod ov_trace;

// Re-export commonly used types
pub use ov_config::{ExperimentConfig, LatencySource, ModeConfig, RunParams};
pub use ov_error::{Result, SimError};
pub use ov_experiment::{run_experiment, RunSummary};
pub use ov_graph::Graph;
pub use ov_interface::{
    ArityLevel, ArityUpdate, LatencyOracle, NodeId, OverlayState, Round, RouteStats,
};
pub use ov_latency::Latency;
pub use ov_optimizer::{DegeneratePolicy, GreedyOptimizer};
