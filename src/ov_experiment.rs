// Experiment dispatch
//
// Turns an `ExperimentConfig` into a running driver: resolves the seed, builds
// the latency oracle and the overlay, opens the trace and hands everything to
// the selected mode.

use std::sync::Arc;

use log::info;

use crate::ov_availability::{run_availability, AvailabilitySummary};
use crate::ov_config::{ExperimentConfig, LatencySource, ModeConfig};
use crate::ov_error::{Result, SimError};
use crate::ov_graph::Graph;
use crate::ov_latency::Latency;
use crate::ov_optimizer::{run_optimize, OptimizeSummary};
use crate::ov_pool::CandidatePool;
use crate::ov_replay::{run_replay, ReplaySummary};
use crate::ov_schedule::ReplaySchedule;
use crate::ov_simulate::{run_simulate, SimulateSummary};
use crate::ov_trace::TraceWriter;

/// Result of one experiment, by mode
#[derive(Debug, Clone, PartialEq)]
pub enum RunSummary {
    Simulate(SimulateSummary),
    Replay(ReplaySummary),
    Optimize(OptimizeSummary),
    Availability(AvailabilitySummary),
}

impl RunSummary {
    pub fn print_summary(&self) {
        match self {
            RunSummary::Simulate(summary) => summary.print_summary(),
            RunSummary::Replay(summary) => summary.print_summary(),
            RunSummary::Optimize(summary) => summary.print_summary(),
            RunSummary::Availability(summary) => summary.print_summary(),
        }
    }

    pub fn distances(&self) -> &[f64] {
        match self {
            RunSummary::Simulate(summary) => &summary.distances,
            RunSummary::Replay(summary) => &summary.distances,
            RunSummary::Optimize(summary) => &summary.distances,
            RunSummary::Availability(_) => &[],
        }
    }
}

/// Build the latency oracle a config asks for
pub fn build_latency(config: &ExperimentConfig, seed: u64) -> Result<Latency> {
    match &config.latency {
        LatencySource::Dataset { path } => {
            info!("Loading latency dataset {}", path.display());
            Latency::load(path, config.size)
        }
        LatencySource::Synthetic => Ok(Latency::synthetic(config.size, seed)),
    }
}

pub fn run_experiment(config: &ExperimentConfig) -> Result<RunSummary> {
    config.validate()?;
    let seed = config.resolve_seed();
    info!(
        "Experiment '{}': {} nodes, arity {}..={}, seed {}",
        config.label(),
        config.size,
        config.k,
        config.max_peer,
        seed
    );

    let latency = Arc::new(build_latency(config, seed)?);
    let mut overlay = Graph::new(config.size, config.k, config.max_peer, seed, latency);
    let params = config.run_params();

    // a missing schedule must fail before the trace file is created
    let mut schedule = match &config.mode {
        ModeConfig::ReplayUpdate { schedule } => Some(ReplaySchedule::from_file(schedule)?),
        _ => None,
    };

    let mut trace = TraceWriter::create(&config.output)?;

    let summary = match (&config.mode, schedule.as_mut()) {
        (ModeConfig::Simulate, _) => {
            RunSummary::Simulate(run_simulate(&mut overlay, &params, &mut trace)?)
        }
        (ModeConfig::ReplayUpdate { .. }, Some(schedule)) => {
            RunSummary::Replay(run_replay(&mut overlay, schedule, &params, &mut trace)?)
        }
        (ModeConfig::ReplayUpdate { schedule }, None) => {
            return Err(SimError::Config(format!(
                "replay schedule {} was not loaded",
                schedule.display()
            )))
        }
        (
            ModeConfig::Optimize {
                on_degenerate,
                schedule_out,
            },
            _,
        ) => {
            let pool = CandidatePool::new(config.threads.unwrap_or_else(|| config.range()))?;
            let summary = run_optimize(overlay, &pool, *on_degenerate, &params, &mut trace)?;
            if let Some(path) = schedule_out {
                let written = ReplaySchedule::write(path, &summary.winning_levels)?;
                info!(
                    "Wrote {} winning levels to {}",
                    summary.winning_levels.len(),
                    written.display()
                );
            }
            RunSummary::Optimize(summary)
        }
        (ModeConfig::Availability { step }, _) => {
            let pool = CandidatePool::new(config.threads.unwrap_or(0))?;
            let summary = run_availability(&mut overlay, &pool, *step, &params, &mut trace)?;
            RunSummary::Availability(summary)
        }
    };

    info!(
        "Trace written to {} ({} rows)",
        trace.path().display(),
        trace.rows()
    );
    Ok(summary)
}
