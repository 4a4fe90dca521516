// Availability under mass failure
//
// Each round, for every failure fraction `step, 2*step, ...` below 1, a copy
// of the live overlay loses that fraction of its nodes and reports how many
// live pairs can no longer reach each other. The copies are evaluated on the
// candidate pool; the live overlay then goes through churn and a full update.

use log::info;

use crate::ov_config::RunParams;
use crate::ov_error::Result;
use crate::ov_interface::OverlayState;
use crate::ov_pool::CandidatePool;
use crate::ov_trace::{AvailabilityRecord, Progress, TraceWriter};

// keeps `n * step` just below 1 from producing a fraction of 1
const FRACTION_EPSILON: f64 = 1e-9;

/// Failure fractions `step, 2*step, ...` strictly below 1
pub fn failure_fractions(step: f64) -> Vec<f64> {
    if !(step > 0.0 && step < 1.0) {
        return Vec::new();
    }
    (1..)
        .map(|i| i as f64 * step)
        .take_while(|fraction| *fraction < 1.0 - FRACTION_EPSILON)
        .collect()
}

/// Outcome of an availability run
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilitySummary {
    pub rounds: usize,
    pub fractions: Vec<f64>,
    /// Unavailability per fraction, averaged over all rounds
    pub mean_unavailability: Vec<f64>,
    pub killed_routes: u64,
}

impl AvailabilitySummary {
    pub fn print_summary(&self) {
        println!("\n=== Availability Summary ===");
        println!("  Rounds:              {}", self.rounds);
        println!("  Routes killed:       {}", self.killed_routes);
        println!("  Failed   Unavailable");
        for (fraction, unavailable) in self.fractions.iter().zip(&self.mean_unavailability) {
            println!("  {:>5.1}%   {:>8.4}%", fraction * 100.0, unavailable * 100.0);
        }
    }
}

pub fn run_availability<O: OverlayState>(
    overlay: &mut O,
    pool: &CandidatePool,
    step: f64,
    params: &RunParams,
    trace: &mut TraceWriter,
) -> Result<AvailabilitySummary> {
    let fractions = failure_fractions(step);
    info!(
        "Availability: {} nodes, {} fractions per round, {} rounds, churn p={:.6}",
        overlay.size(),
        fractions.len(),
        params.rounds,
        params.churn.probability()
    );

    let progress = Progress::new("availability", params.rounds, params.progress_interval);
    let mut totals = vec![0.0; fractions.len()];
    let mut killed = 0u64;

    for round in 0..params.rounds {
        let unavailability = pool.fork_join(&*overlay, fractions.len(), |base, idx| {
            let mut copy = base.clone();
            copy.kill_fraction(fractions[idx]);
            copy.unavailability_fraction()
        });

        for (idx, (fraction, value)) in fractions.iter().zip(&unavailability).enumerate() {
            trace.append(&AvailabilityRecord {
                round,
                fraction: *fraction,
                unavailability: *value,
            })?;
            totals[idx] += value;
        }

        params.churn.apply(overlay, round);
        let stats = overlay.update_low_routes(&mut killed);
        progress.round_done(round, stats.avg_distance);
    }

    let rounds = params.rounds.max(1) as f64;
    Ok(AvailabilitySummary {
        rounds: params.rounds,
        mean_unavailability: totals.iter().map(|total| total / rounds).collect(),
        fractions,
        killed_routes: killed,
    })
}
