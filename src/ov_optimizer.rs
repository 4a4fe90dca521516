//! Greedy arity optimizer
//!
//! Every round the live overlay is copied once per candidate arity level and
//! each copy updates its level on the candidate pool, in parallel. Once all
//! copies have finished, the candidate with the lowest marginal cost
//!
//! ```text
//! (new distance - committed distance) / routes killed
//! ```
//!
//! replaces the live overlay and every other copy is dropped. Candidates that
//! killed no route have no marginal cost and are never selected, even when
//! their distance improved.

use log::{debug, info, trace, warn};
use serde::Deserialize;

use crate::ov_config::RunParams;
use crate::ov_error::{Result, SimError};
use crate::ov_interface::{restrict_histogram, ArityLevel, ArityUpdate, OverlayState, Round};
use crate::ov_pool::CandidatePool;
use crate::ov_trace::{OptimizeRecord, Progress, TraceWriter};

/// What to do in a round where no candidate killed a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Stop the run with `SimError::DegenerateRound`
    #[default]
    Abort,

    /// Keep the live overlay unchanged and count no winner for the round
    Skip,
}

/// Index of the candidate with the lowest marginal cost, lowest index on ties.
/// `None` when no candidate killed a route.
pub fn select_candidate(results: &[ArityUpdate], previous_distance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (offset, result) in results.iter().enumerate() {
        if result.routes_killed == 0 {
            continue;
        }
        let marginal = (result.avg_distance - previous_distance) / result.routes_killed as f64;
        if marginal.is_nan() {
            continue;
        }
        match best {
            Some((_, lowest)) if marginal >= lowest => {}
            _ => best = Some((offset, marginal)),
        }
    }
    best.map(|(offset, _)| offset)
}

/// A candidate copy after its level update
struct Candidate<O> {
    offset: usize,
    overlay: O,
    update: ArityUpdate,
}

/// What a single optimizer round did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundOutcome {
    Committed {
        level: ArityLevel,
        update: ArityUpdate,
    },
    Skipped {
        distance: f64,
    },
}

/// Hill climber over "which arity level to grow next"
pub struct GreedyOptimizer<O> {
    live: O,
    min_arity: ArityLevel,
    range: usize,
    update_counters: Vec<u64>,
    distance: f64,
    cumulative_killed: u64,
    policy: DegeneratePolicy,
}

impl<O: OverlayState> GreedyOptimizer<O> {
    pub fn new(overlay: O, policy: DegeneratePolicy) -> Self {
        let min_arity = overlay.min_arity();
        let range = overlay.max_arity() + 1 - min_arity;
        Self {
            live: overlay,
            min_arity,
            range,
            update_counters: vec![0; range],
            distance: f64::INFINITY,
            cumulative_killed: 0,
            policy,
        }
    }

    /// Evaluate every candidate level, then commit the winner
    pub fn step(&mut self, pool: &CandidatePool, round: Round) -> Result<RoundOutcome> {
        let min_arity = self.min_arity;
        // build the routing table once so every copy inherits it
        self.live.avg_distance();
        let mut candidates = pool.fork_join(&self.live, self.range, |base, offset| {
            let mut overlay = base.clone();
            let update = overlay.update_low_routes_arity(offset + min_arity);
            Candidate {
                offset,
                overlay,
                update,
            }
        });

        for candidate in &candidates {
            trace!(
                "round {} level {}: distance {:.3} killed {}",
                round,
                candidate.offset + min_arity,
                candidate.update.avg_distance,
                candidate.update.routes_killed
            );
        }

        let results: Vec<ArityUpdate> = candidates.iter().map(|c| c.update).collect();
        let Some(offset) = select_candidate(&results, self.distance) else {
            return self.degenerate(round);
        };

        // losing copies are dropped with the vector
        let winner = candidates.swap_remove(offset);
        drop(candidates);

        self.live = winner.overlay;
        self.update_counters[offset] += 1;
        self.distance = winner.update.avg_distance;
        self.cumulative_killed += winner.update.routes_killed;

        let level = offset + min_arity;
        debug!(
            "round {}: committed level {} (distance {:.3}, killed {})",
            round, level, winner.update.avg_distance, winner.update.routes_killed
        );
        Ok(RoundOutcome::Committed {
            level,
            update: winner.update,
        })
    }

    fn degenerate(&mut self, round: Round) -> Result<RoundOutcome> {
        match self.policy {
            DegeneratePolicy::Abort => Err(SimError::DegenerateRound { round }),
            DegeneratePolicy::Skip => {
                let distance = self.live.avg_distance();
                warn!(
                    "round {}: no candidate killed a route, keeping the overlay (distance {:.3})",
                    round, distance
                );
                self.distance = distance;
                Ok(RoundOutcome::Skipped { distance })
            }
        }
    }

    pub fn live(&self) -> &O {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut O {
        &mut self.live
    }

    /// Distance of the last committed (or kept) overlay, infinite before round 0
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn update_counters(&self) -> &[u64] {
        &self.update_counters
    }

    pub fn cumulative_killed(&self) -> u64 {
        self.cumulative_killed
    }

    pub fn range(&self) -> usize {
        self.range
    }
}

/// Outcome of an optimizer run
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeSummary {
    pub rounds: usize,
    pub min_arity: ArityLevel,
    pub distances: Vec<f64>,
    /// Committed level per round, in order; skipped rounds are absent
    pub winning_levels: Vec<ArityLevel>,
    pub update_counters: Vec<u64>,
    pub cumulative_killed: u64,
    pub skipped_rounds: usize,
}

impl OptimizeSummary {
    pub fn print_summary(&self) {
        println!("\n=== Optimizer Summary ===");
        println!("  Rounds:              {}", self.rounds);
        if let (Some(first), Some(last)) = (self.distances.first(), self.distances.last()) {
            println!("  Distance:            {:.3} -> {:.3}", first, last);
        }
        println!("  Routes killed:       {}", self.cumulative_killed);
        if self.skipped_rounds > 0 {
            println!("  Skipped rounds:      {}", self.skipped_rounds);
        }
        println!("  Updates per level:");
        for (offset, count) in self.update_counters.iter().enumerate() {
            if *count > 0 {
                println!("    {:>3}: {}", offset + self.min_arity, count);
            }
        }
    }
}

pub fn run_optimize<O: OverlayState>(
    overlay: O,
    pool: &CandidatePool,
    policy: DegeneratePolicy,
    params: &RunParams,
    trace: &mut TraceWriter,
) -> Result<OptimizeSummary> {
    let (min, max) = (overlay.min_arity(), overlay.max_arity());
    let mut optimizer = GreedyOptimizer::new(overlay, policy);
    info!(
        "Optimize: {} nodes, {} candidate levels on {} threads, {} rounds, churn p={:.6}",
        optimizer.live().size(),
        optimizer.range(),
        pool.threads(),
        params.rounds,
        params.churn.probability()
    );

    let progress = Progress::new("optimize", params.rounds, params.progress_interval);
    let mut summary = OptimizeSummary {
        rounds: params.rounds,
        min_arity: min,
        distances: Vec::with_capacity(params.rounds),
        winning_levels: Vec::with_capacity(params.rounds),
        update_counters: Vec::new(),
        cumulative_killed: 0,
        skipped_rounds: 0,
    };

    for round in 0..params.rounds {
        match optimizer.step(pool, round)? {
            RoundOutcome::Committed { level, .. } => summary.winning_levels.push(level),
            RoundOutcome::Skipped { .. } => summary.skipped_rounds += 1,
        }

        // the recorded histogram is the committed overlay, before this round's churn
        let record = OptimizeRecord {
            round,
            distance: optimizer.distance(),
            cumulative_killed: optimizer.cumulative_killed(),
            update_counters: optimizer.update_counters().to_vec(),
            arity_counts: restrict_histogram(&optimizer.live().arity_histogram(), min, max),
        };

        params.churn.apply(optimizer.live_mut(), round);
        trace.append(&record)?;

        summary.distances.push(record.distance);
        progress.round_done(round, record.distance);
    }

    summary.update_counters = optimizer.update_counters().to_vec();
    summary.cumulative_killed = optimizer.cumulative_killed();
    Ok(summary)
}

// ============================================================================
// Unit Tests
// ============================================================================
