// Replay-driven single-level update
//
// Re-scores a previously discovered update order: every round updates the
// level the schedule names, records the outcome, then applies churn. Nothing
// is decided live, so the same schedule and seed always give the same trace.

use log::info;

use crate::ov_config::RunParams;
use crate::ov_error::{Result, SimError};
use crate::ov_interface::{restrict_histogram, ArityLevel, OverlayState};
use crate::ov_schedule::ReplaySchedule;
use crate::ov_trace::{Progress, ReplayRecord, TraceWriter};

/// Outcome of a replay run
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub rounds: usize,
    pub distances: Vec<f64>,
    pub levels: Vec<ArityLevel>,
    pub cumulative_killed: u64,
}

impl ReplaySummary {
    pub fn print_summary(&self) {
        println!("\n=== Replay Summary ===");
        println!("  Rounds:              {}", self.rounds);
        if let (Some(first), Some(last)) = (self.distances.first(), self.distances.last()) {
            println!("  Distance:            {:.3} -> {:.3}", first, last);
        }
        println!("  Routes killed:       {}", self.cumulative_killed);
    }
}

pub fn run_replay<O: OverlayState>(
    overlay: &mut O,
    schedule: &mut ReplaySchedule,
    params: &RunParams,
    trace: &mut TraceWriter,
) -> Result<ReplaySummary> {
    let (min, max) = (overlay.min_arity(), overlay.max_arity());
    info!(
        "Replay: {} nodes, {} rounds, {} scheduled levels, churn p={:.6}",
        overlay.size(),
        params.rounds,
        schedule.len(),
        params.churn.probability()
    );

    let progress = Progress::new("replay", params.rounds, params.progress_interval);
    let mut summary = ReplaySummary {
        rounds: params.rounds,
        distances: Vec::with_capacity(params.rounds),
        levels: Vec::with_capacity(params.rounds),
        cumulative_killed: 0,
    };

    for round in 0..params.rounds {
        let level = schedule.next_level(round)?;
        if level < min || level > max {
            return Err(SimError::LevelOutOfRange {
                round,
                level,
                min,
                max,
            });
        }

        let update = overlay.update_low_routes_arity(level);
        summary.cumulative_killed += update.routes_killed;
        let histogram = overlay.arity_histogram();

        trace.append(&ReplayRecord {
            round,
            distance: update.avg_distance,
            level,
            cumulative_killed: summary.cumulative_killed,
            arity_counts: restrict_histogram(&histogram, min, max),
        })?;

        params.churn.apply(overlay, round);

        summary.distances.push(update.avg_distance);
        summary.levels.push(level);
        progress.round_done(round, update.avg_distance);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ov_churn::ChurnModel;
    use crate::ov_graph::Graph;
    use crate::ov_latency::Latency;
    use std::fs;
    use std::sync::Arc;

    fn graph(seed: u64) -> Graph {
        let latency = Arc::new(Latency::synthetic(40, seed));
        Graph::new(40, 3, 6, seed, latency)
    }

    fn params(rounds: usize) -> RunParams {
        RunParams {
            rounds,
            churn: ChurnModel::from_lifetime(50.0),
            progress_interval: 10,
        }
    }

    #[test]
    fn test_replay_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.csv");
        let mut trace = TraceWriter::create(&path).unwrap();
        let mut schedule = ReplaySchedule::from_levels(vec![3, 4, 5, 6, 6]);
        let mut overlay = graph(3);

        let summary = run_replay(&mut overlay, &mut schedule, &params(5), &mut trace).unwrap();
        assert_eq!(summary.levels, vec![3, 4, 5, 6, 6]);
        assert!(summary.cumulative_killed > 0);

        let content = fs::read_to_string(&path).unwrap();
        for (round, row) in content.lines().enumerate() {
            let fields: Vec<&str> = row.split(',').collect();
            // round, distance, level, killed, "A", 4 arity buckets (3..=6)
            assert_eq!(fields.len(), 5 + 4);
            assert_eq!(fields[0], round.to_string());
            assert_eq!(fields[2], summary.levels[round].to_string());
            assert_eq!(fields[4], "A");
        }
        assert_eq!(content.lines().count(), 5);
    }

    #[test]
    fn test_rows_cover_every_node_under_churn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.csv");
        let mut trace = TraceWriter::create(&path).unwrap();
        let levels: Vec<usize> = (0..20).map(|r| 3 + r % 4).collect();
        let mut schedule = ReplaySchedule::from_levels(levels);
        let mut overlay = graph(12);
        let params = RunParams {
            rounds: 20,
            churn: ChurnModel::from_lifetime(10.0),
            progress_interval: 10,
        };

        run_replay(&mut overlay, &mut schedule, &params, &mut trace).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 20);
        for row in content.lines() {
            let fields: Vec<&str> = row.split(',').collect();
            let nodes: usize = fields[5..].iter().map(|f| f.parse::<usize>().unwrap()).sum();
            assert_eq!(nodes, 40, "row {}", fields[0]);
        }
    }

    #[test]
    fn test_exhausted_schedule_is_fatal_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.csv");
        let mut trace = TraceWriter::create(&path).unwrap();
        let mut schedule = ReplaySchedule::from_levels(vec![3, 3]);
        let mut overlay = graph(4);

        let result = run_replay(&mut overlay, &mut schedule, &params(4), &mut trace);
        assert!(matches!(result, Err(SimError::ScheduleExhausted { round: 2 })));
        // the two completed rounds are on disk, nothing for round 2
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_out_of_range_level_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = TraceWriter::create(dir.path().join("replay.csv")).unwrap();
        let mut schedule = ReplaySchedule::from_levels(vec![3, 9]);
        let mut overlay = graph(5);

        let result = run_replay(&mut overlay, &mut schedule, &params(2), &mut trace);
        match result {
            Err(SimError::LevelOutOfRange {
                round,
                level,
                min,
                max,
            }) => assert_eq!((round, level, min, max), (1, 9, 3, 6)),
            other => panic!("expected level error, got {:?}", other),
        }
        assert_eq!(trace.rows(), 1);
    }
}
