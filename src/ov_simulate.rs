// Full-update simulation
//
// Each round: churn, then recompute and restructure every arity level, then
// record the measured distance, the killed-route total and both histograms.

use log::info;

use crate::ov_config::RunParams;
use crate::ov_error::Result;
use crate::ov_interface::OverlayState;
use crate::ov_trace::{Progress, SimulateRecord, TraceWriter};

/// Outcome of a full-update simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateSummary {
    pub rounds: usize,
    pub distances: Vec<f64>,
    pub killed_routes: u64,
    pub final_unreachable_fraction: f64,
}

impl SimulateSummary {
    pub fn print_summary(&self) {
        println!("\n=== Simulation Summary ===");
        println!("  Rounds:              {}", self.rounds);
        if let (Some(first), Some(last)) = (self.distances.first(), self.distances.last()) {
            println!("  Distance:            {:.3} -> {:.3}", first, last);
        }
        println!("  Routes killed:       {}", self.killed_routes);
        println!(
            "  Unreachable pairs:   {:.4}%",
            self.final_unreachable_fraction * 100.0
        );
    }
}

pub fn run_simulate<O: OverlayState>(
    overlay: &mut O,
    params: &RunParams,
    trace: &mut TraceWriter,
) -> Result<SimulateSummary> {
    info!(
        "Simulate: {} nodes, {} rounds, churn p={:.6}",
        overlay.size(),
        params.rounds,
        params.churn.probability()
    );

    let progress = Progress::new("simulate", params.rounds, params.progress_interval);
    let mut killed = 0u64;
    let mut distances = Vec::with_capacity(params.rounds);
    let mut unreachable = 0.0;

    for round in 0..params.rounds {
        params.churn.apply(overlay, round);
        let stats = overlay.update_low_routes(&mut killed);

        trace.append(&SimulateRecord {
            round,
            avg_distance: stats.avg_distance,
            killed,
            arity_histogram: stats.arity_histogram,
            bc_arity_histogram: stats.bc_arity_histogram,
        })?;

        distances.push(stats.avg_distance);
        unreachable = stats.unreachable_fraction;
        progress.round_done(round, stats.avg_distance);
    }

    Ok(SimulateSummary {
        rounds: params.rounds,
        distances,
        killed_routes: killed,
        final_unreachable_fraction: unreachable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ov_churn::ChurnModel;
    use crate::ov_graph::Graph;
    use crate::ov_latency::Latency;
    use std::fs;
    use std::sync::Arc;

    fn params(rounds: usize, lifetime: f64) -> RunParams {
        RunParams {
            rounds,
            churn: ChurnModel::from_lifetime(lifetime),
            progress_interval: 10,
        }
    }

    fn run_to_file(path: &std::path::Path, seed: u64) -> SimulateSummary {
        let latency = Arc::new(Latency::synthetic(40, seed));
        let mut graph = Graph::new(40, 3, 8, seed, latency);
        let mut trace = TraceWriter::create(path).unwrap();
        run_simulate(&mut graph, &params(15, 10.0), &mut trace).unwrap()
    }

    #[test]
    fn test_rows_and_histograms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulate.csv");
        let summary = run_to_file(&path, 5);

        assert_eq!(summary.rounds, 15);
        assert!(summary.killed_routes > 0);

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows.len(), 15);

        let mut previous_killed = 0u64;
        for (round, row) in rows.iter().enumerate() {
            let fields: Vec<&str> = row.split(',').collect();
            // round, distance, killed, 9 arity buckets, 9 bc buckets
            assert_eq!(fields.len(), 3 + 9 + 9);
            assert_eq!(fields[0].parse::<usize>().unwrap(), round);

            let distance: f64 = fields[1].parse().unwrap();
            assert!(distance.is_finite() && distance > 0.0);

            // the killed-route count is cumulative
            let killed: u64 = fields[2].parse().unwrap();
            assert!(killed >= previous_killed);
            previous_killed = killed;

            let nodes: usize = fields[3..12].iter().map(|f| f.parse::<usize>().unwrap()).sum();
            assert_eq!(nodes, 40);
        }
    }

    #[test]
    fn test_same_inputs_give_identical_traces() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");

        run_to_file(&first, 77);
        run_to_file(&second, 77);

        let a = fs::read(&first).unwrap();
        let b = fs::read(&second).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_network_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let latency = Arc::new(Latency::synthetic(0, 1));
        let mut graph = Graph::new(0, 10, 30, 1, latency);
        let mut trace = TraceWriter::create(&path).unwrap();

        let summary = run_simulate(&mut graph, &params(3, 100.0), &mut trace).unwrap();
        assert_eq!(summary.killed_routes, 0);
        assert_eq!(summary.distances, vec![0.0; 3]);
        assert_eq!(trace.rows(), 3);
    }
}
