// Greedy Arity Optimizer Example
//
// 21 candidate levels (k = 10 .. maxPeer = 30) evaluated in parallel every
// round on a 300-node synthetic overlay. The winning levels are written to
// `update_order` so `replay_update` can re-score them.

use std::path::PathBuf;

use log::error;
use simple_logger::SimpleLogger;

use ov_rust::ov_churn::OPTIMIZE_LIFETIME;
use ov_rust::{run_experiment, DegeneratePolicy, ExperimentConfig, LatencySource, ModeConfig};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║    Greedy Arity Optimizer                              ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let config = ExperimentConfig {
        name: Some("optimize_arity".to_string()),
        mode: ModeConfig::Optimize {
            on_degenerate: DegeneratePolicy::Abort,
            schedule_out: Some(PathBuf::from("update_order")),
        },
        size: 300,
        k: 10,
        max_peer: 30,
        seed: Some(2500),
        latency: LatencySource::Synthetic,
        output: PathBuf::from("optimize_arity.csv"),
        rounds: 200,
        churn_lifetime: Some(OPTIMIZE_LIFETIME),
        threads: None,
        progress_interval: 20,
    };

    match run_experiment(&config) {
        Ok(summary) => summary.print_summary(),
        Err(e) => {
            error!("Optimization failed: {}", e);
            std::process::exit(1);
        }
    }
}
