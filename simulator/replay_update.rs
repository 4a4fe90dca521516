// Replay-Update Example
//
// Replays an update order (one arity level per line) against a fresh overlay
// with churn lifetime R = 2500. Without an argument a round-robin order over
// all levels is generated first.
//
// Usage:
//   cargo run --example replay_update [update_order]

use std::env;
use std::path::PathBuf;

use log::error;
use simple_logger::SimpleLogger;

use ov_rust::ov_churn::OPTIMIZE_LIFETIME;
use ov_rust::ov_schedule::ReplaySchedule;
use ov_rust::{run_experiment, ExperimentConfig, LatencySource, ModeConfig};

const SIZE: usize = 300;
const K: usize = 10;
const MAX_PEER: usize = 30;
const ROUNDS: usize = 200;

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║    Overlay Replay-Update                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let schedule = match env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let levels: Vec<usize> = (0..ROUNDS).map(|r| K + r % (MAX_PEER - K + 1)).collect();
            match ReplaySchedule::write("round_robin_order", &levels) {
                Ok(path) => {
                    println!("Generated round-robin order: {}\n", path.display());
                    path
                }
                Err(e) => {
                    error!("Cannot write update order: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let config = ExperimentConfig {
        name: Some("replay_update".to_string()),
        mode: ModeConfig::ReplayUpdate { schedule },
        size: SIZE,
        k: K,
        max_peer: MAX_PEER,
        seed: Some(2500),
        latency: LatencySource::Synthetic,
        output: PathBuf::from("test_optimized_0.csv"),
        rounds: ROUNDS,
        churn_lifetime: Some(OPTIMIZE_LIFETIME),
        threads: None,
        progress_interval: 50,
    };

    match run_experiment(&config) {
        Ok(summary) => summary.print_summary(),
        Err(e) => {
            error!("Replay failed: {}", e);
            std::process::exit(1);
        }
    }
}
