// Availability Example
//
// Every round, copies of the overlay lose 5%, 10%, ... 95% of their nodes and
// report the fraction of surviving pairs that can no longer reach each other.

use std::path::PathBuf;

use log::error;
use simple_logger::SimpleLogger;

use ov_rust::ov_churn::SIMULATE_LIFETIME;
use ov_rust::{run_experiment, ExperimentConfig, LatencySource, ModeConfig};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║    Overlay Availability Under Failure                  ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let config = ExperimentConfig {
        name: Some("availability_sim".to_string()),
        mode: ModeConfig::Availability { step: 0.05 },
        size: 200,
        k: 10,
        max_peer: 30,
        seed: Some(2500),
        latency: LatencySource::Synthetic,
        output: PathBuf::from("availability.csv"),
        rounds: 20,
        churn_lifetime: Some(SIMULATE_LIFETIME),
        threads: None,
        progress_interval: 5,
    };

    match run_experiment(&config) {
        Ok(summary) => summary.print_summary(),
        Err(e) => {
            error!("Availability run failed: {}", e);
            std::process::exit(1);
        }
    }
}
