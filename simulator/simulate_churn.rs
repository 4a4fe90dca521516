// Churn Simulation Example
//
// Full low-route update every round under churn with lifetime R = 100, on a
// 400-node synthetic latency plane. Before the run, the oracle's own mean ping
// and shortest-path distance are logged as a lower bound for the overlay.

use std::path::PathBuf;

use log::{error, info};
use simple_logger::SimpleLogger;

use ov_rust::ov_churn::SIMULATE_LIFETIME;
use ov_rust::{run_experiment, ExperimentConfig, Latency, LatencySource, ModeConfig};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║    Overlay Churn Simulator                             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let config = ExperimentConfig {
        name: Some("simulate_churn".to_string()),
        mode: ModeConfig::Simulate,
        size: 400,
        k: 10,
        max_peer: 30,
        seed: Some(2500),
        latency: LatencySource::Synthetic,
        output: PathBuf::from("simulate_churn.csv"),
        rounds: 300,
        churn_lifetime: Some(SIMULATE_LIFETIME),
        threads: None,
        progress_interval: 50,
    };

    // same plane the experiment will build from this seed
    let latency = Latency::synthetic(config.size, 2500);
    info!("Average ping: {:.3}", latency.average_ping());
    info!("Average shortest-path distance: {:.3}", latency.average_distance());

    match run_experiment(&config) {
        Ok(summary) => summary.print_summary(),
        Err(e) => {
            error!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    }
}
