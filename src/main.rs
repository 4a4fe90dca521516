// Reference experiment: 1000 greedy optimizer rounds over the 2500-node
// latency dataset, churn lifetime 2500, trace in out.csv.
//
// The other reference experiments are available through
// `ExperimentConfig::reference_simulate()` / `reference_replay()` and the
// experiment_runner binary.

use log::{error, info};
use simple_logger::SimpleLogger;

use ov_rust::{run_experiment, ExperimentConfig};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    info!("starting");

    let config = ExperimentConfig::reference_optimize();
    match run_experiment(&config) {
        Ok(summary) => summary.print_summary(),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
