// Experiment Runner - Load and execute experiment YAML files
//
// Usage:
//   cargo run --bin experiment_runner scenarios/optimize_small.yaml
//   cargo run --bin experiment_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin experiment_runner scenarios/simulate_small.yaml --seed 0x2500

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::error;
use simple_logger::SimpleLogger;

use ov_rust::{run_experiment, ExperimentConfig};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <experiment.yaml | directory/> [--seed SEED]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/optimize_small.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/simulate_small.yaml --seed 0x2500", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    // Parse optional seed
    let seed: Option<u64> = if args.len() >= 4 && args[2] == "--seed" {
        match parse_seed(&args[3]) {
            Some(seed) => Some(seed),
            None => {
                eprintln!("Error: invalid seed '{}'", args[3]);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let failures = if path.is_file() {
        usize::from(!run_experiment_file(path, seed))
    } else if path.is_dir() {
        run_experiment_directory(path, seed)
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    };

    if failures > 0 {
        std::process::exit(1);
    }
}

/// Decimal or 0x-prefixed hex
fn parse_seed(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn run_experiment_directory(dir: &Path, seed: Option<u64>) -> usize {
    let mut experiments: Vec<PathBuf> = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let extension = path.extension().and_then(|s| s.to_str());
            if extension == Some("yaml") || extension == Some("yml") {
                experiments.push(path);
            }
        }
    }

    experiments.sort();

    if experiments.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  EXPERIMENT RUNNER - Multiple Experiments              ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} experiment(s) to run\n", experiments.len());

    let mut failures = 0;
    for (i, experiment_path) in experiments.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, experiments.len(), experiment_path.display());
        if !run_experiment_file(experiment_path, seed) {
            failures += 1;
        }
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All experiments complete ({} failed)                   ", failures);
    println!("╚════════════════════════════════════════════════════════╝\n");
    failures
}

fn run_experiment_file(path: &Path, seed: Option<u64>) -> bool {
    println!("Loading experiment from: {}", path.display());

    let mut config = match ExperimentConfig::from_yaml_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {}", path.display(), e);
            return false;
        }
    };

    // command-line seed overrides the file
    if seed.is_some() {
        config.seed = seed;
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    let name = config.label().to_string();
    println!("║  {}  {}", name, " ".repeat(54_usize.saturating_sub(name.len())));
    println!("╚════════════════════════════════════════════════════════╝\n");

    match run_experiment(&config) {
        Ok(summary) => {
            summary.print_summary();
            println!("\nTrace: {}", config.output.display());
            true
        }
        Err(e) => {
            error!("Experiment '{}' failed: {}", name, e);
            false
        }
    }
}
