// Latency oracle
//
// Pairwise latencies are held in a dense row-major matrix. Datasets list one
// measurement per line as `i j latency`; pairs that were never measured stay
// unknown and the overlay never links them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::ov_error::{Result, SimError};
use crate::ov_interface::{LatencyOracle, NodeId};

/// Marker for a pair without a measurement
const UNKNOWN: f64 = -1.0;

/// Side of the square synthetic nodes are scattered on
const SYNTHETIC_PLANE: f64 = 1000.0;

/// Dense latency matrix
#[derive(Debug, Clone)]
pub struct Latency {
    size: usize,
    values: Vec<f64>,
    max_latency: f64,
}

impl Latency {
    fn empty(size: usize) -> Self {
        Self {
            size,
            values: vec![UNKNOWN; size * size],
            max_latency: 0.0,
        }
    }

    /// Load a dataset, keeping only nodes below `bound`
    pub fn load<P: AsRef<Path>>(path: P, bound: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SimError::io(path, e))?;
        let reader = BufReader::new(file);

        let mut latency = Self::empty(bound);
        let mut known = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SimError::io(path, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let dataset_error = |reason: String| SimError::Dataset {
                path: path.to_path_buf(),
                line: idx + 1,
                reason,
            };

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(dataset_error(format!(
                    "expected `i j latency`, found {} fields",
                    fields.len()
                )));
            }

            let a: NodeId = fields[0]
                .parse()
                .map_err(|_| dataset_error(format!("bad node id `{}`", fields[0])))?;
            let b: NodeId = fields[1]
                .parse()
                .map_err(|_| dataset_error(format!("bad node id `{}`", fields[1])))?;
            let value: f64 = fields[2]
                .parse()
                .map_err(|_| dataset_error(format!("bad latency `{}`", fields[2])))?;

            if a >= bound || b >= bound || a == b {
                continue;
            }
            // failed measurements are recorded as negative values in the raw datasets
            if !value.is_finite() || value <= 0.0 {
                continue;
            }

            if latency.values[a * bound + b] == UNKNOWN {
                known += 1;
            }
            latency.set(a, b, value);
        }

        latency.recompute_max();
        info!(
            "Loaded latency dataset {}: {} nodes, {} measured pairs",
            path.display(),
            bound,
            known
        );

        Ok(latency)
    }

    /// Nodes scattered uniformly on a plane, latency = euclidean distance + 1
    pub fn synthetic(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let points: Vec<(f64, f64)> = (0..size)
            .map(|_| {
                (
                    rng.gen_range(0.0..SYNTHETIC_PLANE),
                    rng.gen_range(0.0..SYNTHETIC_PLANE),
                )
            })
            .collect();

        let mut latency = Self::empty(size);
        for a in 0..size {
            for b in (a + 1)..size {
                let (dx, dy) = (points[a].0 - points[b].0, points[a].1 - points[b].1);
                latency.set(a, b, (dx * dx + dy * dy).sqrt() + 1.0);
            }
        }
        latency.recompute_max();
        latency
    }

    /// Build from an explicit symmetric matrix; negative entries are unknown
    pub fn from_matrix(rows: &[Vec<f64>]) -> Self {
        let size = rows.len();
        let mut latency = Self::empty(size);
        for (a, row) in rows.iter().enumerate() {
            for (b, &value) in row.iter().enumerate().take(size) {
                if a != b && value.is_finite() && value > 0.0 {
                    latency.set(a, b, value);
                }
            }
        }
        latency.recompute_max();
        latency
    }

    fn set(&mut self, a: NodeId, b: NodeId, value: f64) {
        self.values[a * self.size + b] = value;
        self.values[b * self.size + a] = value;
    }

    fn recompute_max(&mut self) {
        self.max_latency = self.values.iter().copied().fold(0.0, f64::max);
    }

    /// Mean of all measured latencies
    pub fn average_ping(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for a in 0..self.size {
            for b in (a + 1)..self.size {
                if let Some(value) = self.distance(a, b) {
                    sum += value;
                    count += 1;
                }
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Mean shortest-path latency when every measured pair is linked.
    /// This is the best mean any overlay on this dataset can reach.
    pub fn average_distance(&self) -> f64 {
        let per_source: Vec<(f64, usize)> = (0..self.size)
            .into_par_iter()
            .map(|source| self.dense_shortest_paths(source))
            .collect();

        let (sum, count) = per_source
            .iter()
            .fold((0.0, 0usize), |acc, &(s, c)| (acc.0 + s, acc.1 + c));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    // O(n^2) Dijkstra over the complete graph; returns (distance sum, reached)
    fn dense_shortest_paths(&self, source: NodeId) -> (f64, usize) {
        let n = self.size;
        let mut dist = vec![f64::INFINITY; n];
        let mut done = vec![false; n];
        dist[source] = 0.0;

        for _ in 0..n {
            let mut current = None;
            let mut best = f64::INFINITY;
            for v in 0..n {
                if !done[v] && dist[v] < best {
                    best = dist[v];
                    current = Some(v);
                }
            }
            let Some(u) = current else { break };
            done[u] = true;

            for v in 0..n {
                if done[v] {
                    continue;
                }
                if let Some(w) = self.distance(u, v) {
                    if best + w < dist[v] {
                        dist[v] = best + w;
                    }
                }
            }
        }

        dist.iter()
            .enumerate()
            .filter(|&(v, d)| v != source && d.is_finite())
            .fold((0.0, 0), |acc, (_, d)| (acc.0 + d, acc.1 + 1))
    }
}

impl LatencyOracle for Latency {
    fn size(&self) -> usize {
        self.size
    }

    fn distance(&self, a: NodeId, b: NodeId) -> Option<f64> {
        if a >= self.size || b >= self.size || a == b {
            return None;
        }
        let value = self.values[a * self.size + b];
        (value > 0.0).then_some(value)
    }

    fn max_latency(&self) -> f64 {
        self.max_latency
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
