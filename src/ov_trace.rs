//! Trace output
//!
//! One header-less CSV row per round. Every append is flushed and synced to
//! disk before returning, so a trace is complete up to the last round that
//! finished even if the process is killed.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::ov_error::{Result, SimError};
use crate::ov_interface::{ArityLevel, Round};

// ============================================================================
// Trace Writer
// ============================================================================

/// Durable line-oriented CSV sink
pub struct TraceWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl TraceWriter {
    /// Create (or truncate) the trace file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| SimError::io(&path, e))?;

        info!("Writing trace to {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            rows: 0,
        })
    }

    /// Append one record and force it to stable storage
    pub fn append<R: fmt::Display>(&mut self, record: &R) -> Result<()> {
        writeln!(self.writer, "{}", record).map_err(|e| SimError::io(&self.path, e))?;
        self.writer
            .flush()
            .map_err(|e| SimError::io(&self.path, e))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| SimError::io(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// Round Records
// ============================================================================

/// Full-update simulation row:
/// `round,avgDistance,killed,arity_0..arity_max,bcArity_0..bcArity_max`
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateRecord {
    pub round: Round,
    pub avg_distance: f64,
    pub killed: u64,
    pub arity_histogram: Vec<usize>,
    pub bc_arity_histogram: Vec<f64>,
}

impl fmt::Display for SimulateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{:.6},{}", self.round, self.avg_distance, self.killed)?;
        for count in &self.arity_histogram {
            write!(f, ",{}", count)?;
        }
        for share in &self.bc_arity_histogram {
            write!(f, ",{:.6}", share)?;
        }
        Ok(())
    }
}

/// Replay row: `round,distance,level,cumulativeKilled,A,arity_k..arity_max`
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    pub round: Round,
    pub distance: f64,
    pub level: ArityLevel,
    pub cumulative_killed: u64,
    pub arity_counts: Vec<usize>,
}

impl fmt::Display for ReplayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:.6},{},{},A",
            self.round, self.distance, self.level, self.cumulative_killed
        )?;
        for count in &self.arity_counts {
            write!(f, ",{}", count)?;
        }
        Ok(())
    }
}

/// Optimizer row:
/// `round,distance,cumulativeKilled,U,counter_0..counter_{range-1},A,arity_k..arity_max`
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRecord {
    pub round: Round,
    pub distance: f64,
    pub cumulative_killed: u64,
    pub update_counters: Vec<u64>,
    pub arity_counts: Vec<usize>,
}

impl fmt::Display for OptimizeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:.6},{},U",
            self.round, self.distance, self.cumulative_killed
        )?;
        for counter in &self.update_counters {
            write!(f, ",{}", counter)?;
        }
        write!(f, ",A")?;
        for count in &self.arity_counts {
            write!(f, ",{}", count)?;
        }
        Ok(())
    }
}

/// Availability row: `round,fraction,unavailability`
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub round: Round,
    pub fraction: f64,
    pub unavailability: f64,
}

impl fmt::Display for AvailabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:.6},{:.6}",
            self.round, self.fraction, self.unavailability
        )
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Round progress on the log, never on the trace
#[derive(Debug, Clone)]
pub struct Progress {
    label: &'static str,
    total: usize,
    interval: usize,
}

impl Progress {
    pub fn new(label: &'static str, total: usize, interval: usize) -> Self {
        Self {
            label,
            total,
            interval: interval.max(1),
        }
    }

    pub fn round_done(&self, round: Round, distance: f64) {
        let done = round + 1;
        if done % self.interval == 0 || done == self.total {
            info!("{}: {}/{} distance {:.3}", self.label, done, self.total, distance);
        } else {
            debug!("{}: {}/{} distance {:.3}", self.label, done, self.total, distance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_record_format() {
        let record = SimulateRecord {
            round: 4,
            avg_distance: 66.92391,
            killed: 120,
            arity_histogram: vec![0, 2, 8],
            bc_arity_histogram: vec![0.0, 0.25, 0.75],
        };
        assert_eq!(
            record.to_string(),
            "4,66.923910,120,0,2,8,0.000000,0.250000,0.750000"
        );
    }

    #[test]
    fn test_replay_record_format() {
        let record = ReplayRecord {
            round: 0,
            distance: 12.5,
            level: 10,
            cumulative_killed: 33,
            arity_counts: vec![5, 3],
        };
        assert_eq!(record.to_string(), "0,12.500000,10,33,A,5,3");
    }

    #[test]
    fn test_optimize_record_format() {
        let record = OptimizeRecord {
            round: 2,
            distance: 1.0,
            cumulative_killed: 7,
            update_counters: vec![2, 0, 1],
            arity_counts: vec![1, 1, 8],
        };
        assert_eq!(record.to_string(), "2,1.000000,7,U,2,0,1,A,1,1,8");
    }

    #[test]
    fn test_availability_record_format() {
        let record = AvailabilityRecord {
            round: 1,
            fraction: 0.05,
            unavailability: 0.0,
        };
        assert_eq!(record.to_string(), "1,0.050000,0.000000");
    }

    #[test]
    fn test_writer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");

        let mut writer = TraceWriter::create(&path).unwrap();
        for round in 0..3 {
            writer
                .append(&AvailabilityRecord {
                    round,
                    fraction: 0.5,
                    unavailability: 0.25,
                })
                .unwrap();
        }
        assert_eq!(writer.rows(), 3);

        // readable while the writer is still open
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "0,0.500000,0.250000\n1,0.500000,0.250000\n2,0.500000,0.250000\n"
        );
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.csv");
        assert!(matches!(TraceWriter::create(&path), Err(SimError::Io { .. })));
    }
}
