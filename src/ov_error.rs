//! Error taxonomy for experiment setup and driver loops
//!
//! Every variant is fatal: drivers detect the condition before writing the
//! affected round to the trace, so a trace file always ends on the last
//! completed round.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ov_interface::{ArityLevel, Round};

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// An input or output file could not be opened, read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed latency dataset line
    #[error("invalid latency dataset {} line {line}: {reason}", path.display())]
    Dataset {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Replay schedule contains something other than an integer
    #[error("invalid replay schedule {}: `{token}` is not an arity level", path.display())]
    ScheduleParse { path: PathBuf, token: String },

    /// Fewer schedule entries than rounds
    #[error("replay schedule exhausted at round {round}")]
    ScheduleExhausted { round: Round },

    /// Schedule entry outside [k, maxPeer]
    #[error("round {round}: arity level {level} outside [{min}, {max}]")]
    LevelOutOfRange {
        round: Round,
        level: ArityLevel,
        min: ArityLevel,
        max: ArityLevel,
    },

    /// No candidate killed any route, so no marginal cost is defined
    #[error("round {round}: degenerate optimizer round, no candidate killed a route")]
    DegenerateRound { round: Round },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse experiment file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_cause() {
        let err = SimError::ScheduleExhausted { round: 12 };
        assert_eq!(err.to_string(), "replay schedule exhausted at round 12");

        let err = SimError::io(
            "missing.csv",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("missing.csv"));

        let err = SimError::LevelOutOfRange {
            round: 3,
            level: 40,
            min: 10,
            max: 30,
        };
        assert_eq!(err.to_string(), "round 3: arity level 40 outside [10, 30]");
    }
}
