// Replay schedule
//
// A previously discovered update order: whitespace-separated arity levels,
// consumed one per round, strictly in order.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::ov_error::{Result, SimError};
use crate::ov_interface::{ArityLevel, Round};

#[derive(Debug, Clone)]
pub struct ReplaySchedule {
    levels: Vec<ArityLevel>,
    cursor: usize,
}

impl ReplaySchedule {
    pub fn from_levels(levels: Vec<ArityLevel>) -> Self {
        Self { levels, cursor: 0 }
    }

    /// Read the whole schedule up front so a malformed entry fails before round 0
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;

        let levels = content
            .split_whitespace()
            .map(|token| {
                token.parse::<ArityLevel>().map_err(|_| SimError::ScheduleParse {
                    path: path.to_path_buf(),
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded replay schedule {}: {} entries",
            path.display(),
            levels.len()
        );
        Ok(Self::from_levels(levels))
    }

    /// Write one level per line, in a form `from_file` reads back
    pub fn write<P: AsRef<Path>>(path: P, levels: &[ArityLevel]) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut content = String::with_capacity(levels.len() * 3);
        for level in levels {
            content.push_str(&level.to_string());
            content.push('\n');
        }
        fs::write(path, content).map_err(|e| SimError::io(path, e))?;
        Ok(path.to_path_buf())
    }

    /// Level to update in `round`
    pub fn next_level(&mut self, round: Round) -> Result<ArityLevel> {
        let level = self
            .levels
            .get(self.cursor)
            .copied()
            .ok_or(SimError::ScheduleExhausted { round })?;
        self.cursor += 1;
        Ok(level)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.levels.len() - self.cursor
    }
}
