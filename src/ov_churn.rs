// Churn model
//
// Each round every node independently fails and rejoins with probability
// 1 / (R + 1), where R is the expected lifetime in rounds.

use crate::ov_interface::{OverlayState, Round};

/// Expected lifetime used by the full-update simulation
pub const SIMULATE_LIFETIME: f64 = 100.0;

/// Expected lifetime used by the replay and optimizer runs
pub const OPTIMIZE_LIFETIME: f64 = 2500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChurnModel {
    probability: f64,
}

impl ChurnModel {
    /// Churn with an expected node lifetime of `lifetime` rounds
    pub fn from_lifetime(lifetime: f64) -> Self {
        Self {
            probability: 1.0 / (lifetime + 1.0),
        }
    }

    pub fn disabled() -> Self {
        Self { probability: 0.0 }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Reboot nodes of `overlay` for `round`; the round index seeds the draw
    pub fn apply<O: OverlayState>(&self, overlay: &mut O, round: Round) {
        if self.probability > 0.0 {
            overlay.reboot(self.probability, round as u64);
        }
    }
}
