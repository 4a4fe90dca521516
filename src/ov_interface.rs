// Shared types and the collaborator contracts the driver modes are written against

// all indices into the same node table
pub type NodeId = usize;
pub type ArityLevel = usize;
pub type Round = usize;

// ============================================================================
// Route accounting results
// ============================================================================

/// Whole-network statistics reported by a full low-route update
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStats {
    /// Mean low-route distance over ordered live pairs (unreachable pairs penalised)
    pub avg_distance: f64,

    /// Fraction of ordered live pairs without any route
    pub unreachable_fraction: f64,

    /// Node count per arity, buckets `0..=max_arity`
    pub arity_histogram: Vec<usize>,

    /// Share of transit routes carried by nodes of each arity, buckets `0..=max_arity`
    pub bc_arity_histogram: Vec<f64>,
}

/// Outcome of restructuring a single arity level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArityUpdate {
    /// Mean low-route distance after the update
    pub avg_distance: f64,

    /// Routes that crossed a dropped link
    pub routes_killed: u64,
}

// ============================================================================
// Collaborators
// ============================================================================

/// Pairwise latency lookup, loaded once and shared read-only by every copy
pub trait LatencyOracle: Send + Sync {
    /// Node-count bound of the dataset
    fn size(&self) -> usize;

    /// Latency between two nodes, `None` when the pair was never measured
    fn distance(&self, a: NodeId, b: NodeId) -> Option<f64>;

    /// Largest known latency
    fn max_latency(&self) -> f64;
}

/// Mutable overlay topology plus its routing tables
///
/// Implementations must be deep-copyable: a clone shares no mutable state with
/// the original, so candidate copies can be restructured on separate threads.
pub trait OverlayState: Clone + Send + Sync {
    fn size(&self) -> usize;

    /// Lowest arity level (`k`)
    fn min_arity(&self) -> ArityLevel;

    /// Highest arity level (`maxPeer`)
    fn max_arity(&self) -> ArityLevel;

    /// Reboot each node independently with `probability`, reproducibly for `round_seed`
    fn reboot(&mut self, probability: f64, round_seed: u64);

    /// Permanently fail a random `fraction` of the live nodes
    fn kill_fraction(&mut self, fraction: f64);

    /// Measure the current routes, then restructure every arity level.
    /// Routes killed by churn since the last call and by the restructuring are
    /// added to `killed`.
    fn update_low_routes(&mut self, killed: &mut u64) -> RouteStats;

    /// Restructure only the nodes currently at `level`
    fn update_low_routes_arity(&mut self, level: ArityLevel) -> ArityUpdate;

    /// Current mean low-route distance, without restructuring
    fn avg_distance(&mut self) -> f64;

    /// Node count per arity, buckets `0..=max_arity`
    fn arity_histogram(&self) -> Vec<usize>;

    /// Fraction of ordered live pairs that cannot reach each other
    fn unavailability_fraction(&mut self) -> f64;
}

/// Slice `[min, max]` out of a full `0..=max_arity` histogram
pub fn restrict_histogram(histogram: &[usize], min: ArityLevel, max: ArityLevel) -> Vec<usize> {
    (min..=max)
        .map(|level| histogram.get(level).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrict_histogram() {
        let histogram = vec![0, 1, 2, 3, 4, 5];
        assert_eq!(restrict_histogram(&histogram, 2, 4), vec![2, 3, 4]);
        assert_eq!(restrict_histogram(&histogram, 5, 5), vec![5]);

        // Levels beyond the buffer read as empty
        assert_eq!(restrict_histogram(&histogram, 4, 7), vec![4, 5, 0, 0]);
    }
}
