// Overlay graph
//
// Each node owns an ordered list of outgoing links; link `i` sits on arity
// level `i + 1`, so a node never holds two links on the same level and its
// arity is simply the number of links it holds. Levels `1..=k` are the
// baseline every live node is repaired back to, levels above `k` are optional
// shortcuts grown by the arity update.
//
// The graph caches its routing table. Every structural change drops the
// cache; the next accounting call rebuilds it.

use std::sync::Arc;

use hashbrown::HashSet;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ov_interface::{
    ArityLevel, ArityUpdate, LatencyOracle, NodeId, OverlayState, RouteStats,
};
use crate::ov_routes::RouteTable;

/// Random draws tried before giving up on finding a new link target
const MAX_LINK_ATTEMPTS: usize = 64;

/// Decorrelates per-round churn streams from the run seed
const ROUND_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Degree-bounded overlay with cached low routes
#[derive(Clone)]
pub struct Graph {
    size: usize,
    min_arity: ArityLevel,
    max_arity: ArityLevel,
    seed: u64,

    links: Vec<Vec<NodeId>>,
    alive: Vec<bool>,

    latency: Arc<dyn LatencyOracle>,
    rng: StdRng,

    routes: Option<RouteTable>,
    // routes cut by churn, not yet reported by a full update
    churn_killed: u64,
}

impl Graph {
    /// Build an overlay where every node holds `min_arity` random links
    pub fn new(
        size: usize,
        min_arity: ArityLevel,
        max_arity: ArityLevel,
        seed: u64,
        latency: Arc<dyn LatencyOracle>,
    ) -> Self {
        let mut graph = Self {
            size,
            min_arity,
            max_arity,
            seed,
            links: vec![Vec::with_capacity(max_arity); size],
            alive: vec![true; size],
            latency,
            rng: StdRng::seed_from_u64(seed),
            routes: None,
            churn_killed: 0,
        };

        for node in 0..size {
            graph.repair_node(node);
        }

        debug!(
            "Built overlay: {} nodes, arity {}..={}, seed {}",
            size, min_arity, max_arity, seed
        );
        graph
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn links(&self, node: NodeId) -> &[NodeId] {
        &self.links[node]
    }

    pub fn arity(&self, node: NodeId) -> ArityLevel {
        self.links[node].len()
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.alive[node]
    }

    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Routing table of the current topology, rebuilt if stale
    pub fn routes(&mut self) -> &RouteTable {
        let links = &self.links;
        let alive = &self.alive;
        let latency = self.latency.as_ref();
        self.routes
            .get_or_insert_with(|| RouteTable::compute(links, alive, latency))
    }

    // takes the table out of the cache, computing it first if needed
    fn take_routes(&mut self) -> RouteTable {
        match self.routes.take() {
            Some(table) => table,
            None => RouteTable::compute(&self.links, &self.alive, self.latency.as_ref()),
        }
    }

    // ========================================================================
    // Link management
    // ========================================================================

    // Picks a live target `node` is not yet linked to, with a known latency.
    // Works on split borrows so callers can pass either the graph RNG or a
    // per-round churn RNG.
    fn add_random_link(
        links: &mut [Vec<NodeId>],
        alive: &[bool],
        latency: &dyn LatencyOracle,
        node: NodeId,
        exclude: Option<NodeId>,
        rng: &mut StdRng,
    ) -> bool {
        let size = links.len();
        if size < 2 {
            return false;
        }

        for _ in 0..MAX_LINK_ATTEMPTS {
            let target = rng.gen_range(0..size);
            if target == node
                || !alive[target]
                || Some(target) == exclude
                || links[node].contains(&target)
                || latency.distance(node, target).is_none()
            {
                continue;
            }
            links[node].push(target);
            return true;
        }

        trace!("node {} found no new link target", node);
        false
    }

    // Drops the least-used link of `node`, links a replacement and optionally
    // one extra shortcut. Returns the routes that crossed the dropped link.
    fn restructure_node(&mut self, node: NodeId, table: &RouteTable, grow: bool) -> u64 {
        let Some(slot) = table.least_used_slot(node) else {
            return 0;
        };
        let killed = table.link_usage(node, slot);
        let dropped = self.links[node].remove(slot);

        let extra = if grow && self.links[node].len() + 2 <= self.max_arity {
            2
        } else {
            1
        };
        for _ in 0..extra {
            Self::add_random_link(
                &mut self.links,
                &self.alive,
                self.latency.as_ref(),
                node,
                Some(dropped),
                &mut self.rng,
            );
        }

        killed
    }

    fn repair_node(&mut self, node: NodeId) {
        while self.links[node].len() < self.min_arity {
            if !Self::add_random_link(
                &mut self.links,
                &self.alive,
                self.latency.as_ref(),
                node,
                None,
                &mut self.rng,
            ) {
                break;
            }
        }
    }

    fn stats(&self, table: &RouteTable) -> RouteStats {
        let arity_histogram = self.arity_histogram();

        let mut bc_arity_histogram = vec![0.0; self.max_arity + 1];
        let mut total_transit = 0u64;
        for node in 0..self.size {
            let transit = table.transit(node);
            let bucket = self.links[node].len().min(self.max_arity);
            bc_arity_histogram[bucket] += transit as f64;
            total_transit += transit;
        }
        if total_transit > 0 {
            for share in &mut bc_arity_histogram {
                *share /= total_transit as f64;
            }
        }

        RouteStats {
            avg_distance: table.avg_distance(),
            unreachable_fraction: table.unreachable_fraction(),
            arity_histogram,
            bc_arity_histogram,
        }
    }
}

impl OverlayState for Graph {
    fn size(&self) -> usize {
        self.size
    }

    fn min_arity(&self) -> ArityLevel {
        self.min_arity
    }

    fn max_arity(&self) -> ArityLevel {
        self.max_arity
    }

    fn reboot(&mut self, probability: f64, round_seed: u64) {
        if self.size == 0 || probability <= 0.0 {
            return;
        }

        let mut rng =
            StdRng::seed_from_u64(self.seed ^ round_seed.wrapping_add(1).wrapping_mul(ROUND_SEED_MIX));
        let rebooted: HashSet<NodeId> = (0..self.size)
            .filter(|_| rng.gen::<f64>() < probability)
            .collect();
        if rebooted.is_empty() {
            return;
        }

        let table = self.take_routes();
        for owner in 0..self.size {
            let owner_rebooted = rebooted.contains(&owner);
            for (slot, target) in self.links[owner].iter().enumerate() {
                if owner_rebooted || rebooted.contains(target) {
                    self.churn_killed += table.link_usage(owner, slot);
                }
            }
        }

        for owner in 0..self.size {
            if rebooted.contains(&owner) {
                self.links[owner].clear();
                self.alive[owner] = true;
            } else {
                self.links[owner].retain(|target| !rebooted.contains(target));
            }
        }

        // rebooted nodes rejoin first, then owners that lost a link are
        // topped back up to k; both in index order on the round RNG
        let rejoin_order = (0..self.size)
            .filter(|n| rebooted.contains(n))
            .chain((0..self.size).filter(|n| !rebooted.contains(n)));
        for node in rejoin_order {
            if !self.alive[node] {
                continue;
            }
            while self.links[node].len() < self.min_arity {
                if !Self::add_random_link(
                    &mut self.links,
                    &self.alive,
                    self.latency.as_ref(),
                    node,
                    None,
                    &mut rng,
                ) {
                    break;
                }
            }
        }

        debug!(
            "Round seed {}: {} nodes rebooted, {} routes pending",
            round_seed,
            rebooted.len(),
            self.churn_killed
        );
    }

    fn kill_fraction(&mut self, fraction: f64) {
        let mut killed = 0;
        for node in 0..self.size {
            if self.alive[node] && self.rng.gen::<f64>() < fraction {
                self.alive[node] = false;
                killed += 1;
            }
        }
        if killed == 0 {
            return;
        }

        let alive = &self.alive;
        for (owner, targets) in self.links.iter_mut().enumerate() {
            if alive[owner] {
                targets.retain(|target| alive[*target]);
            } else {
                targets.clear();
            }
        }
        self.routes = None;
    }

    fn update_low_routes(&mut self, killed: &mut u64) -> RouteStats {
        let table = self.take_routes();
        let stats = self.stats(&table);

        *killed += std::mem::take(&mut self.churn_killed);
        for node in 0..self.size {
            if !self.alive[node] {
                continue;
            }
            if self.links[node].len() < self.min_arity {
                self.repair_node(node);
            } else {
                *killed += self.restructure_node(node, &table, false);
            }
        }

        stats
    }

    fn update_low_routes_arity(&mut self, level: ArityLevel) -> ArityUpdate {
        let table = self.take_routes();
        let members: Vec<NodeId> = (0..self.size)
            .filter(|&n| self.alive[n] && self.links[n].len() == level)
            .collect();

        if level < self.min_arity || level > self.max_arity || members.is_empty() {
            let avg_distance = table.avg_distance();
            self.routes = Some(table);
            return ArityUpdate {
                avg_distance,
                routes_killed: 0,
            };
        }

        let grow = level < self.max_arity;
        let routes_killed: u64 = members
            .iter()
            .map(|&node| self.restructure_node(node, &table, grow))
            .sum();

        let avg_distance = self.routes().avg_distance();
        ArityUpdate {
            avg_distance,
            routes_killed,
        }
    }

    fn avg_distance(&mut self) -> f64 {
        self.routes().avg_distance()
    }

    fn arity_histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; self.max_arity + 1];
        for targets in &self.links {
            histogram[targets.len().min(self.max_arity)] += 1;
        }
        histogram
    }

    fn unavailability_fraction(&mut self) -> f64 {
        self.routes().unreachable_fraction()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ov_latency::Latency;

    fn graph(size: usize, k: usize, max: usize, seed: u64) -> Graph {
        let latency: Arc<dyn LatencyOracle> = Arc::new(Latency::synthetic(size, seed));
        Graph::new(size, k, max, seed, latency)
    }

    fn assert_one_link_per_level(g: &Graph) {
        for node in 0..g.size() {
            let links = g.links(node);
            assert!(links.len() <= g.max_arity());
            let distinct: HashSet<NodeId> = links.iter().copied().collect();
            assert_eq!(distinct.len(), links.len(), "node {} has duplicate links", node);
            assert!(!links.contains(&node));
        }
    }

    #[test]
    fn test_new_graph_has_baseline_arity() {
        let g = graph(50, 4, 8, 1);
        for node in 0..50 {
            assert_eq!(g.arity(node), 4);
        }
        assert_one_link_per_level(&g);

        let histogram = g.arity_histogram();
        assert_eq!(histogram.len(), 9);
        assert_eq!(histogram[4], 50);
        assert_eq!(histogram.iter().sum::<usize>(), 50);
    }

    #[test]
    fn test_same_seed_same_graph() {
        let a = graph(40, 3, 6, 9);
        let b = graph(40, 3, 6, 9);
        for node in 0..40 {
            assert_eq!(a.links(node), b.links(node));
        }
    }

    #[test]
    fn test_copies_are_isolated() {
        let mut original = graph(40, 3, 6, 2);
        let before: Vec<Vec<NodeId>> = (0..40).map(|n| original.links(n).to_vec()).collect();
        let distance = original.avg_distance();

        let mut copy = original.clone();
        let update = copy.update_low_routes_arity(3);
        assert!(update.routes_killed > 0);
        copy.reboot(0.5, 1);

        for node in 0..40 {
            assert_eq!(original.links(node), before[node].as_slice());
        }
        assert_eq!(original.avg_distance(), distance);
    }

    #[test]
    fn test_arity_update_grows_the_level() {
        let mut g = graph(60, 3, 6, 4);
        let update = g.update_low_routes_arity(3);

        assert!(update.routes_killed > 0);
        assert!(update.avg_distance.is_finite());
        let histogram = g.arity_histogram();
        assert_eq!(histogram.iter().sum::<usize>(), 60);
        // with 60 nodes every restructured node finds two new targets
        assert_eq!(histogram[4], 60);
        assert_one_link_per_level(&g);
    }

    #[test]
    fn test_arity_update_at_max_level_keeps_arity() {
        let mut g = graph(30, 2, 2, 5);
        let update = g.update_low_routes_arity(2);
        assert!(update.routes_killed > 0);
        assert_eq!(g.arity_histogram()[2], 30);
    }

    #[test]
    fn test_arity_update_on_empty_level_is_noop() {
        let mut g = graph(30, 3, 6, 6);
        let before: Vec<Vec<NodeId>> = (0..30).map(|n| g.links(n).to_vec()).collect();
        let distance = g.avg_distance();

        for level in [0, 5, 6, 7] {
            let update = g.update_low_routes_arity(level);
            assert_eq!(update.routes_killed, 0);
            assert_eq!(update.avg_distance, distance);
        }
        for node in 0..30 {
            assert_eq!(g.links(node), before[node].as_slice());
        }
    }

    #[test]
    fn test_reboot_on_empty_graph_is_noop() {
        let mut g = graph(0, 10, 30, 1);
        g.reboot(1.0 / (100.0 + 1.0), 0);
        g.reboot(1.0, 1);
        let mut killed = 0;
        let stats = g.update_low_routes(&mut killed);
        assert_eq!(killed, 0);
        assert_eq!(stats.avg_distance, 0.0);
        assert_eq!(stats.arity_histogram.iter().sum::<usize>(), 0);
    }

    #[test]
    fn test_reboot_counts_killed_routes() {
        let mut g = graph(40, 3, 6, 8);
        g.routes();
        g.reboot(1.0, 0);

        // every node rejoined with a fresh baseline
        for node in 0..40 {
            assert!(g.arity(node) <= 3);
        }
        assert!(g.churn_killed > 0);

        let mut killed = 0;
        g.update_low_routes(&mut killed);
        assert!(killed > 0);
        assert_eq!(g.churn_killed, 0);
    }

    #[test]
    fn test_reboot_is_reproducible_per_round() {
        let mut a = graph(50, 3, 6, 3);
        let mut b = a.clone();
        a.reboot(0.2, 17);
        b.reboot(0.2, 17);
        for node in 0..50 {
            assert_eq!(a.links(node), b.links(node));
        }
    }

    #[test]
    fn test_reboot_keeps_every_node_at_baseline() {
        let mut g = graph(45, 3, 6, 99);
        g.update_low_routes_arity(3);
        for round in 0..20 {
            g.reboot(1.0 / 31.0, round);
            for node in 0..45 {
                assert!(g.arity(node) >= 3, "round {} node {} below k", round, node);
            }
            let histogram = g.arity_histogram();
            assert_eq!(histogram[3..].iter().sum::<usize>(), 45);
            assert_one_link_per_level(&g);
        }
    }

    #[test]
    fn test_full_update_repairs_baseline() {
        let mut g = graph(50, 3, 6, 11);
        g.reboot(0.3, 2);
        let mut killed = 0;
        let stats = g.update_low_routes(&mut killed);

        assert_eq!(stats.arity_histogram.iter().sum::<usize>(), 50);
        assert_eq!(stats.bc_arity_histogram.len(), 7);
        let bc_total: f64 = stats.bc_arity_histogram.iter().sum();
        assert!((bc_total - 1.0).abs() < 1e-9);
        for node in 0..50 {
            assert_eq!(g.arity(node), 3);
        }
        assert_one_link_per_level(&g);
    }

    #[test]
    fn test_kill_fraction_and_unavailability() {
        let mut g = graph(60, 3, 6, 12);
        assert_eq!(g.unavailability_fraction(), 0.0);

        let mut copy = g.clone();
        copy.kill_fraction(0.5);
        assert!(copy.live_count() < 60);
        for node in 0..60 {
            if !copy.is_alive(node) {
                assert!(copy.links(node).is_empty());
            } else {
                assert!(copy.links(node).iter().all(|t| copy.is_alive(*t)));
            }
        }
        let unavailable = copy.unavailability_fraction();
        assert!((0.0..=1.0).contains(&unavailable));
        // dead nodes still count in the histogram, at arity 0
        assert_eq!(copy.arity_histogram().iter().sum::<usize>(), 60);

        // the original keeps every node
        assert_eq!(g.live_count(), 60);
    }
}
