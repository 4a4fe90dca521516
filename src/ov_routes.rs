// Low-route computation
//
// Links are routed as undirected edges weighted by latency. One Dijkstra per
// live source builds a shortest-path tree; walking the tree bottom-up gives,
// for every link, how many ordered pairs route across it, and for every node,
// how many pairs it relays. Sources run in parallel but are folded in source
// order, so the table is identical from one run to the next.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::ov_interface::{LatencyOracle, NodeId};

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: NodeId,
    weight: f64,
    owner: NodeId,
    slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    cost: f64,
    node: NodeId,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on cost, ties on node id
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest-path tree summary for a single source
struct SourceRoutes {
    distance_sum: f64,
    reached: u64,
    unreached: u64,
    // (owner, slot, routes) for every tree edge
    link_routes: Vec<(NodeId, usize, u64)>,
    // (node, routes relayed)
    transit: Vec<(NodeId, u64)>,
}

/// Routing table of a whole overlay snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    distance_sum: f64,
    reachable_pairs: u64,
    unreachable_pairs: u64,
    penalty: f64,
    link_usage: Vec<Vec<u64>>,
    transit: Vec<u64>,
}

impl RouteTable {
    /// Route every ordered pair of live nodes over `links[owner][slot] = target`
    pub fn compute(links: &[Vec<NodeId>], alive: &[bool], latency: &dyn LatencyOracle) -> Self {
        let n = links.len();
        let adjacency = Self::adjacency(links, latency);
        let live = alive.iter().filter(|a| **a).count();

        let per_source: Vec<SourceRoutes> = (0..n)
            .into_par_iter()
            .filter(|&source| alive[source])
            .map(|source| Self::single_source(&adjacency, alive, live, source))
            .collect();

        let mut table = RouteTable {
            distance_sum: 0.0,
            reachable_pairs: 0,
            unreachable_pairs: 0,
            // an upper bound on any simple path through the live nodes
            penalty: latency.max_latency() * live.saturating_sub(1) as f64,
            link_usage: links.iter().map(|l| vec![0; l.len()]).collect(),
            transit: vec![0; n],
        };

        for routes in per_source {
            table.distance_sum += routes.distance_sum;
            table.reachable_pairs += routes.reached;
            table.unreachable_pairs += routes.unreached;
            for (owner, slot, count) in routes.link_routes {
                table.link_usage[owner][slot] += count;
            }
            for (node, count) in routes.transit {
                table.transit[node] += count;
            }
        }

        table
    }

    fn adjacency(links: &[Vec<NodeId>], latency: &dyn LatencyOracle) -> Vec<Vec<Edge>> {
        let mut adjacency = vec![Vec::new(); links.len()];
        for (owner, targets) in links.iter().enumerate() {
            for (slot, &target) in targets.iter().enumerate() {
                let Some(weight) = latency.distance(owner, target) else {
                    continue;
                };
                adjacency[owner].push(Edge {
                    to: target,
                    weight,
                    owner,
                    slot,
                });
                adjacency[target].push(Edge {
                    to: owner,
                    weight,
                    owner,
                    slot,
                });
            }
        }
        adjacency
    }

    fn single_source(
        adjacency: &[Vec<Edge>],
        alive: &[bool],
        live: usize,
        source: NodeId,
    ) -> SourceRoutes {
        let n = adjacency.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut parent: Vec<Option<Edge>> = vec![None; n];
        let mut settled = vec![false; n];
        let mut order = Vec::with_capacity(live);
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(HeapEntry {
            cost: 0.0,
            node: source,
        });

        while let Some(HeapEntry { cost, node }) = heap.pop() {
            if settled[node] {
                continue;
            }
            settled[node] = true;
            order.push(node);

            for edge in &adjacency[node] {
                if !alive[edge.to] || settled[edge.to] {
                    continue;
                }
                let next = cost + edge.weight;
                if next < dist[edge.to] {
                    dist[edge.to] = next;
                    // parent edge stored as seen from the child
                    parent[edge.to] = Some(Edge { to: node, ..*edge });
                    heap.push(HeapEntry {
                        cost: next,
                        node: edge.to,
                    });
                }
            }
        }

        let reached = order.len() as u64 - 1;
        let distance_sum: f64 = order.iter().skip(1).map(|&v| dist[v]).sum();

        // subtree sizes, leaves first
        let mut subtree = vec![1u64; n];
        let mut link_routes = Vec::with_capacity(order.len());
        let mut transit = Vec::new();
        for &v in order.iter().skip(1).rev() {
            let Some(edge) = parent[v] else { continue };
            let up = edge.to;
            link_routes.push((edge.owner, edge.slot, subtree[v]));
            subtree[up] += subtree[v];
            if up != source {
                transit.push((up, subtree[v]));
            }
        }

        SourceRoutes {
            distance_sum,
            reached,
            unreached: (live as u64 - 1) - reached,
            link_routes,
            transit,
        }
    }

    /// Mean distance over ordered live pairs, unreachable pairs at the penalty
    pub fn avg_distance(&self) -> f64 {
        let pairs = self.reachable_pairs + self.unreachable_pairs;
        if pairs == 0 {
            return 0.0;
        }
        (self.distance_sum + self.unreachable_pairs as f64 * self.penalty) / pairs as f64
    }

    pub fn unreachable_fraction(&self) -> f64 {
        let pairs = self.reachable_pairs + self.unreachable_pairs;
        if pairs == 0 {
            return 0.0;
        }
        self.unreachable_pairs as f64 / pairs as f64
    }

    /// Ordered pairs routed across link `slot` of `owner`
    pub fn link_usage(&self, owner: NodeId, slot: usize) -> u64 {
        self.link_usage
            .get(owner)
            .and_then(|slots| slots.get(slot))
            .copied()
            .unwrap_or(0)
    }

    /// Slot of the link of `owner` carrying the fewest routes, lowest slot on ties
    pub fn least_used_slot(&self, owner: NodeId) -> Option<usize> {
        self.link_usage.get(owner)?.iter().enumerate().fold(
            None,
            |best: Option<(usize, u64)>, (slot, &usage)| match best {
                Some((_, lowest)) if usage >= lowest => best,
                _ => Some((slot, usage)),
            },
        )
        .map(|(slot, _)| slot)
    }

    /// Pairs relayed by `node` as an intermediate hop
    pub fn transit(&self, node: NodeId) -> u64 {
        self.transit.get(node).copied().unwrap_or(0)
    }

    pub fn reachable_pairs(&self) -> u64 {
        self.reachable_pairs
    }

    pub fn unreachable_pairs(&self) -> u64 {
        self.unreachable_pairs
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ov_latency::Latency;

    fn line_latency() -> Latency {
        // 0 - 1 - 2 - 3 with unit latencies along the line, long chords elsewhere
        let mut rows = vec![vec![100.0; 4]; 4];
        for (a, row) in rows.iter_mut().enumerate() {
            row[a] = 0.0;
        }
        for a in 0..3 {
            rows[a][a + 1] = 1.0;
            rows[a + 1][a] = 1.0;
        }
        Latency::from_matrix(&rows)
    }

    #[test]
    fn test_path_graph_routes() {
        let latency = line_latency();
        let links = vec![vec![1], vec![2], vec![3], vec![]];
        let alive = vec![true; 4];

        let table = RouteTable::compute(&links, &alive, &latency);

        assert_eq!(table.reachable_pairs(), 12);
        assert_eq!(table.unreachable_pairs(), 0);
        // distances 1,2,3 / 1,1,2 / 2,1,1 / 3,2,1 = 20
        assert!((table.avg_distance() - 20.0 / 12.0).abs() < 1e-9);

        // link 0-1 carries every pair with exactly one endpoint in {0}: 3 * 2
        assert_eq!(table.link_usage(0, 0), 6);
        // link 1-2 separates {0,1} from {2,3}: 2 * 2 * 2
        assert_eq!(table.link_usage(1, 0), 8);
        assert_eq!(table.link_usage(2, 0), 6);

        // node 1 relays 0<->2, 0<->3 ; node 2 relays 0<->3, 1<->3
        assert_eq!(table.transit(0), 0);
        assert_eq!(table.transit(1), 4);
        assert_eq!(table.transit(2), 4);
        assert_eq!(table.transit(3), 0);
    }

    #[test]
    fn test_unreachable_pairs_are_penalised() {
        let latency = line_latency();
        // {0,1} and {2,3} disconnected
        let links = vec![vec![1], vec![], vec![3], vec![]];
        let alive = vec![true; 4];

        let table = RouteTable::compute(&links, &alive, &latency);

        assert_eq!(table.reachable_pairs(), 4);
        assert_eq!(table.unreachable_pairs(), 8);
        assert!((table.unreachable_fraction() - 8.0 / 12.0).abs() < 1e-9);

        let penalty = 100.0 * 3.0;
        let expected = (4.0 + 8.0 * penalty) / 12.0;
        assert!((table.avg_distance() - expected).abs() < 1e-9);
        assert!(table.avg_distance().is_finite());
    }

    #[test]
    fn test_dead_nodes_are_excluded() {
        let latency = line_latency();
        let links = vec![vec![1], vec![2], vec![], vec![]];
        let alive = vec![true, true, true, false];

        let table = RouteTable::compute(&links, &alive, &latency);
        assert_eq!(table.reachable_pairs(), 6);
        assert_eq!(table.unreachable_pairs(), 0);
    }

    #[test]
    fn test_empty_and_single_node() {
        let latency = Latency::from_matrix(&[]);
        let table = RouteTable::compute(&[], &[], &latency);
        assert_eq!(table.avg_distance(), 0.0);
        assert_eq!(table.unreachable_fraction(), 0.0);

        let latency = Latency::from_matrix(&[vec![0.0]]);
        let table = RouteTable::compute(&[vec![]], &[true], &latency);
        assert_eq!(table.avg_distance(), 0.0);
    }

    #[test]
    fn test_least_used_slot_prefers_lowest_on_ties() {
        let latency = line_latency();
        // node 1 links to both neighbours, each link carries 6 routes
        let links = vec![vec![], vec![0, 2], vec![], vec![]];
        let alive = vec![true, true, true, false];

        let table = RouteTable::compute(&links, &alive, &latency);
        assert_eq!(table.link_usage(1, 0), table.link_usage(1, 1));
        assert_eq!(table.least_used_slot(1), Some(0));
        assert_eq!(table.least_used_slot(0), None);
    }

    #[test]
    fn test_parallel_links_split_usage() {
        let latency = line_latency();
        // 0->1 and 1->0 both exist: only one of them carries the routes
        let links = vec![vec![1], vec![0], vec![], vec![]];
        let alive = vec![true, true, false, false];

        let table = RouteTable::compute(&links, &alive, &latency);
        assert_eq!(table.link_usage(0, 0) + table.link_usage(1, 0), 2);
    }
}
