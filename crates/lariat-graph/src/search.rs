//! Incremental Dijkstra with lazy deletion.
//!
//! The solver keeps a frontier of discovered-but-unsettled vertices in a
//! [`MinQueue`] keyed by best-known distance. [`extend_search`] settles a
//! bounded number of vertices and returns a [`PathfindingSnapshot`], so a
//! caller can interleave solving with progress reporting or run the whole
//! thing at once via [`find_all_paths`].
//!
//! [`extend_search`]: ShortestPaths::extend_search
//! [`find_all_paths`]: ShortestPaths::find_all_paths

use fixedbitset::FixedBitSet;

use crate::snapshot::UNDISCOVERED;
use crate::{EdgeWeigher, Graph, GraphEdge, MinQueue, PathfindingSnapshot};

/// An incremental single-source shortest-paths solver.
///
/// Owns its graph and weigher so that a background worker can own the
/// whole solver exclusively for the duration of a solve.
pub struct ShortestPaths<G: Graph, W: EdgeWeigher<G::Edge>> {
    graph: G,
    weigher: W,
    /// Source vertex of the current search, if one has been set.
    start: Option<usize>,
    distances: Vec<i32>,
    predecessors: Vec<i32>,
    settled: FixedBitSet,
    settled_count: usize,
    frontier: MinQueue<usize>,
}

impl<G: Graph, W: EdgeWeigher<G::Edge>> ShortestPaths<G, W> {
    /// Create a solver for `graph` whose edge costs come from `weigher`.
    /// No start vertex is set; call [`set_start`](Self::set_start) or
    /// [`find_all_paths`](Self::find_all_paths).
    pub fn new(graph: G, weigher: W) -> Self {
        let n = graph.vertex_count();
        Self {
            graph,
            weigher,
            start: None,
            distances: vec![UNDISCOVERED; n],
            predecessors: vec![UNDISCOVERED; n],
            settled: FixedBitSet::with_capacity(n),
            settled_count: 0,
            frontier: MinQueue::new(),
        }
    }

    /// The graph being searched.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Number of vertices whose shortest path from the current start is
    /// final.
    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.settled_count
    }

    /// Total number of vertices in the graph.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    /// Whether shortest paths are known for every vertex reachable from
    /// the current start. `false` until a start has been set.
    #[must_use]
    pub fn all_paths_found(&self) -> bool {
        self.start.is_some() && self.frontier.is_empty()
    }

    /// Discard any previous results and begin a new search from `start`.
    pub fn set_start(&mut self, start: usize) {
        debug_assert!(start < self.vertex_count(), "start {start} out of range");
        self.distances.fill(UNDISCOVERED);
        self.predecessors.fill(UNDISCOVERED);
        self.settled.clear();
        self.settled_count = 0;
        self.frontier.clear();
        self.start = Some(start);
        self.distances[start] = 0;
        self.frontier.add_or_update(start, 0);
    }

    /// Solve completely from `start` and return the final snapshot.
    pub fn find_all_paths(&mut self, start: usize) -> PathfindingSnapshot {
        self.set_start(start);
        let paths = self.extend_search(self.vertex_count());
        debug_assert!(self.all_paths_found());
        paths
    }

    /// Settle up to `max_to_settle` additional vertices and return a
    /// snapshot of the state afterwards.
    ///
    /// Returns early when the frontier empties (all reachable vertices
    /// settled). `max_to_settle == 0` snapshots the current state without
    /// settling anything. If several vertices tie for nearest, which one
    /// settles first is unspecified but stable within a run. Requires
    /// that a start vertex has been set (debug-asserted); without one the
    /// frontier is empty and the returned snapshot is vacuous.
    pub fn extend_search(&mut self, max_to_settle: usize) -> PathfindingSnapshot {
        debug_assert!(self.start.is_some(), "extend_search requires a start vertex");
        let start = self.start.unwrap_or_default();

        let mut settled_now = 0;
        while settled_now < max_to_settle {
            // The frontier may hold stale entries for already-settled
            // vertices (lazy deletion); skip them.
            let Ok(u) = self.frontier.pop() else {
                break;
            };
            if self.settled.contains(u) {
                continue;
            }
            self.settled.insert(u);
            self.settled_count += 1;
            settled_now += 1;

            let du = self.distances[u];
            for edge in self.graph.outgoing_edges(u) {
                let v = edge.end_id();
                let d = du + self.weigher.weight(&edge) as i32;
                let discovered = self.predecessors[v] >= 0 || v == start;
                if !discovered || d < self.distances[v] {
                    self.predecessors[v] = u as i32;
                    self.distances[v] = d;
                    self.frontier.add_or_update(v, d as u32);
                }
            }
        }

        PathfindingSnapshot::new(start, &self.distances, &self.predecessors, &self.settled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::GraphEdge;

    /// Adjacency-list test graph with per-edge weights.
    struct ListGraph {
        adj: Vec<Vec<ListEdge>>,
    }

    #[derive(Clone, Copy)]
    struct ListEdge {
        end: usize,
        weight: u32,
    }

    impl GraphEdge for ListEdge {
        fn end_id(&self) -> usize {
            self.end
        }
    }

    impl Graph for ListGraph {
        type Edge = ListEdge;

        fn vertex_count(&self) -> usize {
            self.adj.len()
        }

        fn outgoing_edges(&self, id: usize) -> impl Iterator<Item = ListEdge> + '_ {
            self.adj[id].iter().copied()
        }
    }

    struct ListWeigher;

    impl EdgeWeigher<ListEdge> for ListWeigher {
        fn weight(&self, edge: &ListEdge) -> u32 {
            edge.weight
        }
    }

    fn graph(n: usize, edges: &[(usize, usize, u32)]) -> ListGraph {
        let mut adj = vec![Vec::new(); n];
        for &(a, b, w) in edges {
            adj[a].push(ListEdge { end: b, weight: w });
        }
        ListGraph { adj }
    }

    fn bidirectional(n: usize, edges: &[(usize, usize, u32)]) -> ListGraph {
        let mut adj = vec![Vec::new(); n];
        for &(a, b, w) in edges {
            adj[a].push(ListEdge { end: b, weight: w });
            adj[b].push(ListEdge { end: a, weight: w });
        }
        ListGraph { adj }
    }

    // Vertices A..G as 0..6.
    const A: usize = 0;
    const B: usize = 1;
    const C: usize = 2;
    const D: usize = 3;
    const E: usize = 4;
    const F: usize = 5;
    const G: usize = 6;

    /// Directed seven-vertex graph where the best route to G threads
    /// through C, E, and F.
    fn seven_vertex_graph() -> ListGraph {
        graph(
            7,
            &[
                (A, B, 9),
                (A, C, 14),
                (A, D, 15),
                (B, E, 23),
                (C, E, 17),
                (C, D, 5),
                (C, F, 30),
                (D, F, 20),
                (D, G, 37),
                (E, F, 3),
                (E, G, 20),
                (F, G, 16),
            ],
        )
    }

    #[test]
    fn finds_shortest_path_through_intermediate_vertices() {
        let mut solver = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        let paths = solver.find_all_paths(A);

        assert_eq!(paths.distance_to(G), 50);
        assert_eq!(paths.path_to(G).unwrap(), vec![A, C, E, F, G]);
        for id in 0..7 {
            assert!(paths.discovered(id), "vertex {id} not discovered");
            assert!(paths.settled(id), "vertex {id} not settled");
        }
        assert!(solver.all_paths_found());
    }

    #[test]
    fn relaxation_lowers_tentative_distances() {
        // The direct A-D edge (5) and A-E edge (4) are both beaten by the
        // chain A-B-C-E-D, which requires re-prioritizing frontier entries.
        let g = bidirectional(
            5,
            &[
                (A, D, 5),
                (D, E, 1),
                (B, C, 1),
                (A, C, 6),
                (C, E, 1),
                (A, B, 1),
                (A, E, 4),
            ],
        );
        let mut solver = ShortestPaths::new(g, ListWeigher);
        let paths = solver.find_all_paths(A);

        assert_eq!(paths.distance_to(D), 4);
        assert_eq!(paths.path_to(D).unwrap(), vec![A, B, C, E, D]);
    }

    #[test]
    fn disconnected_vertices_stay_undiscovered() {
        let g = graph(2, &[]);
        let mut solver = ShortestPaths::new(g, ListWeigher);
        let paths = solver.find_all_paths(A);

        assert_eq!(paths.distance_to(A), 0);
        assert_eq!(paths.distance_to(B), -1);
        assert!(!paths.discovered(B));
        assert_eq!(solver.settled_count(), 1);
        assert!(solver.all_paths_found());
    }

    #[test]
    fn batched_extension_settles_incrementally() {
        let mut solver = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        solver.set_start(A);

        solver.extend_search(3);
        assert_eq!(solver.settled_count(), 3);
        assert!(!solver.all_paths_found());

        solver.extend_search(2);
        assert_eq!(solver.settled_count(), 5);

        solver.extend_search(2 * solver.vertex_count());
        assert_eq!(solver.settled_count(), 7);
        assert!(solver.all_paths_found());
    }

    #[test]
    fn zero_batch_returns_current_state() {
        let mut solver = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        solver.set_start(A);
        let snap = solver.extend_search(0);

        assert_eq!(solver.settled_count(), 0);
        assert_eq!(snap.distance_to(A), 0);
        assert!(snap.discovered(A));
        assert!(!snap.settled(A));
    }

    #[test]
    fn single_step_batches_match_full_solve() {
        let mut all_at_once = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        let full = all_at_once.find_all_paths(A);

        let mut stepwise = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        stepwise.set_start(A);
        let mut last = stepwise.extend_search(1);
        let mut prev_settled = 0;
        while !stepwise.all_paths_found() {
            assert!(
                stepwise.settled_count() >= prev_settled,
                "settled count decreased"
            );
            prev_settled = stepwise.settled_count();
            last = stepwise.extend_search(1);
        }

        for id in 0..7 {
            assert_eq!(full.distance_to(id), last.distance_to(id));
            assert_eq!(full.path_to(id).unwrap(), last.path_to(id).unwrap());
            assert_eq!(full.settled(id), last.settled(id));
        }
    }

    #[test]
    fn path_weights_sum_to_reported_distance() {
        let g = seven_vertex_graph();
        let mut solver = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        let paths = solver.find_all_paths(A);

        for dst in 0..7 {
            let path = paths.path_to(dst).unwrap();
            let mut total = 0i32;
            for pair in path.windows(2) {
                let w = g.adj[pair[0]]
                    .iter()
                    .find(|e| e.end == pair[1])
                    .map(|e| e.weight)
                    .unwrap();
                total += w as i32;
            }
            assert_eq!(
                total,
                paths.distance_to(dst),
                "path weight mismatch for vertex {dst}"
            );
        }
    }

    #[test]
    fn edges_back_into_the_start_do_not_corrupt_it() {
        // A settled start must keep distance 0 even though its neighbors
        // have edges pointing back at it.
        let g = bidirectional(3, &[(A, B, 2), (B, C, 2), (A, C, 7)]);
        let mut solver = ShortestPaths::new(g, ListWeigher);
        let paths = solver.find_all_paths(A);

        assert_eq!(paths.distance_to(A), 0);
        assert_eq!(paths.path_to(A).unwrap(), vec![A]);
        assert_eq!(paths.distance_to(C), 4);
    }

    #[test]
    fn restarting_discards_previous_results() {
        let mut solver = ShortestPaths::new(seven_vertex_graph(), ListWeigher);
        solver.find_all_paths(A);
        let paths = solver.find_all_paths(C);

        assert_eq!(paths.start(), C);
        assert_eq!(paths.distance_to(C), 0);
        // A is unreachable from C in the directed graph.
        assert!(!paths.discovered(A));
    }
}
