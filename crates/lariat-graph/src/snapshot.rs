//! Immutable snapshots of a partially-completed shortest-paths search.
//!
//! A snapshot deep-copies the solver's distance and predecessor arrays and
//! its settled set, so it stays valid (and answers identically) no matter
//! what the live solver does afterwards. This is what a background solve
//! publishes to the UI thread between batches.

use fixedbitset::FixedBitSet;

use crate::GraphError;

/// Sentinel for "no path known yet" in distance and predecessor arrays.
pub(crate) const UNDISCOVERED: i32 = -1;

/// A frozen view of a search in progress: best known distances,
/// predecessor links, and the set of vertices whose distance is final.
#[derive(Debug, Clone)]
pub struct PathfindingSnapshot {
    start: usize,
    /// `distances[id]` is the weight of the best known path from the start
    /// to `id`, or -1 if none is known yet.
    distances: Vec<i32>,
    /// `predecessors[id]` is the penultimate vertex on that path, or -1
    /// for the start vertex and for undiscovered vertices.
    predecessors: Vec<i32>,
    settled: FixedBitSet,
}

impl PathfindingSnapshot {
    /// Capture the given search state. All inputs are deep-copied.
    pub(crate) fn new(
        start: usize,
        distances: &[i32],
        predecessors: &[i32],
        settled: &FixedBitSet,
    ) -> Self {
        Self {
            start,
            distances: distances.to_vec(),
            predecessors: predecessors.to_vec(),
            settled: settled.clone(),
        }
    }

    /// Id of the vertex the search started from.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of vertices in the searched graph.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.distances.len()
    }

    /// Total weight of the best known path from the start to `id`, or -1
    /// if no path is known.
    #[must_use]
    pub fn distance_to(&self, id: usize) -> i32 {
        self.distances[id]
    }

    /// Whether the search has seen `id` at least once.
    #[must_use]
    pub fn discovered(&self, id: usize) -> bool {
        self.predecessors[id] >= 0 || id == self.start
    }

    /// Whether the distance to `id` is final (no shorter path exists).
    #[must_use]
    pub fn settled(&self, id: usize) -> bool {
        self.settled.contains(id)
    }

    /// Number of settled vertices in this snapshot.
    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.settled.count_ones(..)
    }

    /// The best known path from the start to `dst`, as a start-first
    /// sequence of vertex ids. If `dst` is settled the path is optimal.
    /// A given snapshot always returns the same path for the same
    /// destination.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotDiscovered`] if the search has not reached
    /// `dst` yet.
    pub fn path_to(&self, dst: usize) -> Result<Vec<usize>, GraphError> {
        if !self.discovered(dst) {
            return Err(GraphError::NotDiscovered(dst));
        }
        let mut path = Vec::new();
        let mut id = dst;
        loop {
            path.push(id);
            if id == self.start {
                break;
            }
            let pred = self.predecessors[id];
            debug_assert!(pred >= 0, "discovered vertex {id} has no predecessor");
            id = pred as usize;
        }
        path.reverse();
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A hand-built snapshot over 5 vertices: 0 -> 1 -> 3, with 2
    /// discovered but not settled and 4 untouched.
    fn sample() -> PathfindingSnapshot {
        let mut settled = FixedBitSet::with_capacity(5);
        settled.insert(0);
        settled.insert(1);
        settled.insert(3);
        PathfindingSnapshot::new(
            0,
            &[0, 4, 9, 7, -1],
            &[-1, 0, 1, 1, -1],
            &settled,
        )
    }

    #[test]
    fn start_is_discovered_without_predecessor() {
        let snap = sample();
        assert!(snap.discovered(0));
        assert_eq!(snap.distance_to(0), 0);
        assert_eq!(snap.path_to(0).unwrap(), vec![0]);
    }

    #[test]
    fn path_follows_predecessors_in_start_first_order() {
        let snap = sample();
        assert_eq!(snap.path_to(3).unwrap(), vec![0, 1, 3]);
        assert_eq!(snap.path_to(2).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn undiscovered_vertex_has_no_path() {
        let snap = sample();
        assert!(!snap.discovered(4));
        assert_eq!(snap.distance_to(4), -1);
        assert_eq!(snap.path_to(4), Err(GraphError::NotDiscovered(4)));
    }

    #[test]
    fn settled_and_discovered_are_distinct() {
        let snap = sample();
        assert!(snap.discovered(2), "frontier vertex is discovered");
        assert!(!snap.settled(2), "frontier vertex is not settled");
        assert_eq!(snap.settled_count(), 3);
    }

    #[test]
    fn snapshot_is_independent_of_its_inputs() {
        let mut distances = vec![0, 5];
        let mut predecessors = vec![-1, 0];
        let mut settled = FixedBitSet::with_capacity(2);
        settled.insert(0);
        let snap = PathfindingSnapshot::new(0, &distances, &predecessors, &settled);

        // Mutate the originals; the snapshot must not change.
        distances[1] = 99;
        predecessors[1] = -1;
        settled.insert(1);

        assert_eq!(snap.distance_to(1), 5);
        assert!(snap.discovered(1));
        assert!(!snap.settled(1));
    }

    #[test]
    fn same_destination_yields_same_path() {
        let snap = sample();
        assert_eq!(snap.path_to(3).unwrap(), snap.path_to(3).unwrap());
    }
}
