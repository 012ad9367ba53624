//! Per-layer graph traversal.

use std::collections::HashSet;
use std::sync::Arc;

use super::graph::HnswIndex;
use super::node::{Node, NodeHandle};
use crate::queue::{HeapOrder, PriorityQueue, Scored};

impl HnswIndex {
    /// Greedy single-path descent at one layer.
    ///
    /// Moves to the closest strictly-improving neighbor until none exists.
    /// Terminates because the distance to `query` decreases on every move.
    pub(super) fn search_layer_closest(
        &self,
        query: &[f32],
        entry: Arc<Node>,
        layer: usize,
    ) -> Arc<Node> {
        let mut current = entry;
        let mut best = self.distance_to(query, &current);

        loop {
            let mut next = None;
            for handle in current.neighbors(layer) {
                let Some(candidate) = self.resolve(handle) else {
                    continue;
                };
                let d = self.distance_to(query, &candidate);
                if d < best {
                    best = d;
                    next = Some(candidate);
                }
            }
            match next {
                Some(node) => current = node,
                None => return current,
            }
        }
    }

    /// Bounded beam search at one layer.
    ///
    /// Returns up to `ef` nodes as a max-ordered queue (worst on top).
    pub(super) fn search_layer(
        &self,
        query: &[f32],
        entry: &Arc<Node>,
        ef: usize,
        layer: usize,
    ) -> PriorityQueue<Arc<Node>> {
        let mut visited: HashSet<NodeHandle> = HashSet::with_capacity(ef * 4);
        visited.insert(entry.handle);

        let entry_distance = self.distance_to(query, entry);
        let mut candidates = PriorityQueue::min();
        let mut results = PriorityQueue::with_capacity(HeapOrder::Max, ef + 1);
        candidates.push(Arc::clone(entry), entry_distance);
        results.push(Arc::clone(entry), entry_distance);

        while let Some(Scored {
            item: current,
            distance,
        }) = candidates.pop()
        {
            if distance > worst(&results) {
                break;
            }

            for handle in current.neighbors(layer) {
                if !visited.insert(handle) {
                    continue;
                }
                let Some(neighbor) = self.resolve(handle) else {
                    continue;
                };
                let d = self.distance_to(query, &neighbor);
                if d < worst(&results) || results.len() < ef {
                    candidates.push(Arc::clone(&neighbor), d);
                    results.push(neighbor, d);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results
    }
}

fn worst(results: &PriorityQueue<Arc<Node>>) -> f32 {
    results.peek().map_or(f32::MAX, |s| s.distance)
}

/// Closest live node in `found`, skipping `exclude`.
pub(super) fn closest(found: &PriorityQueue<Arc<Node>>, exclude: NodeHandle) -> Option<Arc<Node>> {
    found
        .iter()
        .filter(|s| s.item.handle != exclude && !s.item.is_removed())
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .map(|s| Arc::clone(&s.item))
}
