//! Neighbor selection and degree pruning.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use super::graph::HnswIndex;
use super::node::{Node, NodeHandle};
use crate::queue::{HeapOrder, PriorityQueue, Scored};

/// Backfill pruned candidates when the diversity pass admits fewer than `m`.
const KEEP_PRUNED_CONNECTIONS: bool = true;

impl HnswIndex {
    /// Reduce `candidates` to at most `m` neighbors for a node at `query`.
    ///
    /// `origin` is the node being connected; it is never selected as its
    /// own neighbor. Returns a max-ordered queue.
    pub(super) fn select_neighbors(
        &self,
        query: &[f32],
        origin: NodeHandle,
        candidates: PriorityQueue<Arc<Node>>,
        m: usize,
        layer: usize,
    ) -> PriorityQueue<Arc<Node>> {
        let candidates: Vec<Scored<Arc<Node>>> = candidates
            .into_vec()
            .into_iter()
            .filter(|s| s.item.handle != origin)
            .collect();

        if self.heuristic {
            self.select_diverse(query, origin, candidates, m, layer, KEEP_PRUNED_CONNECTIONS)
        } else {
            select_closest(candidates, m)
        }
    }

    /// Relative-neighborhood selection.
    ///
    /// A candidate is admitted only if it is closer to the query than to
    /// every neighbor admitted so far.
    fn select_diverse(
        &self,
        query: &[f32],
        origin: NodeHandle,
        candidates: Vec<Scored<Arc<Node>>>,
        m: usize,
        layer: usize,
        keep_pruned: bool,
    ) -> PriorityQueue<Arc<Node>> {
        // with backfill on, a short list comes back whole either way
        if !self.extend && keep_pruned && candidates.len() <= m {
            return PriorityQueue::from_vec(HeapOrder::Max, candidates);
        }

        let mut seen: HashSet<NodeHandle> = HashSet::with_capacity(candidates.len() * 2);
        seen.insert(origin);
        let mut working = PriorityQueue::with_capacity(HeapOrder::Min, candidates.len());
        for c in candidates {
            if seen.insert(c.item.handle) {
                working.push(c.item, c.distance);
            }
        }

        if self.extend {
            let base: Vec<Arc<Node>> = working.iter().map(|s| Arc::clone(&s.item)).collect();
            for candidate in base {
                for handle in candidate.neighbors(layer) {
                    if !seen.insert(handle) {
                        continue;
                    }
                    if let Some(neighbor) = self.resolve(handle) {
                        if !neighbor.is_removed() {
                            let d = self.distance.compute(query, &neighbor.vector);
                            working.push(neighbor, d);
                        }
                    }
                }
            }
        }

        let mut selected: Vec<Scored<Arc<Node>>> = Vec::with_capacity(m);
        let mut discarded = PriorityQueue::min();
        while selected.len() < m {
            let Some(candidate) = working.pop() else {
                break;
            };
            let diverse = selected.iter().all(|s| {
                candidate.distance < self.distance.compute(&candidate.item.vector, &s.item.vector)
            });
            if diverse {
                selected.push(candidate);
            } else {
                discarded.push(candidate.item, candidate.distance);
            }
        }

        if keep_pruned {
            while selected.len() < m {
                match discarded.pop() {
                    Some(pruned) => selected.push(pruned),
                    None => break,
                }
            }
        }

        PriorityQueue::from_vec(HeapOrder::Max, selected)
    }

    /// Cut `node`'s adjacency list at `layer` back down to `cap`.
    ///
    /// Only `node`'s own list changes. Neighbors that lose the edge keep
    /// their side of it until they are shrunk themselves. Edges added by
    /// other threads while the selection runs are preserved.
    pub(super) fn shrink(&self, node: &Arc<Node>, cap: usize, layer: usize) {
        if node.is_removed() {
            return;
        }
        let snapshot = node.neighbors(layer);
        if snapshot.len() <= cap {
            return;
        }

        let mut candidates = PriorityQueue::with_capacity(HeapOrder::Max, snapshot.len());
        for &handle in &snapshot {
            if let Some(neighbor) = self.resolve(handle) {
                if !neighbor.is_removed() {
                    let d = self.distance.compute(&node.vector, &neighbor.vector);
                    candidates.push(neighbor, d);
                }
            }
        }

        let selected: Vec<NodeHandle> = self
            .select_neighbors(&node.vector, node.handle, candidates, cap, layer)
            .into_vec()
            .into_iter()
            .map(|s| s.item.handle)
            .collect();

        trace!(
            node = node.handle.as_u64(),
            layer,
            before = snapshot.len(),
            after = selected.len(),
            "Shrunk neighbor list"
        );
        node.replace_neighbors(layer, &snapshot, selected);
    }
}

/// Keep the `m` closest candidates.
fn select_closest(candidates: Vec<Scored<Arc<Node>>>, m: usize) -> PriorityQueue<Arc<Node>> {
    let mut result = PriorityQueue::from_vec(HeapOrder::Max, candidates);
    while result.len() > m {
        result.pop();
    }
    result
}
