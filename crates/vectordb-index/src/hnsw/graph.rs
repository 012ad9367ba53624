//! HNSW structural state and the public operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::node::{Node, NodeHandle};
use super::search::closest;
use crate::distance::Distance;
use crate::error::IndexError;
use crate::index::{IndexStats, Indexer, SearchResult};
use crate::params::{HnswParams, SearchParams, DEFAULT_EF};
use crate::queue::{HeapOrder, PriorityQueue};

/// State guarded by the global lock.
pub(super) struct GraphState {
    /// Live nodes in insertion order
    pub(super) nodes: Vec<Arc<Node>>,
    /// External id -> position in `nodes`
    pub(super) slots: HashMap<String, usize>,
    pub(super) entrypoint: Option<Arc<Node>>,
    pub(super) max_level: usize,
}

/// Hierarchical navigable small world graph.
///
/// # Locking
///
/// `state` is held only while a node is appended, removed or promoted to
/// entrypoint, never across a traversal. Each node's adjacency lists sit
/// behind that node's own lock. The only place two node locks are held at
/// once is edge creation, which takes them lower handle first.
///
/// Traversals resolve handles through `arena` rather than `state`, so
/// searches run alongside inserts and deletes. A handle whose node has
/// been deleted no longer resolves and is skipped.
///
/// # Accepted approximations
///
/// - Delete repairs only the neighborhood its beam search finds, so graph
///   connectivity can degrade after many deletes.
/// - Update is delete followed by insert; a concurrent search can miss the
///   id in between. The re-insert ignores `max_size`.
/// - Search filters removed nodes after its beam, so it can come back short
///   of `topk` while deletes are in flight.
/// - Shrink rewrites one side of an edge only.
pub struct HnswIndex {
    pub(super) distance: Distance,
    /// Neighbors selected per layer
    pub(super) m: usize,
    /// Degree cap above layer 0
    pub(super) m_max: usize,
    /// Degree cap at layer 0
    pub(super) m_max0: usize,
    pub(super) ef_construction: usize,
    /// Level normalization, 1/ln(m)
    ml: f64,
    pub(super) heuristic: bool,
    pub(super) extend: bool,
    max_size: usize,
    pub(super) state: RwLock<GraphState>,
    pub(super) arena: DashMap<NodeHandle, Arc<Node>>,
    next_handle: AtomicU64,
    rng: Mutex<StdRng>,
}

impl HnswIndex {
    pub fn new(distance: Distance, params: &HnswParams) -> Result<Self, IndexError> {
        Self::with_seed(distance, params, rand::random())
    }

    /// Build an index whose level assignment is reproducible.
    pub fn with_seed(distance: Distance, params: &HnswParams, seed: u64) -> Result<Self, IndexError> {
        params.validate()?;
        let m = params.m_max;
        Ok(Self {
            distance,
            m,
            m_max: m,
            m_max0: 2 * m,
            ef_construction: params.ef_construction,
            ml: 1.0 / (m as f64).ln(),
            heuristic: params.heuristic,
            extend: params.extend,
            max_size: params.max_size,
            state: RwLock::new(GraphState {
                nodes: Vec::new(),
                slots: HashMap::new(),
                entrypoint: None,
                max_level: 0,
            }),
            arena: DashMap::new(),
            next_handle: AtomicU64::new(1),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Current top layer and entrypoint id, if any.
    pub fn entrypoint(&self) -> Option<(String, usize)> {
        let state = self.state.read();
        state
            .entrypoint
            .as_ref()
            .map(|ep| (ep.id.clone(), state.max_level))
    }

    /// `floor(-ln(U) * ml)` with `U` uniform in (0, 1].
    fn random_level(&self) -> usize {
        let r: f64 = self.rng.lock().random();
        let u = 1.0 - r;
        (-u.ln() * self.ml).floor() as usize
    }

    pub(super) fn resolve(&self, handle: NodeHandle) -> Option<Arc<Node>> {
        self.arena.get(&handle).map(|entry| Arc::clone(entry.value()))
    }

    /// Distance from `query` to `node`; removed nodes are infinitely far.
    #[inline]
    pub(super) fn distance_to(&self, query: &[f32], node: &Node) -> f32 {
        if node.is_removed() {
            f32::MAX
        } else {
            self.distance.compute(query, &node.vector)
        }
    }

    pub(super) fn layer_cap(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m_max
        }
    }

    /// A live entry point other than `node`, read under the write lock.
    ///
    /// Returns `None` when no other live node exists, after making `node`
    /// the entrypoint.
    fn fresh_entry(&self, node: &Arc<Node>) -> Option<(Arc<Node>, usize)> {
        let mut state = self.state.write();
        let live = |n: &&Arc<Node>| !n.is_removed() && n.handle != node.handle;
        if let Some(ep) = state.entrypoint.as_ref().filter(live) {
            return Some((Arc::clone(ep), state.max_level));
        }
        if let Some(other) = state.nodes.iter().filter(live).max_by_key(|n| n.level) {
            return Some((Arc::clone(other), other.level));
        }
        if !node.is_removed() {
            state.entrypoint = Some(Arc::clone(node));
            state.max_level = node.level;
        }
        None
    }

    /// Greedy descent from `entry` to `layer`, starting over from a fresh
    /// entry point whenever the node it stands on has been deleted.
    fn descend(
        &self,
        node: &Arc<Node>,
        mut entry: Arc<Node>,
        mut top: usize,
        layer: usize,
    ) -> Option<(Arc<Node>, usize)> {
        'restart: loop {
            if entry.is_removed() {
                (entry, top) = self.fresh_entry(node)?;
            }
            let mut ep = Arc::clone(&entry);
            for l in (layer + 1..=top).rev() {
                ep = self.search_layer_closest(&node.vector, ep, l);
                if ep.is_removed() {
                    entry = ep;
                    continue 'restart;
                }
            }
            return Some((ep, top));
        }
    }

    /// Connect `node` into every layer from `min(level, top)` down to 0.
    fn link_layers(&self, node: &Arc<Node>, entry: Arc<Node>, top: usize) {
        let Some((mut ep, mut top)) = self.descend(node, entry, top, node.level) else {
            debug!(id = %node.id, "Entrypoint vanished, node took its place");
            return;
        };

        let mut layer = node.level.min(top);
        loop {
            if ep.is_removed() {
                let Some((fresh, fresh_top)) = self.descend(node, ep, top, layer) else {
                    return;
                };
                ep = fresh;
                top = fresh_top;
                layer = layer.min(top);
            }

            let found = self.search_layer(&node.vector, &ep, self.ef_construction, layer);
            let next = closest(&found, node.handle);
            let selected = self.select_neighbors(&node.vector, node.handle, found, self.m, layer);

            let cap = self.layer_cap(layer);
            for neighbor in selected.into_vec() {
                let neighbor = neighbor.item;
                if neighbor.is_removed() {
                    continue;
                }
                Node::link(node, &neighbor, layer);
                if neighbor.degree(layer) > cap {
                    self.shrink(&neighbor, cap, layer);
                }
            }

            if let Some(next) = next {
                ep = next;
            }
            if layer == 0 {
                break;
            }
            layer -= 1;
        }
    }

    /// Detach `node` from the neighborhoods around it, top layer first.
    fn unlink_layers(&self, node: &Arc<Node>, entry: Arc<Node>, top: usize) {
        let mut ep = entry;
        for layer in (node.level + 1..=top).rev() {
            ep = self.search_layer_closest(&node.vector, ep, layer);
        }

        for layer in (0..=node.level).rev() {
            let found = self.search_layer(&node.vector, &ep, self.ef_construction, layer);
            let next = closest(&found, node.handle);

            for scored in found.iter() {
                if scored.item.handle != node.handle {
                    scored.item.remove_neighbor(layer, node.handle);
                }
            }
            for handle in node.neighbors(layer) {
                if let Some(neighbor) = self.resolve(handle) {
                    neighbor.remove_neighbor(layer, node.handle);
                }
            }
            node.clear_layer(layer);

            if let Some(next) = next {
                ep = next;
            }
        }
    }

    /// Append `id` to the node table and return it with the entry point and
    /// top layer to link from, or `None` when it became the first node.
    ///
    /// Update skips the capacity check: the slot it re-fills is the one its
    /// own delete freed, even if another insert has taken that slot since.
    fn reserve(
        &self,
        id: &str,
        vector: Vec<f32>,
        check_capacity: bool,
    ) -> Result<Option<(Arc<Node>, Arc<Node>, usize)>, IndexError> {
        let mut state = self.state.write();
        if check_capacity && state.nodes.len() >= self.max_size {
            return Err(IndexError::IndexFull {
                max_size: self.max_size,
            });
        }
        if state.slots.contains_key(id) {
            return Err(IndexError::DuplicateId(id.to_string()));
        }

        let handle = NodeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let level = match state.entrypoint {
            Some(_) => self.random_level(),
            None => 0,
        };
        let node = Arc::new(Node::new(handle, id.to_string(), vector, level));

        let slot = state.nodes.len();
        state.nodes.push(Arc::clone(&node));
        state.slots.insert(id.to_string(), slot);
        self.arena.insert(handle, Arc::clone(&node));

        match state.entrypoint.as_ref().map(Arc::clone) {
            Some(entry) => Ok(Some((node, entry, state.max_level))),
            None => {
                state.entrypoint = Some(node);
                state.max_level = 0;
                Ok(None)
            }
        }
    }

    fn insert_inner(
        &self,
        id: &str,
        vector: Vec<f32>,
        check_capacity: bool,
    ) -> Result<(), IndexError> {
        let Some((node, entry, top)) = self.reserve(id, vector, check_capacity)? else {
            debug!(id = %id, "Inserted first node");
            return Ok(());
        };
        self.attach(&node, entry, top);
        debug!(id = %id, level = node.level, "Inserted node");
        Ok(())
    }

    /// Link a reserved node, then promote it if it rose above the top layer.
    fn attach(&self, node: &Arc<Node>, entry: Arc<Node>, top: usize) {
        self.link_layers(node, entry, top);

        // promote only after the node's own edges exist; a re-election
        // during linking can lower max_level below `top`
        if node.level > self.state.read().max_level {
            let mut state = self.state.write();
            if node.level > state.max_level && !node.is_removed() {
                state.max_level = node.level;
                state.entrypoint = Some(Arc::clone(node));
            }
        }
    }
}

impl Indexer for HnswIndex {
    fn insert(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        self.insert_inner(id, vector, true)
    }

    fn delete(&self, id: &str) -> Result<(), IndexError> {
        let (node, entry, top) = {
            let state = self.state.read();
            let slot = *state
                .slots
                .get(id)
                .ok_or_else(|| IndexError::NotFound(id.to_string()))?;
            let node = Arc::clone(&state.nodes[slot]);
            let entry = state
                .entrypoint
                .as_ref()
                .map_or_else(|| Arc::clone(&node), Arc::clone);
            (node, entry, state.max_level)
        };

        self.unlink_layers(&node, entry, top);
        node.mark_removed();

        let mut state = self.state.write();
        if let Some(slot) = state.slots.get(id).copied() {
            if state.nodes[slot].handle == node.handle {
                state.slots.remove(id);
                state.nodes.remove(slot);
                let GraphState { nodes, slots, .. } = &mut *state;
                for (pos, shifted) in nodes.iter().enumerate().skip(slot) {
                    if let Some(p) = slots.get_mut(&shifted.id) {
                        *p = pos;
                    }
                }
            }
        }
        self.arena.remove(&node.handle);

        let was_entry = state
            .entrypoint
            .as_ref()
            .is_some_and(|ep| ep.handle == node.handle);
        if was_entry {
            let next = state.nodes.iter().max_by_key(|n| n.level).map(Arc::clone);
            state.max_level = next.as_ref().map_or(0, |n| n.level);
            state.entrypoint = next;
        }

        debug!(id = %id, level = node.level, reelected = was_entry, "Deleted node");
        Ok(())
    }

    fn update(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        if !self.contains(id) {
            return Err(IndexError::NotFound(id.to_string()));
        }
        self.delete(id)?;
        self.insert_inner(id, vector, false)
    }

    /// Beam search with width `ef`, returning at most `topk` live hits.
    ///
    /// Removed nodes are dropped after the beam completes, so a search
    /// racing deletes can return fewer than `topk` hits even when enough
    /// live nodes exist.
    fn search(
        &self,
        query: &[f32],
        topk: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let ef = params.effective_ef(DEFAULT_EF)?;
        if topk == 0 {
            return Ok(Vec::new());
        }

        let (entry, top) = {
            let state = self.state.read();
            match state.entrypoint.as_ref() {
                Some(ep) => (Arc::clone(ep), state.max_level),
                None => return Ok(Vec::new()),
            }
        };

        let mut ep = entry;
        for layer in (1..=top).rev() {
            ep = self.search_layer_closest(query, ep, layer);
        }

        let live = self
            .search_layer(query, &ep, ef, 0)
            .into_vec()
            .into_iter()
            .filter(|s| !s.item.is_removed())
            .collect();
        let mut results = PriorityQueue::from_vec(HeapOrder::Max, live);
        while results.len() > topk {
            results.pop();
        }
        results.switch_order();

        Ok(results
            .into_sorted_vec()
            .into_iter()
            .map(|s| SearchResult::new(s.item.id.clone(), s.distance))
            .collect())
    }

    fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    fn contains(&self, id: &str) -> bool {
        self.state.read().slots.contains_key(id)
    }

    fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            index_type: "hnsw".to_string(),
            vector_count: state.nodes.len(),
            max_size: self.max_size,
            max_level: Some(state.max_level),
        }
    }
}
