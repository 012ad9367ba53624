//! Graph node and its adjacency lists.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

/// Stable identity of a node inside one index.
///
/// Handles are allocated from a monotonically increasing counter and never
/// reused, so a stale handle left in some adjacency list simply fails to
/// resolve once its node has been deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) u64);

impl NodeHandle {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// One indexed vector.
///
/// Everything except the adjacency lists and the removed flag is fixed at
/// construction. The adjacency lists sit behind the node's own lock; no
/// other state is guarded by it.
#[derive(Debug)]
pub struct Node {
    pub(crate) handle: NodeHandle,
    pub(crate) id: String,
    pub(crate) vector: Vec<f32>,
    pub(crate) level: usize,
    removed: AtomicBool,
    links: RwLock<Vec<Vec<NodeHandle>>>,
}

impl Node {
    pub(crate) fn new(handle: NodeHandle, id: String, vector: Vec<f32>, level: usize) -> Self {
        Self {
            handle,
            id,
            vector,
            level,
            removed: AtomicBool::new(false),
            links: RwLock::new(vec![Vec::new(); level + 1]),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Whether delete has poisoned this node.
    ///
    /// A removed node scores as maximally distant from every query.
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// Copy of the neighbor list at `layer`, taken under the read lock.
    pub(crate) fn neighbors(&self, layer: usize) -> Vec<NodeHandle> {
        self.links
            .read()
            .get(layer)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn degree(&self, layer: usize) -> usize {
        self.links.read().get(layer).map_or(0, Vec::len)
    }

    pub(crate) fn remove_neighbor(&self, layer: usize, handle: NodeHandle) {
        if let Some(list) = self.links.write().get_mut(layer) {
            list.retain(|h| *h != handle);
        }
    }

    pub(crate) fn clear_layer(&self, layer: usize) {
        if let Some(list) = self.links.write().get_mut(layer) {
            list.clear();
        }
    }

    /// Replace the list at `layer` with `selected`, keeping any handle that
    /// was added after `snapshot` was taken.
    pub(crate) fn replace_neighbors(
        &self,
        layer: usize,
        snapshot: &[NodeHandle],
        selected: Vec<NodeHandle>,
    ) {
        let mut links = self.links.write();
        let Some(list) = links.get_mut(layer) else {
            return;
        };
        let late: Vec<NodeHandle> = list
            .iter()
            .copied()
            .filter(|h| !snapshot.contains(h) && !selected.contains(h))
            .collect();
        *list = selected;
        list.extend(late);
    }

    /// Add an undirected edge between `a` and `b` at `layer`.
    ///
    /// Both adjacency locks are held together, always taken lower handle
    /// first. Duplicate edges are not added.
    pub(crate) fn link(a: &Node, b: &Node, layer: usize) {
        if a.handle == b.handle {
            return;
        }
        let (first, second) = if a.handle < b.handle { (a, b) } else { (b, a) };
        let mut first_links = first.links.write();
        let mut second_links = second.links.write();

        if let Some(list) = first_links.get_mut(layer) {
            if !list.contains(&second.handle) {
                list.push(second.handle);
            }
        }
        if let Some(list) = second_links.get_mut(layer) {
            if !list.contains(&first.handle) {
                list.push(first.handle);
            }
        }
    }
}
