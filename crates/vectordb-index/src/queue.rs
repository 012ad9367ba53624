//! Binary heap of scored items with a switchable order.
//!
//! The same queue type serves as the min-ordered candidate frontier and as
//! the max-ordered "best `ef` so far" result set during graph search. At the
//! end of a search the result heap is flipped in place with
//! [`PriorityQueue::switch_order`] so it can be drained best-first.

use std::cmp::Ordering;

/// Which end of the distance range sits at the top of the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapOrder {
    /// Smallest distance on top
    Min,
    /// Largest distance on top
    Max,
}

impl HeapOrder {
    fn flipped(self) -> Self {
        match self {
            HeapOrder::Min => HeapOrder::Max,
            HeapOrder::Max => HeapOrder::Min,
        }
    }
}

/// An item paired with its distance to some query.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub item: T,
    pub distance: f32,
}

impl<T> Scored<T> {
    pub fn new(item: T, distance: f32) -> Self {
        Self { item, distance }
    }
}

/// Array-backed binary heap keyed on `Scored::distance`.
///
/// Distances compare with `f32::total_cmp`, so NaN sorts after every
/// finite value instead of corrupting the heap.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    order: HeapOrder,
    heap: Vec<Scored<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new(order: HeapOrder) -> Self {
        Self {
            order,
            heap: Vec::new(),
        }
    }

    pub fn with_capacity(order: HeapOrder, capacity: usize) -> Self {
        Self {
            order,
            heap: Vec::with_capacity(capacity),
        }
    }

    pub fn min() -> Self {
        Self::new(HeapOrder::Min)
    }

    pub fn max() -> Self {
        Self::new(HeapOrder::Max)
    }

    /// Build a heap from unordered items.
    pub fn from_vec(order: HeapOrder, items: Vec<Scored<T>>) -> Self {
        let mut queue = Self { order, heap: items };
        queue.heapify();
        queue
    }

    pub fn order(&self) -> HeapOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, item: T, distance: f32) {
        self.heap.push(Scored::new(item, distance));
        self.sift_up(self.heap.len() - 1);
    }

    pub fn pop(&mut self) -> Option<Scored<T>> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    pub fn peek(&self) -> Option<&Scored<T>> {
        self.heap.first()
    }

    /// Flip between min and max order, re-heapifying the storage in place.
    pub fn switch_order(&mut self) {
        self.order = self.order.flipped();
        self.heapify();
    }

    /// Items in heap (not sorted) order.
    pub fn iter(&self) -> std::slice::Iter<'_, Scored<T>> {
        self.heap.iter()
    }

    /// Consume the queue, returning items in heap (not sorted) order.
    pub fn into_vec(self) -> Vec<Scored<T>> {
        self.heap
    }

    /// Drain the queue top-first.
    pub fn into_sorted_vec(mut self) -> Vec<Scored<T>> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            out.push(item);
        }
        out
    }

    /// True when `a` belongs above `b` in this heap.
    #[inline]
    fn above(&self, a: usize, b: usize) -> bool {
        let ord = self.heap[a].distance.total_cmp(&self.heap[b].distance);
        match self.order {
            HeapOrder::Min => ord == Ordering::Less,
            HeapOrder::Max => ord == Ordering::Greater,
        }
    }

    fn heapify(&mut self) {
        for i in (0..self.heap.len() / 2).rev() {
            self.sift_down(i);
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.above(i, parent) {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut top = i;
            if left < n && self.above(left, top) {
                top = left;
            }
            if right < n && self.above(right, top) {
                top = right;
            }
            if top == i {
                break;
            }
            self.heap.swap(i, top);
            i = top;
        }
    }
}
