//! Fixed-size worker pool for batch operations.
//!
//! Each batch gets its own bounded task queue. Workers are scoped threads
//! that drain the queue and exit when it closes, so borrowed data (an
//! index, a collection) can be shared with them without `Arc`.

use crossbeam_channel::{bounded, unbounded};
use tracing::debug;

use crate::error::IndexError;
use crate::index::{Indexer, SearchResult};
use crate::params::SearchParams;

/// Tasks queued per worker before the producer blocks
const QUEUE_DEPTH_PER_WORKER: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool of `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every task and return the results in task order.
    ///
    /// Blocks until all tasks have finished. A panic in `f` propagates to
    /// the caller once the remaining workers have stopped.
    pub fn run<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);

        let (task_tx, task_rx) = bounded::<(usize, T)>(workers * QUEUE_DEPTH_PER_WORKER);
        let (result_tx, result_rx) = unbounded::<(usize, R)>();

        std::thread::scope(|s| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let f = &f;
                s.spawn(move || {
                    for (pos, task) in task_rx {
                        if result_tx.send((pos, f(task))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(result_tx);

            for job in tasks.into_iter().enumerate() {
                // every worker is gone; the scope will surface the panic
                if task_tx.send(job).is_err() {
                    break;
                }
            }
            drop(task_tx);
        });

        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        for (pos, result) in result_rx.try_iter() {
            slots[pos] = Some(result);
        }
        debug!(tasks = total, workers, "Batch complete");
        slots.into_iter().flatten().collect()
    }

    /// Insert many vectors concurrently. One result per item, in order.
    pub fn insert_all<I: Indexer + ?Sized>(
        &self,
        index: &I,
        items: Vec<(String, Vec<f32>)>,
    ) -> Vec<Result<(), IndexError>> {
        self.run(items, |(id, vector)| index.insert(&id, vector))
    }

    /// Run many searches concurrently. One result per query, in order.
    pub fn search_all<I: Indexer + ?Sized>(
        &self,
        index: &I,
        queries: Vec<Vec<f32>>,
        topk: usize,
        params: &SearchParams,
    ) -> Vec<Result<Vec<SearchResult>, IndexError>> {
        self.run(queries, |query| index.search(&query, topk, params))
    }
}
