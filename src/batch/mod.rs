//! Bounded-concurrency batch execution

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::{Result, ThumbError};

pub mod item;
pub mod progress;

pub use item::{ImageItem, ItemError, ItemState};
pub use progress::{ProgressAggregator, ProgressState, ProgressUpdate};

/// Cooperative cancellation flag for a batch run.
///
/// Checked at each dispatch point: items not yet admitted when the token
/// fires are failed without being started, while in-flight items finish
/// undisturbed. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of remaining un-started work
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Outcome of a pool run
#[derive(Debug)]
pub struct PoolOutcome {
    /// Items that completed successfully
    pub completed: usize,
    /// Per-item failures, in dispatch order
    pub errors: Vec<ItemError>,
}

/// Executes a batch of items with a bounded number of concurrent workers.
///
/// Admission is backpressured: a semaphore permit is acquired *before* a
/// worker task is spawned, so dispatch order follows input order and at
/// most `limit` invocations of the work function are in flight at any
/// instant. The permit moves into the task and is released only after the
/// work returns, success or error.
pub struct WorkerPool {
    limit: usize,
}

impl WorkerPool {
    /// Create a pool with the given concurrency limit (must be >= 1)
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(ThumbError::config("concurrency limit must be at least 1"));
        }
        Ok(Self { limit })
    }

    /// The pool's concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run every item through `work`, returning once all items are
    /// terminal.
    ///
    /// Each item is dispatched exactly once and mutated exactly twice:
    /// `Pending -> Processing` at dispatch, `Processing -> Solved/Failed`
    /// after the work resolves. A failing item never aborts the batch; its
    /// error is collected and the pool moves on. The aggregator is
    /// advanced by `100/len(items)` as each item reaches a terminal state.
    pub async fn run<F, Fut>(
        &self,
        items: &[Arc<ImageItem>],
        progress: Arc<ProgressAggregator>,
        cancel: &CancelToken,
        work: F,
    ) -> Result<PoolOutcome>
    where
        F: Fn(Arc<ImageItem>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            debug!("Empty batch, nothing to dispatch");
            return Ok(PoolOutcome {
                completed: 0,
                errors: Vec::new(),
            });
        }

        info!(
            "Dispatching {} items with {} concurrent workers",
            total, self.limit
        );

        let step = 100.0 / total as f64;
        let semaphore = Arc::new(Semaphore::new(self.limit));

        let mut errors = Vec::new();
        let mut dispatched = Vec::with_capacity(total);
        let mut tasks = Vec::with_capacity(total);

        for item in items {
            // Dispatch point: the token is checked on both sides of the
            // permit wait so an item is never started after cancellation
            let permit = if cancel.is_cancelled() {
                None
            } else {
                // Backpressure: block here until a worker slot frees
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| ThumbError::resource(format!("worker slot unavailable: {}", e)))?;
                if cancel.is_cancelled() {
                    None
                } else {
                    Some(permit)
                }
            };

            let Some(permit) = permit else {
                if item.mark_failed_undispatched() {
                    progress.item_finished(&item.file_name(), false);
                    progress.advance(step);
                    errors.push(ItemError::new(
                        item.source_path(),
                        ThumbError::cancelled(item.source_path().to_path_buf()).user_message(),
                    ));
                }
                continue;
            };

            item.claim();
            progress.item_started(&item.file_name());

            let work = work.clone();
            let item = Arc::clone(item);
            let progress = Arc::clone(&progress);

            dispatched.push(Arc::clone(&item));
            tasks.push(tokio::spawn(async move {
                // Slot releases when the permit drops, strictly after work
                let _permit = permit;

                let result = work(Arc::clone(&item)).await;
                let file_name = item.file_name();

                let error = match result {
                    Ok(()) => {
                        item.mark_solved();
                        None
                    }
                    Err(e) => {
                        item.mark_failed();
                        debug!("Item failed: {:?}: {}", item.source_path(), e);
                        Some(ItemError::new(item.source_path(), e.user_message()))
                    }
                };

                progress.item_finished(&file_name, error.is_none());
                progress.advance(step);

                error
            }));
        }

        // Wait for every in-flight item to reach a terminal state
        let joined = futures::future::join_all(tasks).await;

        for (item, task_result) in dispatched.iter().zip(joined) {
            match task_result {
                Ok(Some(error)) => errors.push(error),
                Ok(None) => {}
                Err(e) => {
                    // A worker panicked mid-item; the item never reported,
                    // so settle its state and progress here
                    if item.mark_failed() {
                        progress.item_finished(&item.file_name(), false);
                        progress.advance(step);
                    }
                    errors.push(ItemError::new(
                        item.source_path(),
                        format!("worker task failed: {}", e),
                    ));
                }
            }
        }

        let completed = total - errors.len();
        info!("Batch drained: {} completed, {} failed", completed, errors.len());

        Ok(PoolOutcome { completed, errors })
    }
}
