//! Progress aggregation for batch runs

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::{debug, info};

/// Snapshot of aggregated batch progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    /// Items currently being processed. Never exceeds the pool's
    /// concurrency limit.
    pub active: usize,
    /// Items that reached a terminal state, either outcome. Monotonically
    /// non-decreasing within a run and never above `total`.
    pub completed: usize,
    /// Items in the run
    pub total: usize,
    /// Accumulated percentage, 0-100
    pub percent: f64,
}

impl ProgressState {
    fn new() -> Self {
        Self {
            active: 0,
            completed: 0,
            total: 0,
            percent: 0.0,
        }
    }
}

/// Progress update event published to observers
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started { total: usize },
    ItemStarted { file_name: String },
    ItemFinished { file_name: String, success: bool },
    BatchCompleted { completed: usize, total: usize },
}

/// Thread-safe progress aggregator owned by a pipeline for one run at a
/// time.
///
/// Mutation is serialized under a single mutex with short critical
/// sections (no I/O under lock). Reads are non-blocking with respect to
/// workers: a snapshot may trail the newest completion, which is fine for
/// a progress display.
pub struct ProgressAggregator {
    state: Mutex<ProgressState>,
    sender: broadcast::Sender<ProgressUpdate>,
}

impl ProgressAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);

        Self {
            state: Mutex::new(ProgressState::new()),
            sender,
        }
    }

    /// Reset all counters to zero.
    ///
    /// Called by the pipeline before each run so an aggregator shared
    /// across runs never carries stale state.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        *state = ProgressState::new();
    }

    /// Begin tracking a batch of `total` items
    pub fn start(&self, total: usize) {
        {
            let mut state = self.state.lock().unwrap();
            *state = ProgressState::new();
            state.total = total;
        }

        let _ = self.sender.send(ProgressUpdate::Started { total });

        info!("Started progress tracking for {} items", total);
    }

    /// Record that a worker claimed an item
    pub fn item_started(&self, file_name: &str) {
        {
            let mut state = self.state.lock().unwrap();
            state.active += 1;
        }

        let _ = self.sender.send(ProgressUpdate::ItemStarted {
            file_name: file_name.to_string(),
        });
    }

    /// Record that an item reached a terminal state
    pub fn item_finished(&self, file_name: &str, success: bool) {
        {
            let mut state = self.state.lock().unwrap();
            state.active = state.active.saturating_sub(1);
            state.completed = (state.completed + 1).min(state.total);
        }

        let _ = self.sender.send(ProgressUpdate::ItemFinished {
            file_name: file_name.to_string(),
            success,
        });

        debug!("Item finished: {} (success: {})", file_name, success);
    }

    /// Advance the accumulated percentage.
    ///
    /// The pool advances by `100/total` per completed item; the sum
    /// converges to 100 modulo float drift, which `finish` squares away.
    pub fn advance(&self, amount: f64) {
        let mut state = self.state.lock().unwrap();
        state.percent = (state.percent + amount).min(100.0);
    }

    /// Current accumulated percentage (0-100)
    pub fn snapshot(&self) -> f64 {
        self.state.lock().unwrap().percent
    }

    /// Current counter snapshot
    pub fn state(&self) -> ProgressState {
        *self.state.lock().unwrap()
    }

    /// Force the percentage to exactly 100 and notify observers.
    ///
    /// Called once by the pipeline after every item is terminal, so the
    /// final reading never exposes floating-point drift.
    pub fn finish(&self) {
        let (completed, total) = {
            let mut state = self.state.lock().unwrap();
            state.percent = 100.0;
            (state.completed, state.total)
        };

        let _ = self
            .sender
            .send(ProgressUpdate::BatchCompleted { completed, total });
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}
