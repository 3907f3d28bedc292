//! Batch work items and their lifecycle state

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

/// Lifecycle state of one batch item.
///
/// `Solved` and `Failed` are terminal: once reached, no further
/// transition occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    Pending,
    Processing,
    Solved,
    Failed,
}

impl ItemState {
    /// Whether this state is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Solved | Self::Failed)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Processing,
            2 => Self::Solved,
            _ => Self::Failed,
        }
    }
}

/// One unit of batch work: a source image and its lifecycle state.
///
/// The state lives in an atomic cell so observers on other threads can
/// read transitions without locking. Items are shared as `Arc<ImageItem>`;
/// the pool is the only writer (single-claim dispatch), observers only
/// read.
#[derive(Debug)]
pub struct ImageItem {
    source_path: PathBuf,
    state: AtomicU8,
}

impl ImageItem {
    /// Create a new pending item for a source path
    pub fn new<P: Into<PathBuf>>(source_path: P) -> Arc<Self> {
        Arc::new(Self {
            source_path: source_path.into(),
            state: AtomicU8::new(ItemState::Pending as u8),
        })
    }

    /// The source image path
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Current lifecycle state
    pub fn state(&self) -> ItemState {
        ItemState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Source filename, for display
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Claim the item for processing (`Pending` -> `Processing`).
    ///
    /// Returns false if the item was already claimed; the pool dispatches
    /// each item exactly once, so a failed claim indicates a caller reused
    /// items across runs.
    pub fn claim(&self) -> bool {
        self.transition(ItemState::Pending, ItemState::Processing)
    }

    /// Mark a claimed item solved (`Processing` -> `Solved`)
    pub fn mark_solved(&self) -> bool {
        self.transition(ItemState::Processing, ItemState::Solved)
    }

    /// Mark a claimed item failed (`Processing` -> `Failed`)
    pub fn mark_failed(&self) -> bool {
        self.transition(ItemState::Processing, ItemState::Failed)
    }

    /// Fail an unclaimed item directly (`Pending` -> `Failed`).
    ///
    /// Used for items abandoned by cancellation before dispatch, so every
    /// item still reaches exactly one terminal state.
    pub fn mark_failed_undispatched(&self) -> bool {
        self.transition(ItemState::Pending, ItemState::Failed)
    }

    fn transition(&self, from: ItemState, to: ItemState) -> bool {
        let swapped = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if !swapped {
            debug!(
                "Ignored state transition {:?} -> {:?} for {:?} (current: {:?})",
                from,
                to,
                self.source_path,
                self.state()
            );
        }

        swapped
    }
}

/// A per-item failure surfaced in the run result
#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    pub source_path: PathBuf,
    pub message: String,
}

impl ItemError {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(source_path: P, message: S) -> Self {
        Self {
            source_path: source_path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_starts_pending() {
        let item = ImageItem::new("photos/cat.jpg");
        assert_eq!(item.state(), ItemState::Pending);
        assert_eq!(item.file_name(), "cat.jpg");
    }

    #[test]
    fn test_successful_lifecycle() {
        let item = ImageItem::new("a.png");
        assert!(item.claim());
        assert_eq!(item.state(), ItemState::Processing);
        assert!(item.mark_solved());
        assert_eq!(item.state(), ItemState::Solved);
    }

    #[test]
    fn test_failed_lifecycle() {
        let item = ImageItem::new("a.png");
        assert!(item.claim());
        assert!(item.mark_failed());
        assert_eq!(item.state(), ItemState::Failed);
    }

    #[test]
    fn test_single_claim() {
        let item = ImageItem::new("a.png");
        assert!(item.claim());
        assert!(!item.claim());
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let item = ImageItem::new("a.png");
        item.claim();
        item.mark_solved();

        // No transition out of a terminal state, in either direction
        assert!(!item.mark_failed());
        assert!(!item.claim());
        assert_eq!(item.state(), ItemState::Solved);
    }

    #[test]
    fn test_undispatched_failure_skips_processing() {
        let item = ImageItem::new("a.png");
        assert!(item.mark_failed_undispatched());
        assert_eq!(item.state(), ItemState::Failed);

        // Already terminal, cannot be claimed afterwards
        assert!(!item.claim());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!ItemState::Pending.is_terminal());
        assert!(!ItemState::Processing.is_terminal());
        assert!(ItemState::Solved.is_terminal());
        assert!(ItemState::Failed.is_terminal());
    }
}
