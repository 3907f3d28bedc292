//! Batch orchestration: validation, dispatch, and the run summary

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tokio::fs;
use tracing::info;

use crate::batch::{CancelToken, ImageItem, ItemError, ProgressAggregator, WorkerPool};
use crate::config::RunConfig;
use crate::error::{Result, ThumbError};
use crate::processing::ThumbnailEngine;

/// Aggregate result of one batch run
#[derive(Debug, Serialize)]
pub struct RunResult {
    /// Items that produced a thumbnail
    pub succeeded: usize,
    /// Per-item failures with their source paths
    pub failed: Vec<ItemError>,
    /// Wall-clock duration of the run
    #[serde(rename = "elapsed_seconds", serialize_with = "duration_as_secs")]
    pub elapsed: Duration,
}

fn duration_as_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Build batch items from discovered source paths
pub fn items_from_paths<I, P>(paths: I) -> Vec<Arc<ImageItem>>
where
    I: IntoIterator<Item = P>,
    P: Into<std::path::PathBuf>,
{
    paths.into_iter().map(ImageItem::new).collect()
}

/// Orchestrates one batch of thumbnail work.
///
/// A pipeline owns its progress aggregator and processes one run at a
/// time; concurrent `run` calls on the same instance are serialized in
/// call order, and the aggregator is reset at the start of each run.
pub struct ThumbnailPipeline {
    config: RunConfig,
    engine: Arc<ThumbnailEngine>,
    progress: Arc<ProgressAggregator>,
    run_guard: tokio::sync::Mutex<()>,
}

impl ThumbnailPipeline {
    /// Create a pipeline for a run configuration
    pub fn new(config: RunConfig) -> Self {
        let engine = Arc::new(ThumbnailEngine::with_quality(config.quality));

        Self {
            config,
            engine,
            progress: Arc::new(ProgressAggregator::new()),
            run_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// The pipeline's progress aggregator, for observers
    pub fn progress(&self) -> Arc<ProgressAggregator> {
        Arc::clone(&self.progress)
    }

    /// The run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process every item to a terminal state and return the summary.
    ///
    /// Fails fast with a configuration error — before touching the
    /// filesystem — if the config is invalid or two items would collide on
    /// the same destination filename.
    pub async fn run(
        &self,
        items: &[Arc<ImageItem>],
        cancel: &CancelToken,
    ) -> Result<RunResult> {
        let _guard = self.run_guard.lock().await;

        self.config.validate()?;
        self.check_destination_collisions(items)?;

        // A fresh gauge for this run; a reused pipeline never shows stale
        // numbers from the previous batch
        self.progress.reset();
        self.progress.start(items.len());

        let start_time = Instant::now();
        info!(
            "Starting thumbnail run: {} items, max width {}, concurrency {}",
            items.len(),
            self.config.max_width,
            self.config.concurrency
        );

        fs::create_dir_all(&self.config.dest_dir)
            .await
            .map_err(|e| {
                ThumbError::resource(format!(
                    "cannot create destination directory {}: {}",
                    self.config.dest_dir.display(),
                    e
                ))
            })?;

        let pool = WorkerPool::new(self.config.concurrency)?;

        let engine = Arc::clone(&self.engine);
        let dest_dir = self.config.dest_dir.clone();
        let max_width = self.config.max_width;

        let outcome = pool
            .run(items, self.progress(), cancel, move |item| {
                let engine = Arc::clone(&engine);
                let dest_dir = dest_dir.clone();
                async move {
                    let file_name = item.source_path().file_name().ok_or_else(|| {
                        ThumbError::decode(
                            "source path has no file name",
                            item.source_path().to_path_buf(),
                        )
                    })?;
                    let dest = dest_dir.join(file_name);

                    engine
                        .process_file(item.source_path(), &dest, max_width)
                        .await
                        .map(|_| ())
                }
            })
            .await?;

        // Every item is terminal; pin the gauge to exactly 100
        self.progress.finish();

        let elapsed = start_time.elapsed();
        info!(
            "Run complete: {} succeeded, {} failed in {:.2}s",
            outcome.completed,
            outcome.errors.len(),
            elapsed.as_secs_f64()
        );

        Ok(RunResult {
            succeeded: outcome.completed,
            failed: outcome.errors,
            elapsed,
        })
    }

    /// Reject batches where two sources map to the same destination file.
    ///
    /// Comparison is case-insensitive so the outcome does not depend on
    /// the destination filesystem.
    fn check_destination_collisions(&self, items: &[Arc<ImageItem>]) -> Result<()> {
        let mut seen: HashMap<String, &Arc<ImageItem>> = HashMap::with_capacity(items.len());

        for item in items {
            let file_name = item
                .source_path()
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_lowercase)
                .ok_or_else(|| {
                    ThumbError::config(format!(
                        "source path has no usable file name: {}",
                        item.source_path().display()
                    ))
                })?;

            if let Some(previous) = seen.insert(file_name, item) {
                return Err(ThumbError::config(format!(
                    "destination filename collision: {} and {} both write to the same thumbnail",
                    previous.source_path().display(),
                    item.source_path().display()
                )));
            }
        }

        Ok(())
    }
}
