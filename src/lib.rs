//! ThumbMill - Bounded-Concurrency Batch Thumbnail Generator
//!
//! Converts a directory of static raster images into width-bounded
//! thumbnails with a fixed number of concurrent workers, per-item
//! lifecycle tracking, and aggregated progress reporting.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use thumbmill::{items_from_paths, CancelToken, RunConfig, ThumbnailPipeline};
//!
//! # async fn example() -> thumbmill::Result<()> {
//! let config = RunConfig {
//!     source_dir: "photos".into(),
//!     dest_dir: "thumbs".into(),
//!     max_width: 320,
//!     ..Default::default()
//! };
//!
//! let sources = thumbmill::discover_sources(&config.source_dir, config.recursive)?;
//! let items = items_from_paths(sources);
//!
//! let pipeline = ThumbnailPipeline::new(config);
//! let result = pipeline.run(&items, &CancelToken::new()).await?;
//!
//! println!("{} thumbnails, {} failures", result.succeeded, result.failed.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod discover;
pub mod error;
pub mod pipeline;
pub mod processing;

// Re-export commonly used types
pub use batch::{
    CancelToken, ImageItem, ItemError, ItemState, ProgressAggregator, ProgressState,
    ProgressUpdate, WorkerPool,
};
pub use config::{default_concurrency, Config, LoggingConfig, RunConfig};
pub use discover::discover_sources;
pub use error::{Result, ThumbError};
pub use pipeline::{items_from_paths, RunResult, ThumbnailPipeline};
pub use processing::{ThumbFormat, ThumbnailEngine, ThumbnailReport};

use tracing::{info, warn};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the ThumbMill library with default settings
///
/// This sets up logging and validates system requirements. Should be
/// called once at program start.
pub fn init() -> Result<()> {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish(),
    )
    .is_ok()
    {
        info!("ThumbMill v{} initialized", VERSION);
    }

    validate_system_requirements();

    Ok(())
}

/// Initialize with custom configuration
pub fn init_with_config(config: &Config) -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(&config.logging.level)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!("ThumbMill v{} initialized with custom config", VERSION);
    }

    validate_system_requirements();

    Ok(())
}

fn validate_system_requirements() {
    use sysinfo::{System, SystemExt};

    let mut system = System::new_all();
    system.refresh_all();

    // Check available memory
    let available_memory = system.available_memory();
    const MIN_MEMORY_MB: u64 = 256;

    if available_memory < MIN_MEMORY_MB * 1024 * 1024 {
        warn!(
            "Low available memory: {}MB (recommended: >{}MB)",
            available_memory / (1024 * 1024),
            MIN_MEMORY_MB
        );
    }

    let cpu_count = system.physical_core_count().unwrap_or(1);
    info!("Detected {} CPU cores", cpu_count);
}
