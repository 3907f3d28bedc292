//! Source discovery: find the static raster images a batch will process
//!
//! Discovery stands in front of the pipeline: the batch core only ever
//! sees paths that passed both the extension allowlist and magic-byte
//! sniffing, so a stray `.txt` renamed to `.jpg` never reaches a worker.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, ThumbError};
use crate::processing::formats::{is_supported_input_format, is_supported_mime_type};

/// Discover candidate source images under a directory.
///
/// Files must carry a supported extension *and* sniff to a supported
/// static-raster MIME type. Results are sorted so dispatch order is
/// deterministic across runs.
pub fn discover_sources(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ThumbError::config(format!(
            "source directory does not exist: {}",
            dir.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable entries are skipped, not fatal
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !is_supported_input_format(extension) {
            debug!("Skipping by extension: {:?}", path);
            continue;
        }

        // Confirm the content matches the extension's claim
        match infer::get_from_path(path) {
            Ok(Some(kind)) if is_supported_mime_type(kind.mime_type()) => {
                files.push(path.to_path_buf());
            }
            Ok(Some(kind)) => {
                debug!("Skipping by MIME ({}): {:?}", kind.mime_type(), path);
            }
            Ok(None) => {
                debug!("Skipping unidentifiable file: {:?}", path);
            }
            Err(e) => {
                warn!("Skipping unreadable file {:?}: {}", path, e);
            }
        }
    }

    files.sort();
    debug!("Discovered {} candidate images in {:?}", files.len(), dir);

    Ok(files)
}
