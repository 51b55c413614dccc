//! JSON snapshot output.
//!
//! The snapshot is rewritten wholesale on every run: there is no merging
//! with the previous file and no deduplication against earlier runs.
//! Non-ASCII text is written verbatim and the document is pretty-printed
//! with two-space indentation.

use crate::models::IngestResult;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `result` to `path`, creating the parent directory if needed.
///
/// # Arguments
///
/// * `result` - The sorted snapshot document
/// * `path` - Target file; an existing file is replaced wholesale
///
/// # Returns
///
/// The path that was written.
///
/// # Errors
///
/// Serialization or I/O failures, including an unwritable output directory.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn write_snapshot(
    result: &IngestResult,
    path: impl AsRef<Path>,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(result)?;

    if let Err(e) = ensure_writable_dir(path).await {
        error!(error = %e, "Snapshot directory is not writable");
        return Err(e);
    }

    fs::write(path, json).await?;
    info!(total = result.total, "Wrote snapshot");
    Ok(path.to_path_buf())
}
