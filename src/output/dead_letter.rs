//! Dead-letter file for unrecoverable references
//!
//! Each run that dead-letters anything leaves a timestamped file behind so
//! an operator can inspect or re-seed the failures later. Nothing is written
//! for a clean run.

use crate::DiscographError;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the unrecoverable references to a timestamped file in `dir`,
/// creating the directory if needed. Returns the path written, or `None`
/// when there was nothing to record.
pub fn write_dead_letter_file(
    dir: &Path,
    unrecoverable: &[String],
) -> Result<Option<PathBuf>, DiscographError> {
    if unrecoverable.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir)?;

    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let path = dir.join(format!("unrecoverable-{}.txt", timestamp));

    let mut contents = String::with_capacity(unrecoverable.len() * 32);
    for reference in unrecoverable {
        contents.push_str(reference);
        contents.push('\n');
    }
    fs::write(&path, contents)?;

    tracing::info!(
        "Wrote {} unrecoverable references to {}",
        unrecoverable.len(),
        path.display()
    );
    Ok(Some(path))
}
