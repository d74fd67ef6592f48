use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::utils::has_valid_extension;

/// Expand command-line inputs into an ordered frame list
///
/// Files keep the position they were given in. A directory contributes its
/// direct children with a matching extension, sorted by file name.
pub fn expand_frames(inputs: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();

    for input in inputs {
        if input.is_dir() {
            frames.extend(frames_in_dir(input, extensions)?);
        } else {
            frames.push(input.clone());
        }
    }

    Ok(frames)
}

fn frames_in_dir(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry
            .with_context(|| format!("Failed to read directory entry in {}", dir.display()))?;
        let path = entry.path();

        if path.is_file() && has_valid_extension(path, extensions) {
            found.push(path.to_path_buf());
        }
    }

    Ok(found)
}
