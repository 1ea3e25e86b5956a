//! Directory scanner: finds candidate module files under a root.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{AnalysisError, SpyResult};
use crate::model::Module;

/// Enumerate candidate modules under `root`, sorted by path.
///
/// Only the top level is searched unless `recurse` is set. Symlinks are not
/// followed. Unreadable entries are skipped with a warning.
pub fn discover_modules(root: &Path, recurse: bool, config: &ScanConfig) -> SpyResult<Vec<Module>> {
    if !root.is_dir() {
        return Err(AnalysisError::PathNotFound(root.to_path_buf()));
    }

    let max_depth = if recurse { usize::MAX } else { 1 };
    let mut modules = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !config.matches_extension(entry.path()) {
            continue;
        }
        modules.push(Module::from_path(entry.into_path()));
    }

    if modules.is_empty() {
        return Err(AnalysisError::NoModulesFound(root.to_path_buf()));
    }

    modules.sort();
    debug!(root = %root.display(), count = modules.len(), "Discovered candidate modules");
    Ok(modules)
}
