use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod commands;

/// Resolve the scan root to an absolute path for display.
///
/// Canonicalizes when the path exists; otherwise joins it onto the current
/// directory so the "does not exist" error still names a full path.
pub fn resolve_scan_root(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    match candidate.canonicalize() {
        Ok(p) => Ok(strip_verbatim_prefix(p)),
        Err(_) if candidate.is_absolute() => Ok(candidate.to_path_buf()),
        Err(_) => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            Ok(cwd.join(candidate))
        }
    }
}

/// Drop the `\\?\` prefix Windows adds on canonicalization so output matches
/// what users typed.
fn strip_verbatim_prefix(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_prefix(r"\\?\") {
        Some(rest) => PathBuf::from(rest),
        None => path,
    }
}

/// Build the `tracing` filter directive for a `-v` count.
pub fn log_filter_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
