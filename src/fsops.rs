//! Filesystem helpers: deletion that tolerates lingering file locks, and
//! collision-free naming in a flat destination directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{IntakeError, Result};

/// Highest two-digit collision suffix tried before giving up.
pub const MAX_COLLISION_SUFFIX: u32 = 99;

/// Bounded, fixed-delay retry policy for deletions.
///
/// External tools (the splitter in particular) may release their handle on a
/// file some time after they exit. There is no backoff growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(200),
        }
    }
}

/// Delete `path`, retrying while the OS refuses.
///
/// Returns `true` once the file is gone (a path that does not exist counts as
/// deleted). After all attempts fail the condition is logged and `false` is
/// returned; the caller decides whether to continue.
pub fn remove_with_retry(path: &Path, policy: &RetryPolicy) -> bool {
    remove_with_retry_using(path, policy, |p| std::fs::remove_file(p))
}

/// [`remove_with_retry`] with an injectable remove operation.
pub fn remove_with_retry_using<F>(path: &Path, policy: &RetryPolicy, mut remove: F) -> bool
where
    F: FnMut(&Path) -> std::io::Result<()>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match remove(path) {
            Ok(()) => {
                if attempt > 1 {
                    tracing::debug!(path = %path.display(), attempt, "Deleted after retry");
                }
                return true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "Delete failed"
                );
                last_error = Some(e);
                if attempt < attempts {
                    std::thread::sleep(policy.delay);
                }
            }
        }
    }

    tracing::error!(
        path = %path.display(),
        attempts,
        error = %last_error.map(|e| e.to_string()).unwrap_or_default(),
        "Could not delete file, leaving it in place"
    );
    false
}

/// Rename `from` to `to`, wrapping the error with the source path.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|e| IntakeError::io(from, e))
}

/// If `path` already exists, append a counter to make it unique.
///
/// Tries `{stem}_01.{ext}` … `{stem}_99.{ext}`.
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    free_name(parent, path, |i| with_ext(&format!("{stem}_{i:02}"), ext))
}

/// First free name among `{stem}.{ext}`, `{stem}_01.{ext}` … `{stem}_99.{ext}`.
///
/// Fails with [`IntakeError::NamingConflict`] when all of them exist.
pub fn numbered_path(dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    let base = dir.join(with_ext(stem, ext));
    if !base.exists() {
        return Ok(base);
    }
    free_name(dir, &base, |i| with_ext(&format!("{stem}_{i:02}"), ext))
}

fn free_name(dir: &Path, original: &Path, name: impl Fn(u32) -> String) -> Result<PathBuf> {
    (1..=MAX_COLLISION_SUFFIX)
        .map(|i| dir.join(name(i)))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| IntakeError::NamingConflict(original.to_path_buf()))
}

fn with_ext(stem: &str, ext: &str) -> String {
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{ext}")
    }
}

/// Create the destination directory, mapping failure to a setup error.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| IntakeError::DestinationUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Lower-cased extension of a path, without the dot.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| IntakeError::io(dir, e))? {
        let entry = entry.map_err(|e| IntakeError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
