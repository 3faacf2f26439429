//! Copy files from one share to another.

use std::path::Path;

use serde::Serialize;

use crate::error::{IntakeError, Result};
use crate::fsops;

/// Counters for one copy run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes: u64,
}

/// Copy the files directly inside `source` into `destination`.
///
/// Only files whose extension is in `extensions` are copied (all files if
/// empty). A destination file of the same size is kept unless `overwrite`.
pub fn copy_files(
    source: &Path,
    destination: &Path,
    extensions: &[String],
    overwrite: bool,
    progress: &dyn Fn(usize, usize),
) -> Result<CopyReport> {
    if !source.is_dir() {
        return Err(IntakeError::InvalidPath(format!(
            "source is not a directory: {}",
            source.display()
        )));
    }
    fsops::ensure_dir(destination)?;

    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let files: Vec<_> = fsops::list_files(source)?
        .into_iter()
        .filter(|p| wanted.is_empty() || wanted.contains(&fsops::extension_of(p)))
        .collect();

    let mut report = CopyReport::default();
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        progress(i, total);
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = destination.join(name);

        if !overwrite && same_size(file, &target) {
            report.skipped += 1;
            tracing::debug!(file = %file.display(), "Already present, skipping");
            continue;
        }

        match std::fs::copy(file, &target) {
            Ok(bytes) => {
                report.copied += 1;
                report.bytes += bytes;
                tracing::info!(from = %file.display(), to = %target.display(), bytes, "Copied");
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(file = %file.display(), error = %e, "Copy failed");
            }
        }
    }
    progress(total, total);

    Ok(report)
}

fn same_size(a: &Path, b: &Path) -> bool {
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.len() == mb.len(),
        _ => false,
    }
}
