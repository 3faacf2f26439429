//! Normalize file names in a directory to `[A-Za-z0-9._-]`.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fsops;
use crate::naming::sanitize_filename;

/// Sanitized name for `path`, with a lower-cased extension.
pub fn normalized_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let ext = fsops::extension_of(path);
    let stem = sanitize_filename(&stem);
    Some(if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{}", sanitize_filename(&ext))
    })
}

/// Rename every file in `dir` whose name is not already normalized.
///
/// Returns `(old, new)` pairs. Collisions get a `_NN` suffix; failures are
/// logged and the file is left alone.
pub fn normalize_names(dir: &Path, progress: &dyn Fn(usize, usize)) -> Result<Vec<(PathBuf, PathBuf)>> {
    let files = fsops::list_files(dir)?;
    let total = files.len();
    let mut renamed = Vec::new();

    for (i, file) in files.into_iter().enumerate() {
        progress(i, total);
        let Some(name) = normalized_name(&file) else {
            continue;
        };
        if file.file_name().and_then(|n| n.to_str()) == Some(name.as_str()) {
            continue;
        }

        let result = fsops::unique_path(&dir.join(&name))
            .and_then(|target| fsops::rename(&file, &target).map(|()| target));
        match result {
            Ok(target) => {
                tracing::info!(from = %file.display(), to = %target.display(), "Renamed");
                renamed.push((file, target));
            }
            Err(e) => tracing::error!(file = %file.display(), error = %e, "Rename failed"),
        }
    }
    progress(total, total);

    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_name() {
        assert_eq!(
            normalized_name(Path::new("Zahtjev za uvid (1).PDF")).unwrap(),
            "Zahtjev_za_uvid__1_.pdf"
        );
        assert_eq!(normalized_name(Path::new("README")).unwrap(), "README");
    }
}
