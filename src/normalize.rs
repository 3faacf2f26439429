//! Turn a saved attachment into final, prefixed page-documents.
//!
//! Saved → (Converted) → PageCounted → Split | Renamed, with every
//! intermediate artifact removed through [`crate::fsops::remove_with_retry`] when a stage
//! fails. A failed split is the exception: the prefixed original is the only
//! complete copy of the document, so it is left in place.

use std::path::{Path, PathBuf};

use crate::error::{IntakeError, Result};
use crate::fsops::{self, remove_with_retry_using, RetryPolicy};
use crate::tools::DocumentTools;

/// Extension of page-documents.
pub const DOCUMENT_EXT: &str = "pdf";

/// Suffix given to a single-page document.
pub const SINGLE_PAGE_SUFFIX: &str = "_0001";

/// Page-index placeholder handed to the splitter.
pub const PAGE_TEMPLATE: &str = "_%04d";

/// Deletion primitive used for every file the normalizer removes.
pub type RemoveFn = fn(&Path) -> std::io::Result<()>;

/// Drives the external tools for one destination directory.
pub struct Normalizer<'a, T: DocumentTools + ?Sized> {
    tools: &'a T,
    retry: RetryPolicy,
    image_extensions: Vec<String>,
    remove: RemoveFn,
}

impl<'a, T: DocumentTools + ?Sized> Normalizer<'a, T> {
    pub fn new(tools: &'a T, retry: RetryPolicy, image_extensions: &[String]) -> Self {
        Self {
            tools,
            retry,
            image_extensions: image_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            remove: |p| std::fs::remove_file(p),
        }
    }

    /// Use `remove` for every deletion instead of [`std::fs::remove_file`].
    pub fn with_remover(mut self, remove: RemoveFn) -> Self {
        self.remove = remove;
        self
    }

    fn delete(&self, path: &Path) -> bool {
        remove_with_retry_using(path, &self.retry, self.remove)
    }

    pub fn is_image(&self, path: &Path) -> bool {
        self.image_extensions.contains(&fsops::extension_of(path))
    }

    /// Normalize `saved` into its final file(s), named with `prefix`.
    ///
    /// On failure every artifact of this attachment is deleted, except after a
    /// failed split (see module docs).
    pub fn normalize(&self, saved: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();
        match self.run(saved, prefix, &mut artifacts) {
            Ok(outputs) => Ok(outputs),
            Err(e @ IntakeError::SplitFailed(_)) => Err(e),
            Err(e) => {
                tracing::warn!(path = %saved.display(), error = %e, "Cleaning up after failure");
                self.delete(saved);
                for artifact in &artifacts {
                    self.delete(artifact);
                }
                Err(e)
            }
        }
    }

    fn run(&self, saved: &Path, prefix: &str, artifacts: &mut Vec<PathBuf>) -> Result<Vec<PathBuf>> {
        let document = if self.is_image(saved) {
            let converted = self.convert(saved)?;
            artifacts.push(converted.clone());
            converted
        } else if fsops::extension_of(saved) == DOCUMENT_EXT {
            saved.to_path_buf()
        } else {
            return self.rename_other(saved, prefix).map(|p| vec![p]);
        };

        match self.page_count(&document) {
            1 => self.rename_single_page(&document, prefix).map(|p| vec![p]),
            _ => self.split(&document, prefix, artifacts),
        }
    }

    /// Convert an image to a page-document next to it.
    ///
    /// The image is deleted on success. On failure any partial output is
    /// removed and the image is left for the caller.
    pub fn convert(&self, image: &Path) -> Result<PathBuf> {
        let output = fsops::unique_path(&image.with_extension(DOCUMENT_EXT))?;

        let converted = match self.tools.convert_image(image, &output) {
            Ok(status) if status.success && output.exists() => true,
            Ok(status) => {
                tracing::warn!(
                    image = %image.display(),
                    code = ?status.code,
                    stderr = %status.stderr,
                    "Converter failed"
                );
                false
            }
            Err(e) => {
                tracing::warn!(image = %image.display(), error = %e, "Converter failed");
                false
            }
        };

        if !converted {
            self.delete(&output);
            return Err(IntakeError::ConversionFailed(image.to_path_buf()));
        }

        tracing::info!(image = %image.display(), document = %output.display(), "Converted image");
        self.delete(image);
        Ok(output)
    }

    /// Page count, defaulting to 1 when the query fails or reports zero pages.
    pub fn page_count(&self, document: &Path) -> usize {
        match self.tools.page_count(document) {
            Ok(0) => {
                tracing::warn!(path = %document.display(), "Page count reported 0, treating as 1");
                1
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    path = %document.display(),
                    error = %e,
                    "Page count failed, treating as single page"
                );
                1
            }
        }
    }

    /// Rename a single-page document to `{prefix}{base}_0001[_NN].pdf`.
    pub fn rename_single_page(&self, document: &Path, prefix: &str) -> Result<PathBuf> {
        let dir = parent_of(document);
        let stem = format!("{prefix}{}{SINGLE_PAGE_SUFFIX}", stem_of(document));
        let target = fsops::numbered_path(dir, &stem, DOCUMENT_EXT)?;
        fsops::rename(document, &target)?;
        tracing::info!(path = %target.display(), "Saved single-page document");
        Ok(target)
    }

    /// Rename a non-document attachment to `{prefix}{name}[_NN].{ext}`.
    fn rename_other(&self, file: &Path, prefix: &str) -> Result<PathBuf> {
        let dir = parent_of(file);
        let stem = format!("{prefix}{}", stem_of(file));
        let target = fsops::numbered_path(dir, &stem, &fsops::extension_of(file))?;
        fsops::rename(file, &target)?;
        tracing::info!(path = %target.display(), "Saved attachment");
        Ok(target)
    }

    /// Split a multi-page document into `{prefix}{base}[_NN]_NNNN.pdf` files.
    ///
    /// The document is first renamed to `{prefix}{base}[_NN].pdf`, choosing the
    /// first `_NN` for which no page file exists yet, so pages never replace
    /// earlier output. The renamed document is deleted once the split is
    /// confirmed by pages that were not there before the splitter ran.
    pub fn split(&self, document: &Path, prefix: &str, artifacts: &mut Vec<PathBuf>) -> Result<Vec<PathBuf>> {
        let dir = parent_of(document);
        let base = split_base(dir, &format!("{prefix}{}", stem_of(document)), document)?;

        let renamed = dir.join(format!("{base}.{DOCUMENT_EXT}"));
        if renamed != document {
            fsops::rename(document, &renamed)?;
            artifacts.push(renamed.clone());
        }

        let template = dir.join(format!("{base}{PAGE_TEMPLATE}.{DOCUMENT_EXT}"));
        let existing = split_outputs(dir, &base, &renamed)?;

        let status = self.tools.split_pages(&renamed, &template);
        let pages: Vec<PathBuf> = split_outputs(dir, &base, &renamed)?
            .into_iter()
            .filter(|p| !existing.contains(p))
            .collect();

        let confirmed = match &status {
            Ok(s) if s.success => true,
            Ok(s) if !pages.is_empty() => {
                tracing::warn!(
                    path = %renamed.display(),
                    code = ?s.code,
                    stderr = %s.stderr,
                    pages = pages.len(),
                    "Splitter reported failure but produced pages, accepting"
                );
                true
            }
            _ => false,
        };

        if !confirmed {
            match status {
                Ok(s) => tracing::error!(
                    path = %renamed.display(),
                    code = ?s.code,
                    stderr = %s.stderr,
                    "Splitting failed, leaving files in place"
                ),
                Err(e) => tracing::error!(
                    path = %renamed.display(),
                    error = %e,
                    "Splitting failed, leaving files in place"
                ),
            }
            return Err(IntakeError::SplitFailed(renamed));
        }

        if !self.delete(&renamed) {
            tracing::error!(path = %renamed.display(), "Split original could not be removed");
        }
        tracing::info!(path = %renamed.display(), pages = pages.len(), "Split document");
        Ok(pages)
    }
}

/// First of `stem`, `stem_01` … `stem_99` with no page files in `dir` and no
/// other file at `{candidate}.pdf`.
fn split_base(dir: &Path, stem: &str, document: &Path) -> Result<String> {
    let suffixed = (1..=fsops::MAX_COLLISION_SUFFIX).map(|i| format!("{stem}_{i:02}"));
    for candidate in std::iter::once(stem.to_string()).chain(suffixed) {
        let whole = dir.join(format!("{candidate}.{DOCUMENT_EXT}"));
        if whole.exists() && whole != document {
            continue;
        }
        if split_outputs(dir, &candidate, document)?.is_empty() {
            return Ok(candidate);
        }
    }
    Err(IntakeError::NamingConflict(
        dir.join(format!("{stem}{PAGE_TEMPLATE}.{DOCUMENT_EXT}")),
    ))
}

/// Files in `dir` named `{base}_NNNN.pdf`, excluding `original`, sorted.
pub fn split_outputs(dir: &Path, base: &str, original: &Path) -> Result<Vec<PathBuf>> {
    let original_name = original.file_name();
    let mut pages: Vec<PathBuf> = fsops::list_files(dir)?
        .into_iter()
        .filter(|p| p.file_name() != original_name)
        .filter(|p| is_page_file(p, base))
        .collect();
    pages.sort();
    Ok(pages)
}

fn is_page_file(path: &Path, base: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(rest) = name.strip_prefix(base).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    match rest.split_once('.') {
        Some((digits, ext)) => {
            digits.len() == 4
                && digits.bytes().all(|b| b.is_ascii_digit())
                && ext.eq_ignore_ascii_case(DOCUMENT_EXT)
        }
        None => false,
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
