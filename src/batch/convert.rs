//! Convert every image in a directory to a page-document.

use std::path::Path;

use super::BatchReport;
use crate::error::Result;
use crate::fsops::{self, RetryPolicy};
use crate::normalize::Normalizer;
use crate::tools::DocumentTools;

/// Convert the images directly inside `dir`. Sources are deleted on success
/// and kept on failure.
pub fn convert_images<T: DocumentTools + ?Sized>(
    dir: &Path,
    tools: &T,
    retry: RetryPolicy,
    image_extensions: &[String],
    progress: &dyn Fn(usize, usize),
) -> Result<BatchReport> {
    let normalizer = Normalizer::new(tools, retry, image_extensions);
    let images: Vec<_> = fsops::list_files(dir)?
        .into_iter()
        .filter(|p| normalizer.is_image(p))
        .collect();

    let mut report = BatchReport::default();
    let total = images.len();
    for (i, image) in images.iter().enumerate() {
        progress(i, total);
        match normalizer.convert(image) {
            Ok(document) => {
                report.processed += 1;
                report.outputs.push(document);
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(image = %image.display(), error = %e, "Conversion failed");
            }
        }
    }
    progress(total, total);

    Ok(report)
}
