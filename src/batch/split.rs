//! Split every multi-page PDF in a directory into one file per page.

use std::path::Path;

use super::BatchReport;
use crate::error::Result;
use crate::fsops::{self, RetryPolicy};
use crate::normalize::{Normalizer, DOCUMENT_EXT};
use crate::tools::DocumentTools;

/// Split the PDFs directly inside `dir` that have more than one page.
///
/// Pages are written as `{stem}_NNNN.pdf`; the original is deleted once the
/// split is confirmed. Single-page documents are skipped.
pub fn split_documents<T: DocumentTools + ?Sized>(
    dir: &Path,
    tools: &T,
    retry: RetryPolicy,
    progress: &dyn Fn(usize, usize),
) -> Result<BatchReport> {
    let normalizer = Normalizer::new(tools, retry, &[]);
    let documents: Vec<_> = fsops::list_files(dir)?
        .into_iter()
        .filter(|p| fsops::extension_of(p) == DOCUMENT_EXT)
        .collect();

    let mut report = BatchReport::default();
    let total = documents.len();
    for (i, document) in documents.iter().enumerate() {
        progress(i, total);
        if normalizer.page_count(document) < 2 {
            report.skipped += 1;
            continue;
        }
        match normalizer.split(document, "", &mut Vec::new()) {
            Ok(pages) => {
                report.processed += 1;
                report.outputs.extend(pages);
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(path = %document.display(), error = %e, "Split failed");
            }
        }
    }
    progress(total, total);

    Ok(report)
}
