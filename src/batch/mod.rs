//! Directory-level operator jobs that run outside the mail pipeline.

pub mod archive;
pub mod convert;
pub mod copy;
pub mod rename;
pub mod split;

use std::path::PathBuf;

use serde::Serialize;

/// Outcome of a directory job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Inputs handled successfully.
    pub processed: usize,
    /// Inputs left alone because there was nothing to do.
    pub skipped: usize,
    /// Inputs that failed; the job continued.
    pub failed: usize,
    /// Files produced.
    pub outputs: Vec<PathBuf>,
}
