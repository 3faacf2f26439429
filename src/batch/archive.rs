//! Extract password-protected archives.
//!
//! The password is picked from a fixed table keyed by file-name prefix.

use std::path::{Path, PathBuf};

use super::BatchReport;
use crate::config::PasswordRule;
use crate::error::{IntakeError, Result};
use crate::fsops;
use crate::tools::ArchiveTool;

/// Password of the first rule whose prefix starts `file_name` (case-insensitive).
pub fn password_for<'a>(file_name: &str, rules: &'a [PasswordRule]) -> Option<&'a str> {
    let lower = file_name.to_lowercase();
    rules
        .iter()
        .find(|r| lower.starts_with(&r.prefix.to_lowercase()))
        .map(|r| r.password.as_str())
}

/// Archives at `input`: the file itself, or the matching files directly inside it.
fn archives_at(input: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(IntakeError::InvalidPath(input.display().to_string()));
    }
    let wanted: Vec<String> = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
    Ok(fsops::list_files(input)?
        .into_iter()
        .filter(|p| wanted.contains(&fsops::extension_of(p)))
        .collect())
}

/// Extract each archive at `input` into `output/<stem>`.
pub fn extract_archives<A: ArchiveTool + ?Sized>(
    input: &Path,
    output: &Path,
    tool: &A,
    extensions: &[String],
    passwords: &[PasswordRule],
    progress: &dyn Fn(usize, usize),
) -> Result<BatchReport> {
    let archives = archives_at(input, extensions)?;
    fsops::ensure_dir(output)?;

    let mut report = BatchReport::default();
    let total = archives.len();
    for (i, archive) in archives.iter().enumerate() {
        progress(i, total);
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let target = output.join(stem);
        let password = password_for(&name, passwords);

        let result = fsops::ensure_dir(&target).and_then(|()| tool.extract(archive, &target, password));
        match result {
            Ok(status) if status.success => {
                report.processed += 1;
                report.outputs.push(target.clone());
                tracing::info!(archive = %archive.display(), to = %target.display(), "Extracted");
            }
            Ok(status) => {
                report.failed += 1;
                tracing::error!(
                    archive = %archive.display(),
                    code = ?status.code,
                    stderr = %status.stderr,
                    "Extraction failed"
                );
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(archive = %archive.display(), error = %e, "Extraction failed");
            }
        }
    }
    progress(total, total);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<PasswordRule> {
        vec![
            PasswordRule {
                prefix: "HZZO_".to_string(),
                password: "first".to_string(),
            },
            PasswordRule {
                prefix: "hz".to_string(),
                password: "second".to_string(),
            },
        ]
    }

    #[test]
    fn test_password_first_match_wins() {
        assert_eq!(password_for("hzzo_2025_01.zip", &rules()), Some("first"));
        assert_eq!(password_for("HZ_other.7z", &rules()), Some("second"));
        assert_eq!(password_for("porezna.zip", &rules()), None);
    }
}
