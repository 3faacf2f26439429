//! Attachment acceptance: embedded-item heuristics and extension allow-list.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::AttachmentsConfig;
use crate::error::Result;
use crate::fsops;
use crate::model::attachment::{Attachment, AttachmentKind};
use crate::naming::sanitize_filename;

/// Names mail clients give to pasted or signature images.
static EMBEDDED_IMAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:clip_)?image\d+\.[a-z0-9]+$").expect("valid regex")
});

/// Why an attachment was not saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Inline part of the HTML body.
    Embedded,
    /// Named like a pasted or signature image.
    EmbeddedName,
    /// Extension not in the allow-list.
    Extension(String),
    /// Destination already holds a file of that name.
    Duplicate(PathBuf),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Embedded => write!(f, "embedded item"),
            SkipReason::EmbeddedName => write!(f, "embedded image name"),
            SkipReason::Extension(ext) => write!(f, "extension '{ext}' not allowed"),
            SkipReason::Duplicate(path) => write!(f, "already exists: {}", path.display()),
        }
    }
}

/// Outcome of [`AttachmentFilter::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Save under this sanitized file name.
    Accept(String),
    Skip(SkipReason),
}

/// Accept/reject rules for one run.
#[derive(Debug, Clone)]
pub struct AttachmentFilter {
    allowed: Vec<String>,
    skip_existing: bool,
}

impl AttachmentFilter {
    pub fn new(allowed: &[String], skip_existing: bool) -> Self {
        Self {
            allowed: allowed.iter().map(|e| normalize_ext(e)).collect(),
            skip_existing,
        }
    }

    pub fn from_config(config: &AttachmentsConfig) -> Self {
        Self::new(&config.allowed_extensions, config.skip_existing)
    }

    /// Classify an attachment by its metadata alone.
    pub fn classify(&self, attachment: &Attachment) -> Decision {
        if attachment.kind == AttachmentKind::Embedded {
            return Decision::Skip(SkipReason::Embedded);
        }
        let name = attachment.filename.trim();
        if EMBEDDED_IMAGE_NAME.is_match(name) {
            return Decision::Skip(SkipReason::EmbeddedName);
        }
        let ext = attachment.extension().unwrap_or_default();
        if !self.allowed.contains(&ext) {
            return Decision::Skip(SkipReason::Extension(ext));
        }
        Decision::Accept(sanitize_filename(name))
    }

    /// Where an accepted attachment is saved.
    ///
    /// `None` when the file already exists and duplicates are skipped;
    /// otherwise a collision-free path in `dir`.
    pub fn save_path(&self, dir: &Path, sanitized: &str) -> Result<Option<PathBuf>> {
        let path = dir.join(sanitized);
        if path.exists() && self.skip_existing {
            return Ok(None);
        }
        fsops::unique_path(&path).map(Some)
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, kind: AttachmentKind) -> Attachment {
        Attachment {
            index: 0,
            filename: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            kind,
            size: 10,
        }
    }

    fn filter(skip_existing: bool) -> AttachmentFilter {
        AttachmentFilter::new(
            &["pdf".to_string(), ".JPG".to_string(), "png".to_string()],
            skip_existing,
        )
    }

    #[test]
    fn test_accepts_allowed_extension() {
        let d = filter(true).classify(&attachment("Račun 1.PDF", AttachmentKind::Regular));
        assert_eq!(d, Decision::Accept("Ra_un_1.PDF".to_string()));
    }

    #[test]
    fn test_skips_embedded_kind() {
        let d = filter(true).classify(&attachment("scan.pdf", AttachmentKind::Embedded));
        assert_eq!(d, Decision::Skip(SkipReason::Embedded));
    }

    #[test]
    fn test_skips_embedded_names() {
        for name in ["image001.png", "IMAGE12.JPG", "clip_image002.jpg"] {
            let d = filter(true).classify(&attachment(name, AttachmentKind::Regular));
            assert_eq!(d, Decision::Skip(SkipReason::EmbeddedName), "{name}");
        }
        let d = filter(true).classify(&attachment("image_of_scan.png", AttachmentKind::Regular));
        assert!(matches!(d, Decision::Accept(_)));
    }

    #[test]
    fn test_skips_disallowed_extension() {
        let d = filter(true).classify(&attachment("macro.docm", AttachmentKind::Regular));
        assert_eq!(d, Decision::Skip(SkipReason::Extension("docm".to_string())));
        let d = filter(true).classify(&attachment("noext", AttachmentKind::Regular));
        assert_eq!(d, Decision::Skip(SkipReason::Extension(String::new())));
    }

    #[test]
    fn test_duplicate_policy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scan.pdf"), b"x").unwrap();

        let skipped = filter(true).save_path(dir.path(), "scan.pdf").unwrap();
        assert_eq!(skipped, None);

        let renamed = filter(false).save_path(dir.path(), "scan.pdf").unwrap();
        assert_eq!(renamed, Some(dir.path().join("scan_01.pdf")));

        let fresh = filter(true).save_path(dir.path(), "other.pdf").unwrap();
        assert_eq!(fresh, Some(dir.path().join("other.pdf")));
    }
}
