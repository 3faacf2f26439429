//! Attachment metadata.
//!
//! The payload is never held here. It is written to disk on demand through
//! [`MailStore::save_attachment`](crate::mailstore::MailStore::save_attachment).

/// How the mail store classified an attachment part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttachmentKind {
    /// A regular file attachment.
    Regular,
    /// An inline item embedded in the HTML body (signatures, logos, pasted images).
    Embedded,
}

/// Metadata about an email attachment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Position among the message's attachment parts (0-based).
    pub index: usize,

    /// Filename of the attachment. Generated if missing from the headers.
    pub filename: String,

    /// MIME content type (e.g. `"image/jpeg"`, `"application/pdf"`).
    pub content_type: String,

    /// Regular or embedded.
    pub kind: AttachmentKind,

    /// Decoded size in bytes.
    pub size: u64,
}

impl Attachment {
    /// Lower-cased extension of the filename, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}
