//! Centralized error types for docintake.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the docintake library.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configured mailbox folder does not exist or is not a Maildir.
    #[error("Mailbox folder not found: {0}")]
    MailboxNotFound(PathBuf),

    /// The destination directory could not be created.
    #[error("Destination directory unavailable '{path}': {source}")]
    DestinationUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored message could not be parsed.
    #[error("Cannot parse message '{path}': {reason}")]
    MessageParse { path: PathBuf, reason: String },

    /// The requested attachment is not present in the message.
    #[error("Attachment '{name}' not found in message '{message}'")]
    AttachmentNotFound { message: String, name: String },

    /// An external tool could not be started.
    #[error("Cannot run '{program}': {source}")]
    ToolLaunch {
        program: String,
        source: std::io::Error,
    },

    /// An external tool produced output we could not interpret.
    #[error("Unexpected output from '{program}': {reason}")]
    ToolOutput { program: String, reason: String },

    /// Image-to-document conversion failed.
    #[error("Conversion failed for '{0}'")]
    ConversionFailed(PathBuf),

    /// Page splitting failed and produced no usable output.
    #[error("Splitting failed for '{0}'")]
    SplitFailed(PathBuf),

    /// No free file name could be found within the collision limit.
    #[error("Naming conflict: no free name for '{0}'")]
    NamingConflict(PathBuf),

    /// A sender extraction tier found nothing usable.
    #[error("Sender extraction failed: {0}")]
    Extraction(String),

    /// Configuration file could not be read or parsed.
    #[error("Invalid configuration '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, IntakeError>`.
pub type Result<T> = std::result::Result<T, IntakeError>;

impl IntakeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
