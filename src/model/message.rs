//! A message as seen by the harvest pipeline.

use chrono::{DateTime, FixedOffset};

use super::address::EmailAddress;
use super::attachment::Attachment;

/// One item of a mailbox folder.
///
/// The mail store owns the underlying item; the pipeline only reads these
/// fields and asks the store to flip the read flag.
#[derive(Debug, Clone)]
pub struct Message {
    /// Store-specific locator (for Maildir: the message file path).
    pub id: String,

    /// Whether the message has already been read.
    pub is_read: bool,

    /// Decoded subject line.
    pub subject: String,

    /// Time the message was received, in the offset it was recorded with.
    pub received: DateTime<FixedOffset>,

    /// Direct sender (first `From:` header).
    pub sender: EmailAddress,

    /// Plain-text body, empty if the message has none.
    pub body_text: String,

    /// HTML body, empty if the message has none.
    pub body_html: String,

    /// Raw transport headers as a single string.
    pub raw_headers: String,

    /// Unfolded headers as `(lowercase_name, value)` pairs.
    pub headers: Vec<(String, String)>,

    /// Attachment metadata in message order.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// First value for a header name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Unread and carrying at least one attachment.
    pub fn is_harvestable(&self) -> bool {
        !self.is_read && !self.attachments.is_empty()
    }
}
