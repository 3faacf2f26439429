//! Mail store access: enumerate a folder, save attachment payloads, flip the read flag.

pub mod maildir;

use std::path::Path;

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::message::Message;

pub use maildir::MaildirStore;

/// A mailbox folder the harvest pipeline reads from.
pub trait MailStore {
    /// All messages in the folder, in delivery order.
    fn messages(&self) -> Result<Vec<Message>>;

    /// Write the decoded payload of `attachment` to `path`.
    fn save_attachment(&self, message: &Message, attachment: &Attachment, path: &Path) -> Result<()>;

    /// Mark `message` as read.
    fn mark_read(&mut self, message: &Message) -> Result<()>;
}
