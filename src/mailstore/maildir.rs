//! Maildir-backed [`MailStore`].
//!
//! Messages live as individual files under `new/` (never seen) and `cur/`.
//! File names follow `<unique-id>:2,<flags>`; the `S` flag marks a message
//! as read. Marking read moves a message from `new/` to `cur/` and adds `S`.
//!
//! `INBOX` is the Maildir root; any other folder is the Maildir++ subfolder
//! `.<name>` (or a plain `<name>` directory if that is what exists).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::MailStore;
use crate::error::{IntakeError, Result};
use crate::model::attachment::Attachment;
use crate::model::message::Message;
use crate::parser::mime;

const INFO_SEPARATOR: &str = ":2,";
const SEEN_FLAG: char = 'S';

/// One folder of a Maildir tree.
#[derive(Debug, Clone)]
pub struct MaildirStore {
    folder: PathBuf,
}

impl MaildirStore {
    /// Open `folder` under the Maildir `root`.
    ///
    /// Fails with [`IntakeError::MailboxNotFound`] if the folder has neither `cur/` nor `new/`.
    pub fn open(root: &Path, folder: &str) -> Result<Self> {
        let folder = resolve_folder(root, folder);
        if !folder.join("cur").is_dir() && !folder.join("new").is_dir() {
            return Err(IntakeError::MailboxNotFound(folder));
        }
        tracing::info!(folder = %folder.display(), "Opened Maildir folder");
        Ok(Self { folder })
    }

    pub fn path(&self) -> &Path {
        &self.folder
    }

    /// Message files with their read state.
    fn entries(&self) -> Result<Vec<(PathBuf, bool)>> {
        let mut entries = Vec::new();
        for sub in ["new", "cur"] {
            let dir = self.folder.join(sub);
            if !dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&dir).map_err(|e| IntakeError::io(&dir, e))? {
                let path = entry.map_err(|e| IntakeError::io(&dir, e))?.path();
                if !path.is_file() || is_hidden(&path) {
                    continue;
                }
                let read = sub == "cur" && flags_of(&path).contains(SEEN_FLAG);
                entries.push((path, read));
            }
        }
        Ok(entries)
    }
}

impl MailStore for MaildirStore {
    fn messages(&self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for (path, is_read) in self.entries()? {
            let raw = match std::fs::read(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot read message");
                    continue;
                }
            };
            let fallback = modified_time(&path);
            match mime::parse_message(&raw, &path.to_string_lossy(), is_read, fallback) {
                Ok(msg) => messages.push(msg),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping message"),
            }
        }
        messages.sort_by(|a, b| a.received.cmp(&b.received).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    fn save_attachment(&self, message: &Message, attachment: &Attachment, path: &Path) -> Result<()> {
        let source = Path::new(&message.id);
        let raw = std::fs::read(source).map_err(|e| IntakeError::io(source, e))?;
        let data = mime::extract_attachment(&raw, attachment)?;
        std::fs::write(path, &data).map_err(|e| IntakeError::io(path, e))?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Saved attachment");
        Ok(())
    }

    fn mark_read(&mut self, message: &Message) -> Result<()> {
        let source = PathBuf::from(&message.id);
        let target = seen_path(&self.folder, &source)
            .ok_or_else(|| IntakeError::InvalidPath(message.id.clone()))?;
        if target != source {
            std::fs::rename(&source, &target).map_err(|e| IntakeError::io(&source, e))?;
        }
        Ok(())
    }
}

fn resolve_folder(root: &Path, folder: &str) -> PathBuf {
    let folder = folder.trim().trim_matches('/');
    if folder.is_empty() || folder.eq_ignore_ascii_case("INBOX") {
        return root.to_path_buf();
    }
    let plusplus = root.join(format!(".{folder}"));
    if plusplus.is_dir() {
        plusplus
    } else {
        root.join(folder)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Flag characters after `:2,`, empty if there are none.
pub fn flags_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split_once(INFO_SEPARATOR))
        .map(|(_, flags)| flags.to_string())
        .unwrap_or_default()
}

/// Path of `message` in `cur/` with the `S` flag set.
pub fn seen_path(folder: &Path, message: &Path) -> Option<PathBuf> {
    let name = message.file_name()?.to_str()?;
    let (unique_id, flags) = match name.split_once(INFO_SEPARATOR) {
        Some((id, flags)) => (id, flags.to_string()),
        None => (name.split(':').next().unwrap_or(name), String::new()),
    };

    let mut chars: Vec<char> = flags.chars().collect();
    if !chars.contains(&SEEN_FLAG) {
        chars.push(SEEN_FLAG);
    }
    chars.sort_unstable();
    let flags: String = chars.into_iter().collect();

    Some(folder.join("cur").join(format!("{unique_id}{INFO_SEPARATOR}{flags}")))
}

fn modified_time(path: &Path) -> DateTime<chrono::FixedOffset> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).fixed_offset())
        .unwrap_or_else(|_| DateTime::<chrono::Utc>::UNIX_EPOCH.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "From: Ana <ana@primjer.hr>\r\n\
Date: Thu, 02 Jan 2025 03:04:05 +0000\r\n\
Subject: Prijava\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
U prilogu.\r\n\
--b\r\n\
Content-Type: application/pdf; name=\"prijava.pdf\"\r\n\
Content-Disposition: attachment; filename=\"prijava.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--b--\r\n";

    fn maildir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["new", "cur", "tmp"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        dir
    }

    #[test]
    fn test_open_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let err = MaildirStore::open(dir.path(), "Skener").unwrap_err();
        assert!(matches!(err, IntakeError::MailboxNotFound(_)));
    }

    #[test]
    fn test_open_plusplus_subfolder() {
        let dir = maildir();
        std::fs::create_dir_all(dir.path().join(".Skener").join("cur")).unwrap();
        let store = MaildirStore::open(dir.path(), "Skener").unwrap();
        assert_eq!(store.path(), dir.path().join(".Skener"));
        let inbox = MaildirStore::open(dir.path(), "INBOX").unwrap();
        assert_eq!(inbox.path(), dir.path());
    }

    #[test]
    fn test_read_state_from_location_and_flags() {
        let dir = maildir();
        std::fs::write(dir.path().join("new").join("1.a.host"), MESSAGE).unwrap();
        std::fs::write(dir.path().join("cur").join("2.a.host:2,S"), MESSAGE).unwrap();
        std::fs::write(dir.path().join("cur").join("3.a.host:2,F"), MESSAGE).unwrap();

        let store = MaildirStore::open(dir.path(), "INBOX").unwrap();
        let messages = store.messages().unwrap();
        assert_eq!(messages.len(), 3);
        let unread = messages.iter().filter(|m| !m.is_read).count();
        assert_eq!(unread, 2);
        assert!(messages.iter().all(|m| m.subject == "Prijava"));
    }

    #[test]
    fn test_save_attachment_and_mark_read() {
        let dir = maildir();
        let msg_path = dir.path().join("new").join("1.a.host");
        std::fs::write(&msg_path, MESSAGE).unwrap();

        let mut store = MaildirStore::open(dir.path(), "INBOX").unwrap();
        let messages = store.messages().unwrap();
        let msg = &messages[0];

        let out = dir.path().join("prijava.pdf");
        store.save_attachment(msg, &msg.attachments[0], &out).unwrap();
        assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF"));

        store.mark_read(msg).unwrap();
        assert!(!msg_path.exists());
        assert!(dir.path().join("cur").join("1.a.host:2,S").exists());
        assert!(store.messages().unwrap()[0].is_read);
    }

    #[test]
    fn test_seen_path_keeps_flags_sorted() {
        let folder = Path::new("/mail");
        assert_eq!(
            seen_path(folder, Path::new("/mail/cur/9.x.host:2,RF")).unwrap(),
            PathBuf::from("/mail/cur/9.x.host:2,FRS")
        );
        assert_eq!(
            seen_path(folder, Path::new("/mail/cur/9.x.host:2,S")).unwrap(),
            PathBuf::from("/mail/cur/9.x.host:2,S")
        );
    }

    #[test]
    fn test_flags_of() {
        assert_eq!(flags_of(Path::new("cur/1.x:2,FS")), "FS");
        assert_eq!(flags_of(Path::new("new/1.x")), "");
    }
}
