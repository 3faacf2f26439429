//! MIME message parsing: body extraction, attachment listing, HTML-to-text conversion.

use chrono::{DateTime, FixedOffset};
use mail_parser::{MessageParser, MimeHeaders};

use crate::error::{IntakeError, Result};
use crate::model::address::EmailAddress;
use crate::model::attachment::{Attachment, AttachmentKind};
use crate::model::message::Message;
use crate::parser::header;

/// Parse a complete raw message (headers + body) into a [`Message`].
///
/// `fallback_received` is used when neither `Received:` nor `Date:` yields a timestamp.
pub fn parse_message(
    raw_message: &[u8],
    id: &str,
    is_read: bool,
    fallback_received: DateTime<FixedOffset>,
) -> Result<Message> {
    let message_bytes = skip_bom(raw_message);

    let raw_headers = header::decode_header_bytes(extract_raw_headers(message_bytes));
    let headers = header::unfold_headers(&raw_headers);
    let received = header::received_time(&headers).unwrap_or(fallback_received);

    let parsed = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| IntakeError::MessageParse {
            path: id.into(),
            reason: "not an RFC 5322 message".to_string(),
        })?;

    let sender = parsed
        .from()
        .and_then(|from| from.first())
        .map(|addr| EmailAddress {
            display_name: addr.name().unwrap_or_default().trim().to_string(),
            address: addr.address().unwrap_or_default().trim().to_string(),
        })
        .unwrap_or_else(|| {
            EmailAddress::parse(header::get_header(&headers, "from").unwrap_or_default())
        });

    let body_text = parsed
        .body_text(0)
        .map(|s| s.into_owned())
        .unwrap_or_default();
    let body_html = parsed
        .body_html(0)
        .map(|s| s.into_owned())
        .unwrap_or_default();

    Ok(Message {
        id: id.to_string(),
        is_read,
        subject: parsed.subject().unwrap_or_default().to_string(),
        received,
        sender,
        body_text,
        body_html,
        raw_headers,
        headers,
        attachments: list_attachments_from_parsed(&parsed),
    })
}

/// Decode and extract the binary content of a specific attachment.
pub fn extract_attachment(raw_message: &[u8], attachment: &Attachment) -> Result<Vec<u8>> {
    let message_bytes = skip_bom(raw_message);
    let parsed = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| IntakeError::MessageParse {
            path: "<attachment source>".into(),
            reason: "failed to parse message for attachment extraction".to_string(),
        })?;

    parsed
        .attachments()
        .nth(attachment.index)
        .map(|part| part.contents().to_vec())
        .ok_or_else(|| IntakeError::AttachmentNotFound {
            message: parsed.subject().unwrap_or_default().to_string(),
            name: attachment.filename.clone(),
        })
}

/// Build attachment metadata from a parsed `mail_parser::Message`.
fn list_attachments_from_parsed(msg: &mail_parser::Message<'_>) -> Vec<Attachment> {
    msg.attachments()
        .enumerate()
        .map(|(index, part)| {
            let filename = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{index}"));

            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{sub}", ct.ctype()),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let disposition = part
                .content_disposition()
                .map(|d| d.ctype().to_ascii_lowercase());
            let embedded = match disposition.as_deref() {
                Some("inline") => true,
                Some("attachment") => false,
                _ => part.content_id().is_some(),
            };

            Attachment {
                index,
                filename,
                content_type,
                kind: if embedded {
                    AttachmentKind::Embedded
                } else {
                    AttachmentKind::Regular
                },
                size: part.contents().len() as u64,
            }
        })
        .collect()
}

fn skip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// The raw header block (everything before the first blank line).
fn extract_raw_headers(data: &[u8]) -> &[u8] {
    let lf = data.windows(2).position(|w| w == b"\n\n");
    let crlf = data.windows(4).position(|w| w == b"\r\n\r\n");
    let end = match (lf, crlf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match end {
        Some(pos) => &data[..pos],
        None => data,
    }
}

/// Convert HTML to plain text so address patterns match across markup.
///
/// - Line breaks from `<br>`, `<p>`, `<div>`, `<tr>`
/// - Removes scripts and styles
/// - Decodes common HTML entities (`&lt;` matters: quoted headers carry `&lt;addr&gt;`)
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["br", "br/", "br /", "BR"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in ["p", "div", "tr", "li"] {
        let upper = tag.to_uppercase();
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&amp;", "&")
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match after.to_ascii_lowercase().find(&close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}
