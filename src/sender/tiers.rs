//! Extraction tiers tried when the forwarder is the direct sender.

use std::sync::LazyLock;

use regex::Regex;

use super::candidates::normalize_candidate;
use super::SenderResolver;
use crate::error::{IntakeError, Result};
use crate::model::address::{is_directory_id, EmailAddress};
use crate::model::message::Message;
use crate::parser::mime::html_to_text;

/// Forwarded-header line quoted in a body: `From: Name <addr>` or `From: Name [mailto:addr]`.
static BODY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t>*]*(?:From|Od|Šalje|Pošiljatelj)[ \t]*:[^\n<\[]*(?:<[ \t]*([^<>\s]+@[^<>\s]+?)[ \t]*>|\[mailto:([^\]\s]+@[^\]\s]+)\])",
    )
    .expect("valid regex")
});

/// `Return-Path:` / `Original-Recipient:` lines in the transport headers.
static HEADER_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^(?:Return-Path|Original-Recipient)[ \t]*:[ \t]*(?:rfc822[ \t]*;[ \t]*)?<?[ \t]*([^\s<>;]+@[^\s<>;]+?)[ \t]*>?[ \t]*\r?$",
    )
    .expect("valid regex")
});

/// Anything shaped like an e-mail address.
static ANY_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid regex")
});

/// One original-sender extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The on-behalf-of transport property.
    StructuredProperty,
    /// A quoted `From:` line in the body.
    BodyPattern,
    /// `Return-Path:` / `Original-Recipient:` in the raw headers.
    HeaderPattern,
}

/// Order in which tiers run for forwarded mail.
pub const FORWARDER_TIERS: [Tier; 3] = [
    Tier::StructuredProperty,
    Tier::BodyPattern,
    Tier::HeaderPattern,
];

/// Result of one tier: an optional primary plus every address it touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierOutcome {
    pub primary: Option<String>,
    pub touched: Vec<String>,
}

impl Tier {
    /// Run this tier against `message`.
    ///
    /// A primary is only reported if it passes the resolver's candidate filter.
    pub fn extract(&self, message: &Message, resolver: &SenderResolver) -> Result<TierOutcome> {
        let touched = match self {
            Tier::StructuredProperty => structured_property(message, resolver.on_behalf_headers())?,
            Tier::BodyPattern => body_pattern(message),
            Tier::HeaderPattern => header_pattern(message),
        };

        let primary = touched
            .iter()
            .map(|t| normalize_candidate(t))
            .find(|c| resolver.filter().admits(c));

        Ok(TierOutcome { primary, touched })
    }
}

fn structured_property(message: &Message, headers: &[String]) -> Result<Vec<String>> {
    let mut rejected = None;
    for name in headers {
        let Some(value) = message.header(name) else {
            continue;
        };
        let addr = EmailAddress::parse(value).address;
        if addr.contains('@') && !is_directory_id(&addr) {
            return Ok(vec![addr]);
        }
        rejected = Some(format!("{name}: '{value}' is not a routable address"));
    }
    match rejected {
        Some(reason) => Err(IntakeError::Extraction(reason)),
        None => Ok(Vec::new()),
    }
}

fn body_pattern(message: &Message) -> Vec<String> {
    let text = searchable_body(message);
    BODY_FROM
        .captures_iter(&text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn header_pattern(message: &Message) -> Vec<String> {
    HEADER_ADDR
        .captures_iter(&message.raw_headers)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Every address-shaped substring of the plain-text and HTML bodies.
pub fn harvest_addresses(message: &Message) -> Vec<String> {
    let mut found = Vec::new();
    for source in [message.body_text.as_str(), message.body_html.as_str()] {
        found.extend(ANY_ADDR.find_iter(source).map(|m| m.as_str().to_string()));
    }
    found
}

/// Plain text followed by the HTML body rendered as text.
fn searchable_body(message: &Message) -> String {
    if message.body_html.is_empty() {
        return message.body_text.clone();
    }
    format!("{}\n{}", message.body_text, html_to_text(&message.body_html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn message(body: &str, html: &str, headers: &str) -> Message {
        Message {
            id: "m".to_string(),
            is_read: false,
            subject: String::new(),
            received: DateTime::<chrono::Utc>::UNIX_EPOCH.fixed_offset(),
            sender: EmailAddress::parse("scan@ured.gov.hr"),
            body_text: body.to_string(),
            body_html: html.to_string(),
            raw_headers: headers.to_string(),
            headers: crate::parser::header::unfold_headers(headers),
            attachments: Vec::new(),
        }
    }

    fn resolver() -> SenderResolver {
        SenderResolver::new("scan@ured.gov.hr", vec!["Sender".to_string()])
    }

    #[test]
    fn test_body_pattern_angle_brackets() {
        let msg = message("> From: Jane Doe <jane@ext.example>\n", "", "");
        let out = Tier::BodyPattern.extract(&msg, &resolver()).unwrap();
        assert_eq!(out.primary.as_deref(), Some("jane@ext.example"));
    }

    #[test]
    fn test_body_pattern_mailto_and_croatian_label() {
        let msg = message("Šalje: Ivo Ivić [mailto:ivo@drugi.hr]\n", "", "");
        let out = Tier::BodyPattern.extract(&msg, &resolver()).unwrap();
        assert_eq!(out.primary.as_deref(), Some("ivo@drugi.hr"));
    }

    #[test]
    fn test_body_pattern_html_only() {
        let msg = message("", "<div>From: Jane &lt;jane@ext.example&gt;</div>", "");
        let out = Tier::BodyPattern.extract(&msg, &resolver()).unwrap();
        assert_eq!(out.primary.as_deref(), Some("jane@ext.example"));
    }

    #[test]
    fn test_body_pattern_skips_forwarder_but_touches_it() {
        let body = "From: Skener <scan@ured.gov.hr>\n\nFrom: Jane <jane@ext.example>\n";
        let out = Tier::BodyPattern.extract(&message(body, "", ""), &resolver()).unwrap();
        assert_eq!(out.touched.len(), 2);
        assert_eq!(out.primary.as_deref(), Some("jane@ext.example"));
    }

    #[test]
    fn test_header_pattern() {
        let headers = "Received: by x\nOriginal-Recipient: rfc822;ivo@drugi.hr\nSubject: x\n";
        let out = Tier::HeaderPattern.extract(&message("", "", headers), &resolver()).unwrap();
        assert_eq!(out.primary.as_deref(), Some("ivo@drugi.hr"));
    }

    #[test]
    fn test_structured_property_missing_is_not_an_error() {
        let out = Tier::StructuredProperty
            .extract(&message("", "", "Subject: x\n"), &resolver())
            .unwrap();
        assert_eq!(out, TierOutcome::default());
    }

    #[test]
    fn test_structured_property_directory_id_is_an_error() {
        let msg = message("", "", "Sender: /o=ured/ou=exchange/cn=recipients/cn=ivo\n");
        assert!(Tier::StructuredProperty.extract(&msg, &resolver()).is_err());
    }

    #[test]
    fn test_harvest_addresses_scans_both_bodies() {
        let msg = message(
            "kontakt: ana@primjer.hr, ivo@drugi.hr",
            "<a href=\"mailto:jane@ext.example\">Jane</a>",
            "",
        );
        assert_eq!(
            harvest_addresses(&msg),
            ["ana@primjer.hr", "ivo@drugi.hr", "jane@ext.example"]
        );
    }
}
