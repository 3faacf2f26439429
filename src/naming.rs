//! Filesystem-safe names: message prefixes and attachment file names.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::model::address::is_directory_id;
use crate::sender::CandidateSet;

/// Replacement when a sanitized name source is too short to be useful.
pub const PLACEHOLDER: &str = "unknown";

/// Minimum length of a sanitized name source.
pub const MIN_NAME_LEN: usize = 3;

/// Separator between candidate local-parts in a prefix.
pub const LOCAL_PART_SEPARATOR: &str = "__";

/// Leading reply/forward markers, possibly repeated: `RE: FW: Odgovor: ...`.
static SUBJECT_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\s*(?:fwd?|re|odgovor)\s*:)+").expect("valid regex")
});

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// [`sanitize`], replaced by [`PLACEHOLDER`] when shorter than [`MIN_NAME_LEN`].
pub fn sanitize_name_source(s: &str) -> String {
    let sanitized = sanitize(s);
    if sanitized.chars().count() < MIN_NAME_LEN {
        PLACEHOLDER.to_string()
    } else {
        sanitized
    }
}

/// Subject without leading `FW:` / `RE:` / `Fwd:` / `Odgovor:` markers, whitespace collapsed.
pub fn clean_subject(subject: &str) -> String {
    let stripped = SUBJECT_MARKERS.replace(subject, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick the unsanitized name source for a message.
///
/// Candidates first, then a real display name, then the cleaned subject.
pub fn name_source(candidates: &CandidateSet, display_name: &str, subject: &str) -> String {
    if !candidates.is_empty() {
        return candidates.local_parts().join(LOCAL_PART_SEPARATOR);
    }
    let display_name = display_name.trim();
    if !display_name.is_empty() && !is_directory_id(display_name) {
        return display_name.to_string();
    }
    clean_subject(subject)
}

/// `{received:%Y%m%d_%H%M%S}_{sanitizedNameSource}_`.
pub fn filename_prefix(
    received: &DateTime<FixedOffset>,
    candidates: &CandidateSet,
    display_name: &str,
    subject: &str,
) -> String {
    let source = name_source(candidates, display_name, subject);
    format!(
        "{}_{}_",
        received.format("%Y%m%d_%H%M%S"),
        sanitize_name_source(&source)
    )
}

/// Sanitize an attachment file name, keeping it non-empty.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = sanitize(name.trim());
    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "attachment".to_string()
    } else {
        sanitized
    }
}
