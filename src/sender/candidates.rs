//! Per-message set of plausible original-sender addresses.

use crate::model::address::{domain, is_directory_id, local_part};

/// Decides which strings may enter a [`CandidateSet`].
///
/// Rejects empty strings, strings without `@`, directory-service identifiers,
/// the forwarder address itself and any address at the forwarder's domain
/// (or a subdomain of it). Comparison is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    forwarder: Option<String>,
    forwarder_domain: Option<String>,
}

impl CandidateFilter {
    /// Build a filter for `forwarder`. An empty forwarder excludes nothing extra.
    pub fn new(forwarder: &str) -> Self {
        let forwarder = forwarder.trim().to_ascii_lowercase();
        if forwarder.is_empty() {
            return Self::default();
        }
        Self {
            forwarder_domain: domain(&forwarder).map(str::to_string),
            forwarder: Some(forwarder),
        }
    }

    /// `true` if the (already normalized) candidate may be admitted.
    pub fn admits(&self, candidate: &str) -> bool {
        if candidate.is_empty() || !candidate.contains('@') || is_directory_id(candidate) {
            return false;
        }
        let lower = candidate.to_ascii_lowercase();
        if self.forwarder.as_deref() == Some(lower.as_str()) {
            return false;
        }
        match (&self.forwarder_domain, domain(&lower)) {
            (Some(fwd), Some(dom)) => dom != fwd && !dom.ends_with(&format!(".{fwd}")),
            _ => true,
        }
    }
}

/// Trim decoration commonly wrapped around addresses in bodies and headers.
pub fn normalize_candidate(raw: &str) -> String {
    let mut s = raw.trim_matches(is_decoration);
    if s.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("mailto:")) {
        s = &s[7..];
    }
    s.trim_matches(is_decoration).to_ascii_lowercase()
}

fn is_decoration(c: char) -> bool {
    c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '[' | ']' | '(' | ')' | '.' | ',' | ';')
}

/// Order-preserving, deduplicated set of lowercase candidate addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    items: Vec<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `raw` and admit it if the filter allows and it is not present yet.
    ///
    /// Returns `true` if the set grew.
    pub fn offer(&mut self, raw: &str, filter: &CandidateFilter) -> bool {
        let candidate = normalize_candidate(raw);
        if !filter.admits(&candidate) || self.items.contains(&candidate) {
            return false;
        }
        self.items.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Unique local-parts in admission order.
    pub fn local_parts(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let part = local_part(item);
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> CandidateFilter {
        CandidateFilter::new("Scan@Ured.gov.hr")
    }

    #[test]
    fn test_admits_external_address() {
        assert!(filter().admits("jane@ext.example"));
    }

    #[test]
    fn test_rejects_forwarder_and_domain() {
        let f = filter();
        assert!(!f.admits("scan@ured.gov.hr"));
        assert!(!f.admits("SCAN@URED.GOV.HR"));
        assert!(!f.admits("pisarnica@ured.gov.hr"));
        assert!(!f.admits("someone@mail.ured.gov.hr"));
        assert!(f.admits("someone@notured.gov.hr"));
    }

    #[test]
    fn test_rejects_non_addresses() {
        let f = filter();
        assert!(!f.admits(""));
        assert!(!f.admits("jane"));
        assert!(!f.admits("/o=exchangelabs/ou=group/cn=recipients/cn=jane@x"));
    }

    #[test]
    fn test_empty_forwarder_filters_only_basics() {
        let f = CandidateFilter::new("");
        assert!(f.admits("scan@ured.gov.hr"));
        assert!(!f.admits("no-at-sign"));
    }

    #[test]
    fn test_offer_is_idempotent() {
        let f = filter();
        let mut set = CandidateSet::new();
        assert!(set.offer("Jane@Ext.example", &f));
        assert!(set.offer("ivo@drugi.hr", &f));
        let before = set.clone();
        assert!(!set.offer("jane@ext.example", &f));
        assert!(!set.offer("<JANE@ext.example>", &f));
        assert_eq!(set, before);
        assert_eq!(set.iter().collect::<Vec<_>>(), ["jane@ext.example", "ivo@drugi.hr"]);
    }

    #[test]
    fn test_normalize_candidate() {
        assert_eq!(normalize_candidate(" <Jane@Ext.Example> "), "jane@ext.example");
        assert_eq!(normalize_candidate("mailto:jane@ext.example"), "jane@ext.example");
        assert_eq!(normalize_candidate("[jane@ext.example]."), "jane@ext.example");
    }

    #[test]
    fn test_local_parts_unique() {
        let f = filter();
        let mut set = CandidateSet::new();
        set.offer("jane@ext.example", &f);
        set.offer("jane@other.example", &f);
        set.offer("ivo@drugi.hr", &f);
        assert_eq!(set.local_parts(), ["jane", "ivo"]);
    }
}
