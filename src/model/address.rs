//! Sender address parsing (RFC 5322 §3.4) and directory-identifier detection.

/// Prefixes of directory-service identifiers that surface in sender fields
/// instead of a routable address (Exchange legacy DNs and their encapsulations).
pub const DIRECTORY_ID_PREFIXES: &[&str] = &["/o=", "/cn=", "ex:", "imceaex-"];

/// A parsed sender address.
///
/// # Examples
/// - `"Ana Horvat <ana@primjer.hr>"` → `display_name = "Ana Horvat"`, `address = "ana@primjer.hr"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare address. May be a directory identifier for internal senders.
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address from a header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// If parsing fails, the raw string is stored as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let (Some(angle_start), Some(angle_end)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if angle_end > angle_start {
                return Self {
                    display_name: strip_quotes(&trimmed[..angle_start]),
                    address: trimmed[angle_start + 1..angle_end].trim().to_string(),
                };
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Portion of the address before `@`, or the whole address if there is none.
    pub fn local_part(&self) -> &str {
        local_part(&self.address)
    }

    /// `true` if the address is a directory-service identifier rather than a mailbox.
    pub fn is_directory_id(&self) -> bool {
        is_directory_id(&self.address)
    }
}

/// Portion of an address before the first `@`.
pub fn local_part(address: &str) -> &str {
    address.split('@').next().unwrap_or(address)
}

/// Domain of an address (after the last `@`), if any.
pub fn domain(address: &str) -> Option<&str> {
    address.rsplit_once('@').map(|(_, d)| d)
}

/// `true` if `value` looks like a directory-service identifier.
pub fn is_directory_id(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    DIRECTORY_ID_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}
