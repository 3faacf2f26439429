//! Original-sender resolution for mail relayed by the forwarder account.
//!
//! When the forwarder is the direct sender, a fixed sequence of extraction
//! tiers is tried until one yields a primary identity. Every tier, successful
//! or not, feeds the addresses it touched into the per-message
//! [`CandidateSet`]; a final exhaustive scan of the body always runs.

pub mod candidates;
pub mod tiers;

use crate::config::MailboxConfig;
use crate::model::message::Message;

pub use candidates::{CandidateFilter, CandidateSet};
pub use tiers::{Tier, TierOutcome, FORWARDER_TIERS};

/// Where the primary identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderSource {
    /// The message's direct sender.
    Direct,
    /// A forwarder extraction tier.
    Tier(Tier),
}

/// Per-message resolution state, created fresh for every message.
#[derive(Debug, Clone)]
pub struct MessageContext {
    /// Best-effort original sender.
    pub primary: String,
    /// Which step produced `primary`.
    pub source: SenderSource,
    /// Tiers attempted, in order.
    pub attempted: Vec<Tier>,
    /// Harvested candidate addresses.
    pub candidates: CandidateSet,
}

/// Runs the tiered extraction for each message.
#[derive(Debug, Clone)]
pub struct SenderResolver {
    forwarder: String,
    on_behalf_headers: Vec<String>,
    filter: CandidateFilter,
}

impl SenderResolver {
    pub fn new(forwarder: &str, on_behalf_headers: Vec<String>) -> Self {
        Self {
            forwarder: forwarder.trim().to_string(),
            on_behalf_headers,
            filter: CandidateFilter::new(forwarder),
        }
    }

    pub fn from_config(config: &MailboxConfig) -> Self {
        Self::new(&config.forwarder, config.on_behalf_headers.clone())
    }

    pub fn filter(&self) -> &CandidateFilter {
        &self.filter
    }

    pub(crate) fn on_behalf_headers(&self) -> &[String] {
        &self.on_behalf_headers
    }

    /// `true` if the direct sender is the forwarder (exact, case-sensitive).
    pub fn is_forwarded(&self, message: &Message) -> bool {
        !self.forwarder.is_empty() && message.sender.address == self.forwarder
    }

    /// Resolve the original sender of `message`. Never fails.
    pub fn resolve(&self, message: &Message) -> MessageContext {
        let mut candidates = CandidateSet::new();
        candidates.offer(&message.sender.address, &self.filter);

        let mut primary = None;
        let mut attempted = Vec::new();

        if self.is_forwarded(message) {
            for tier in FORWARDER_TIERS {
                attempted.push(tier);
                match tier.extract(message, self) {
                    Ok(outcome) => {
                        for touched in &outcome.touched {
                            candidates.offer(touched, &self.filter);
                        }
                        if let Some(found) = outcome.primary {
                            tracing::debug!(tier = ?tier, sender = %found, "Original sender found");
                            primary = Some((found, tier));
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(tier = ?tier, error = %e, "Extraction tier failed");
                    }
                }
            }
        }

        for found in tiers::harvest_addresses(message) {
            candidates.offer(&found, &self.filter);
        }

        let (primary, source) = match primary {
            Some((addr, tier)) => (addr, SenderSource::Tier(tier)),
            None => (message.sender.address.clone(), SenderSource::Direct),
        };

        MessageContext {
            primary,
            source,
            attempted,
            candidates,
        }
    }
}
