//! Core data model types for messages, sender addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod message;
