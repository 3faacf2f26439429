//! `docintake`: operator batch jobs for a document-intake office.
//!
//! The core job harvests attachments from unread mail, names them after the
//! original sender and normalizes them into single-page PDFs. The [`batch`]
//! module holds the directory-level helpers (copy, rename, convert, split,
//! extract).

pub mod batch;
pub mod config;
pub mod error;
pub mod filter;
pub mod fsops;
pub mod harvest;
pub mod mailstore;
pub mod model;
pub mod naming;
pub mod normalize;
pub mod parser;
pub mod sender;
pub mod tools;
