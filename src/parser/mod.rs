//! Email parsing: header decoding, received-time extraction, and MIME handling.

pub mod header;
pub mod mime;
