//! Legacy Source Reader
//!
//! Bounded, read-only queries against the legacy REST backend. Every transport
//! or authentication failure surfaces as a [`LegacyError`]; callers treat any
//! error as the source being unavailable for the whole stage.

mod client;
mod error;
mod source;

pub use client::LegacyClient;
pub use error::LegacyError;
pub use source::LegacySource;
