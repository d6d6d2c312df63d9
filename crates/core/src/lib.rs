//! Core types for nutrilog-migrate
//!
//! This crate contains domain types shared across all other crates: legacy
//! records, target records, stage selection, run statistics and configuration.

mod config;
pub mod constants;
mod entity;
mod env_config;
mod error;
mod legacy_record;
mod stats;
mod target;

pub use config::*;
pub use constants::*;
pub use entity::*;
pub use env_config::env_parse_with_default;
pub use error::*;
pub use legacy_record::*;
pub use stats::*;
pub use target::*;
