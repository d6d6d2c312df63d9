//! Migration engine for nutrilog-migrate
//!
//! Moves users, foods and food logs from the legacy backend to the target
//! backend: transform each legacy record, remap foreign keys through identity
//! maps, migrate photos, write with dedup (users) or in batches (foods, logs),
//! and aggregate every failure into one report.

#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]

mod asset;
mod error;
mod identity;
mod orchestrator;
pub mod transform;
mod writer;

pub use asset::{AssetMigrator, AssetOutcome, asset_name, content_type_for};
pub use error::MigrationError;
pub use identity::{IdentityMap, reconstruct_food_map, reconstruct_user_map};
pub use orchestrator::{Aborted, Orchestrator, RunSettings};
pub use transform::{BrandParser, ParsedName, TrailingGroupParser, Transformer, WholeNameParser};
pub use writer::{BatchFailure, BatchOutcome, BatchSink, BatchWriter, UpsertOutcome, UserWriter, provenance_metadata};
