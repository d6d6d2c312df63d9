//! Target backend collaborators
//!
//! The target backend is three services behind one deployment: an identity
//! store (auth admin HTTP API), structured-record collections (Postgres) and
//! blob storage (storage HTTP API). Each is reached through a trait so the
//! migration engine can run against in-memory doubles.

mod blob;
mod error;
mod http;
mod identity;
mod records;
pub mod traits;

pub use blob::BucketClient;
pub use error::TargetError;
pub use identity::AuthAdminClient;
pub use records::PgRecordStore;
pub use traits::{BlobStore, IdentityStore, NewIdentity, RecordStore};
