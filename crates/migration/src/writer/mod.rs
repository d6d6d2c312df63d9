mod batch;
mod users;

pub use batch::{BatchFailure, BatchOutcome, BatchSink, BatchWriter};
pub use users::{UpsertOutcome, UserWriter, provenance_metadata};
