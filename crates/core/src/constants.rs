//! Shared constants for nutrilog-migrate.

/// Records per insert call for foods and food logs.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Safety cap on records pulled from the legacy backend in one fetch.
pub const DEFAULT_FETCH_LIMIT: usize = 10_000;

/// Batches (or asset transfers) in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Timeout applied to every network call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blob bucket receiving migrated food-log photos.
pub const DEFAULT_ASSET_BUCKET: &str = "food-photos";

/// Name used when a legacy food has no usable display string.
pub const UNKNOWN_FOOD_NAME: &str = "Unknown Food";

/// Quantity applied to a food log whose legacy row has no serving count.
pub const DEFAULT_LOG_QUANTITY: f64 = 1.0;

/// Unit applied to a food log whose legacy row has no unit.
pub const DEFAULT_LOG_UNIT: &str = "serving";

/// Metadata key marking a target identity as produced by this migration.
pub const MIGRATED_MARKER: &str = "migrated";

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 8;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Page size when listing identities from the target auth API.
pub const IDENTITY_PAGE_SIZE: usize = 1000;

/// Bind parameters PostgreSQL accepts in one statement.
pub const PG_MAX_BIND_PARAMS: usize = 65_535;

/// Parameters bound per food row, the widest batched insert.
pub const FOOD_ROW_BINDS: usize = 16;

/// Largest batch a single multi-row insert can carry.
pub const MAX_BATCH_SIZE: usize = PG_MAX_BIND_PARAMS / FOOD_ROW_BINDS;
