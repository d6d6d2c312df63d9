//! Fixed-size batch inserts with per-batch failure isolation.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use nutrilog_core::{LegacyKeyed, TargetFood, TargetFoodLog, clamp_batch_size};
use nutrilog_target::{RecordStore, TargetError};
use tracing::{debug, warn};

use crate::error::within;

/// Destination that accepts one batch per call, all-or-nothing.
#[async_trait]
pub trait BatchSink<T: Sync>: Send + Sync {
    async fn write(&self, batch: &[T]) -> Result<(), TargetError>;
}

#[async_trait]
impl BatchSink<TargetFood> for dyn RecordStore {
    async fn write(&self, batch: &[TargetFood]) -> Result<(), TargetError> {
        self.insert_foods(batch).await
    }
}

#[async_trait]
impl BatchSink<TargetFoodLog> for dyn RecordStore {
    async fn write(&self, batch: &[TargetFoodLog]) -> Result<(), TargetError> {
        self.insert_food_logs(batch).await
    }
}

/// A batch that was not written.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based position of the batch.
    pub index: usize,
    pub legacy_ids: Vec<String>,
    pub error: TargetError,
}

#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Records of successful batches, in input order.
    pub written: Vec<T>,
    /// Failed batches, in input order.
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    #[must_use]
    pub fn failed_records(&self) -> usize {
        self.failures.iter().map(|f| f.legacy_ids.len()).sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchWriter {
    batch_size: usize,
    concurrency: usize,
    timeout: Duration,
}

impl BatchWriter {
    /// Zero batch size or concurrency is treated as one; batch sizes above
    /// [`nutrilog_core::MAX_BATCH_SIZE`] are lowered to it.
    #[must_use]
    pub fn new(batch_size: usize, concurrency: usize, timeout: Duration) -> Self {
        let effective = clamp_batch_size(batch_size);
        if effective < batch_size {
            warn!(requested = batch_size, effective, "Batch size exceeds the statement bind limit, lowering");
        }
        Self { batch_size: effective, concurrency: concurrency.max(1), timeout }
    }

    /// Writes `records` in batches of `batch_size`, at most `concurrency`
    /// batches in flight. A failing batch never affects the others.
    pub async fn write_all<T, S>(&self, sink: &S, records: Vec<T>) -> BatchOutcome<T>
    where
        T: LegacyKeyed + Send + Sync,
        S: BatchSink<T> + ?Sized,
    {
        let batches = split(records, self.batch_size);
        let total = batches.len();
        let mut results = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| async move {
                let result = within(self.timeout, sink.write(&batch)).await;
                (index, batch, result)
            })
            .buffered(self.concurrency);

        let mut outcome = BatchOutcome { written: Vec::new(), failures: Vec::new() };
        while let Some((index, batch, result)) = results.next().await {
            match result {
                Ok(()) => {
                    debug!(batch = index + 1, total, size = batch.len(), "Batch written");
                    outcome.written.extend(batch);
                },
                Err(error) => {
                    warn!(batch = index + 1, total, size = batch.len(), %error, "Batch failed");
                    let legacy_ids = batch.iter().map(|r| r.legacy_id().to_owned()).collect();
                    outcome.failures.push(BatchFailure { index, legacy_ids, error });
                },
            }
        }
        outcome
    }
}

fn split<T>(records: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter();
    loop {
        let batch: Vec<T> = iter.by_ref().take(size).collect();
        if batch.is_empty() {
            return batches;
        }
        batches.push(batch);
    }
}
