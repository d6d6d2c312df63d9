//! Stage sequencing, pre-flight checks and report assembly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use nutrilog_core::{
    EntityKind, ErrorKind, ErrorRecord, LegacyRecord, MigrationReport, MigrationStats, StageSet, TargetFood,
    TargetFoodLog, Tuning,
};
use nutrilog_legacy::LegacySource;
use nutrilog_target::{IdentityStore, RecordStore};
use tracing::{error, info, warn};

use crate::asset::{AssetMigrator, AssetOutcome, asset_name};
use crate::error::{MigrationError, within};
use crate::identity::{IdentityMap, reconstruct_food_map, reconstruct_user_map};
use crate::transform::Transformer;
use crate::writer::{BatchOutcome, BatchWriter, UserWriter};

/// Throughput and safety knobs of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub fetch_limit: usize,
    pub batch_size: usize,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl From<&Tuning> for RunSettings {
    fn from(tuning: &Tuning) -> Self {
        Self {
            fetch_limit: tuning.fetch_limit,
            batch_size: tuning.batch_size,
            concurrency: tuning.concurrency,
            timeout: tuning.timeout,
        }
    }
}

/// A run stopped by a fatal error, with everything gathered until then.
#[derive(Debug, thiserror::Error)]
#[error("migration aborted: {error}")]
pub struct Aborted {
    #[source]
    pub error: MigrationError,
    pub report: Box<MigrationReport>,
}

/// Mutable state of one invocation.
struct RunState {
    started_at: DateTime<Utc>,
    stages: Vec<EntityKind>,
    reconstructed: Vec<EntityKind>,
    stats: MigrationStats,
    users: Option<IdentityMap>,
    foods: Option<IdentityMap>,
}

impl RunState {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            stages: Vec::new(),
            reconstructed: Vec::new(),
            stats: MigrationStats::default(),
            users: None,
            foods: None,
        }
    }

    fn note(&mut self, stage: EntityKind, err: &MigrationError) {
        warn!(stage = %stage, kind = err.kind().as_str(), "{err}");
        self.stats.record(err.to_record(stage));
    }

    fn finish(self, aborted: Option<String>) -> MigrationReport {
        MigrationReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            stages: self.stages,
            reconstructed: self.reconstructed,
            stats: self.stats,
            aborted,
        }
    }
}

/// Runs the selected stages in dependency order: users, foods, food logs.
pub struct Orchestrator {
    source: Arc<dyn LegacySource>,
    identities: Arc<dyn IdentityStore>,
    records: Arc<dyn RecordStore>,
    assets: AssetMigrator,
    transformer: Transformer,
    settings: RunSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("transformer", &self.transformer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        source: Arc<dyn LegacySource>,
        identities: Arc<dyn IdentityStore>,
        records: Arc<dyn RecordStore>,
        assets: AssetMigrator,
        transformer: Transformer,
        settings: RunSettings,
    ) -> Self {
        Self { source, identities, records, assets, transformer, settings }
    }

    /// Connectivity checks against both backends.
    ///
    /// # Errors
    /// `SourceUnavailable` or `TargetUnavailable` naming the failed check.
    pub async fn preflight(&self) -> Result<(), MigrationError> {
        self.source
            .ping()
            .await
            .map_err(|e| MigrationError::source_unavailable("pre-flight check", e))?;
        within(self.settings.timeout, self.identities.ping())
            .await
            .map_err(|e| MigrationError::target_unavailable("identity store pre-flight check", e))?;
        within(self.settings.timeout, self.records.ping())
            .await
            .map_err(|e| MigrationError::target_unavailable("record store pre-flight check", e))?;
        info!("Pre-flight checks passed");
        Ok(())
    }

    /// Runs pre-flight checks, then every selected stage.
    ///
    /// Record- and batch-level failures are collected in the report. Only an
    /// unreachable backend stops the run, returning the partial report.
    pub async fn run(&self, stages: StageSet) -> Result<MigrationReport, Aborted> {
        let mut state = RunState::new();
        if let Err(error) = self.preflight().await {
            return Err(abort(state, error));
        }

        for stage in stages.iter() {
            state.stages.push(stage);
            info!(stage = %stage, "Stage started");
            let result = match stage {
                EntityKind::User => self.migrate_users(&mut state).await,
                EntityKind::Food => self.migrate_foods(&mut state).await,
                EntityKind::FoodLog => self.migrate_food_logs(&mut state).await,
            };
            if let Err(error) = result {
                return Err(abort(state, error));
            }
            let counters = state.stats.entity(stage);
            info!(
                stage = %stage,
                total = counters.total,
                migrated = counters.migrated,
                errors = counters.errors,
                "Stage finished"
            );
        }

        Ok(state.finish(None))
    }

    async fn fetch_for_stage(
        &self,
        kind: EntityKind,
        state: &mut RunState,
    ) -> Result<Vec<LegacyRecord>, MigrationError> {
        let limit = self.settings.fetch_limit;
        let available = self
            .source
            .count(kind)
            .await
            .map_err(|e| MigrationError::source_unavailable(format!("counting {kind}"), e))?;
        if available > limit {
            warn!(stage = %kind, available, limit, "Legacy total exceeds fetch cap; run is truncated");
            state.stats.record(
                ErrorRecord::warning(
                    kind,
                    ErrorKind::FetchCapReached,
                    format!("{available} {kind} available but only {limit} fetched"),
                )
                .with_context("available", available.to_string())
                .with_context("fetch_limit", limit.to_string()),
            );
        }
        let records = self.fetch(kind).await?;
        state.stats.entity_mut(kind).total = records.len();
        Ok(records)
    }

    async fn fetch(&self, kind: EntityKind) -> Result<Vec<LegacyRecord>, MigrationError> {
        self.source
            .fetch(kind, self.settings.fetch_limit)
            .await
            .map_err(|e| MigrationError::source_unavailable(format!("fetching {kind}"), e))
    }

    async fn migrate_users(&self, state: &mut RunState) -> Result<(), MigrationError> {
        let records = self.fetch_for_stage(EntityKind::User, state).await?;
        let mut writer = UserWriter::new(Arc::clone(&self.identities), self.settings.timeout);
        let mut map = IdentityMap::new(EntityKind::User);

        for record in &records {
            let user = match self.transformer.user(record) {
                Ok(user) => user,
                Err(err) => {
                    state.note(EntityKind::User, &err);
                    continue;
                },
            };
            match writer.upsert(&user).await {
                Ok(outcome) => {
                    map.insert(record.id(), outcome.id);
                    let stats = &mut state.stats.users;
                    stats.migrated += 1;
                    if outcome.created {
                        stats.created += 1;
                    } else {
                        stats.existing += 1;
                    }
                },
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => state.note(EntityKind::User, &err),
            }
        }

        state.users = Some(map);
        Ok(())
    }

    async fn migrate_foods(&self, state: &mut RunState) -> Result<(), MigrationError> {
        let records = self.fetch_for_stage(EntityKind::Food, state).await?;
        let foods: Vec<TargetFood> = records.iter().map(|record| self.transformer.food(record)).collect();
        let outcome = self.writer().write_all(&*self.records, foods).await;
        record_batch_failures(state, EntityKind::Food, &outcome);

        let mut map = IdentityMap::new(EntityKind::Food);
        for food in &outcome.written {
            map.insert(food.legacy_id.as_str(), food.id);
        }
        state.stats.foods.migrated = outcome.written.len();
        state.foods = Some(map);
        Ok(())
    }

    async fn migrate_food_logs(&self, state: &mut RunState) -> Result<(), MigrationError> {
        let users = match state.users.take() {
            Some(map) => map,
            None => self.reconstruct_users(state).await?,
        };
        let foods = match state.foods.take() {
            Some(map) => map,
            None => self.reconstruct_foods(state).await?,
        };

        let records = self.fetch_for_stage(EntityKind::FoodLog, state).await?;
        let mut logs = Vec::with_capacity(records.len());
        for record in &records {
            match self.transformer.food_log(record, &users, &foods) {
                Ok(log) => logs.push(log),
                Err(err) => state.note(EntityKind::FoodLog, &err),
            }
        }
        state.users = Some(users);
        state.foods = Some(foods);

        let logs = self.migrate_photos(state, logs).await;
        let outcome = self.writer().write_all(&*self.records, logs).await;
        record_batch_failures(state, EntityKind::FoodLog, &outcome);
        state.stats.food_logs.migrated = outcome.written.len();
        Ok(())
    }

    /// Moves every attached photo, at most `concurrency` at a time. Failed
    /// transfers keep the legacy URL and are reported as warnings.
    async fn migrate_photos(&self, state: &mut RunState, logs: Vec<TargetFoodLog>) -> Vec<TargetFoodLog> {
        let results: Vec<(TargetFoodLog, Option<AssetOutcome>)> = stream::iter(logs)
            .map(|mut log| async move {
                let Some(source_url) = log.photo_url.clone() else {
                    return (log, None);
                };
                let outcome = self.assets.migrate(&source_url, &asset_name(&log.legacy_id, &source_url)).await;
                log.photo_url = Some(outcome.url().to_owned());
                (log, Some(outcome))
            })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut logs = Vec::with_capacity(results.len());
        for (log, outcome) in results {
            if let Some(AssetOutcome::Fallback { url, reason }) = outcome {
                let err = MigrationError::AssetMigrationFailure { legacy_id: log.legacy_id.clone(), url, reason };
                state.note(EntityKind::FoodLog, &err);
            }
            logs.push(log);
        }
        logs
    }

    async fn reconstruct_users(&self, state: &mut RunState) -> Result<IdentityMap, MigrationError> {
        let legacy = self.fetch(EntityKind::User).await?;
        let identities = self
            .identities
            .list_identities()
            .await
            .map_err(|e| {
                MigrationError::target_unavailable("rebuilding user identity map: listing target identities", e)
            })?;
        let map = reconstruct_user_map(&legacy, &identities);
        info!(legacy = legacy.len(), matched = map.len(), "Reconstructed user identity map");
        state.reconstructed.push(EntityKind::User);
        Ok(map)
    }

    async fn reconstruct_foods(&self, state: &mut RunState) -> Result<IdentityMap, MigrationError> {
        let legacy = self.fetch(EntityKind::Food).await?;
        let stored = within(self.settings.timeout, self.records.list_food_keys())
            .await
            .map_err(|e| {
                MigrationError::target_unavailable("rebuilding food identity map: listing stored foods", e)
            })?;
        let map = reconstruct_food_map(&legacy, &stored, &self.transformer);
        info!(legacy = legacy.len(), matched = map.len(), "Reconstructed food identity map");
        state.reconstructed.push(EntityKind::Food);
        Ok(map)
    }

    fn writer(&self) -> BatchWriter {
        BatchWriter::new(self.settings.batch_size, self.settings.concurrency, self.settings.timeout)
    }
}

fn record_batch_failures<T>(state: &mut RunState, kind: EntityKind, outcome: &BatchOutcome<T>) {
    for failure in &outcome.failures {
        let size = failure.legacy_ids.len();
        for legacy_id in &failure.legacy_ids {
            let err = MigrationError::BatchWriteFailure {
                kind,
                legacy_id: legacy_id.clone(),
                batch: failure.index,
                size,
                reason: failure.error.to_string(),
            };
            state.note(kind, &err);
        }
    }
}

fn abort(state: RunState, error: MigrationError) -> Aborted {
    error!(%error, "Migration aborted");
    let report = state.finish(Some(error.to_string()));
    Aborted { error, report: Box::new(report) }
}
