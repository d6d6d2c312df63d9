//! `run`: wire the real collaborators and execute the selected stages.

use std::sync::Arc;

use anyhow::Context;
use nutrilog_core::{MigrationConfig, MigrationReport, StageSet, clamp_batch_size};
use nutrilog_legacy::LegacyClient;
use nutrilog_migration::{AssetMigrator, Orchestrator, RunSettings, Transformer};
use nutrilog_target::{AuthAdminClient, BucketClient, PgRecordStore};

use crate::RunArgs;

pub(crate) async fn run(args: RunArgs) -> anyhow::Result<()> {
    let stages = StageSet::from_selectors(&args.stages)?;
    let mut config = MigrationConfig::from_env()?;
    if let Some(batch_size) = args.batch_size {
        config.tuning.batch_size = clamp_batch_size(batch_size);
    }
    if let Some(concurrency) = args.concurrency {
        config.tuning.concurrency = concurrency.max(1);
    }
    if let Some(fetch_limit) = args.fetch_limit {
        config.tuning.fetch_limit = fetch_limit.max(1);
    }
    tracing::info!(%stages, tuning = ?config.tuning, "Starting migration");

    let orchestrator = build(&config).await?;
    let (report, aborted) = match orchestrator.run(stages).await {
        Ok(report) => (report, None),
        Err(aborted) => (*aborted.report, Some(aborted.error)),
    };

    emit(&report, &args)?;
    if let Some(error) = aborted {
        return Err(error).context("migration aborted");
    }
    Ok(())
}

async fn build(config: &MigrationConfig) -> anyhow::Result<Orchestrator> {
    let timeout = config.tuning.timeout;
    let source = LegacyClient::new(&config.legacy, timeout)?;
    let identities = AuthAdminClient::new(&config.target, timeout)?;
    let blobs = BucketClient::new(&config.target, timeout)?;
    let records = PgRecordStore::connect(&config.target.database_url, timeout)
        .await
        .context("connecting to the target database")?;
    let assets = AssetMigrator::new(Arc::new(blobs), timeout)?;

    Ok(Orchestrator::new(
        Arc::new(source),
        Arc::new(identities),
        Arc::new(records),
        assets,
        Transformer::from_mode(config.tuning.brand_parsing),
        RunSettings::from(&config.tuning),
    ))
}

fn emit(report: &MigrationReport, args: &RunArgs) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }
    Ok(())
}
