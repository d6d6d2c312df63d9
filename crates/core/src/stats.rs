//! Run statistics and the end-of-run report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;

/// Counters for one entity type.
///
/// `created` and `existing` are only meaningful for users, where the writer
/// distinguishes fresh identities from reused ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub total: usize,
    pub migrated: usize,
    pub created: usize,
    pub existing: usize,
    pub errors: usize,
}

/// Failure category of a recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    TargetUnavailable,
    MissingRequiredField,
    UnresolvedReference,
    BatchWriteFailure,
    IdentityWriteFailure,
    AssetMigrationFailure,
    FetchCapReached,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::SourceUnavailable => "source_unavailable",
            Self::TargetUnavailable => "target_unavailable",
            Self::MissingRequiredField => "missing_required_field",
            Self::UnresolvedReference => "unresolved_reference",
            Self::BatchWriteFailure => "batch_write_failure",
            Self::IdentityWriteFailure => "identity_write_failure",
            Self::AssetMigrationFailure => "asset_migration_failure",
            Self::FetchCapReached => "fetch_cap_reached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The record was not migrated.
    Error,
    /// The record was migrated in a degraded form.
    Warning,
}

/// One entry of the ordered error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub stage: EntityKind,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl ErrorRecord {
    #[must_use]
    pub fn error(stage: EntityKind, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { stage, kind, severity: Severity::Error, message: message.into(), context: BTreeMap::new() }
    }

    #[must_use]
    pub fn warning(stage: EntityKind, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            severity: Severity::Warning,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }

    /// Legacy identifier of the affected record, if known.
    #[must_use]
    pub fn legacy_id(&self) -> Option<&str> {
        self.context.get("legacy_id").map(String::as_str)
    }
}

/// Mutable statistics for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationStats {
    pub users: EntityStats,
    pub foods: EntityStats,
    pub food_logs: EntityStats,
    pub errors: Vec<ErrorRecord>,
}

impl MigrationStats {
    #[must_use]
    pub const fn entity(&self, kind: EntityKind) -> &EntityStats {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Food => &self.foods,
            EntityKind::FoodLog => &self.food_logs,
        }
    }

    pub fn entity_mut(&mut self, kind: EntityKind) -> &mut EntityStats {
        match kind {
            EntityKind::User => &mut self.users,
            EntityKind::Food => &mut self.foods,
            EntityKind::FoodLog => &mut self.food_logs,
        }
    }

    /// Appends an error entry. Error-severity entries count against the stage.
    pub fn record(&mut self, record: ErrorRecord) {
        if record.severity == Severity::Error {
            let stats = self.entity_mut(record.stage);
            stats.errors = stats.errors.saturating_add(1);
        }
        self.errors.push(record);
    }

    /// Entries of the given stage, in recording order.
    pub fn errors_for(&self, stage: EntityKind) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(move |e| e.stage == stage)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.errors.iter().filter(|e| e.severity == Severity::Warning).count()
    }
}

/// End-of-run summary, emitted whether or not the run completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Stages that were selected and executed, in order.
    pub stages: Vec<EntityKind>,
    /// Identity maps rebuilt from the target store instead of a stage run.
    pub reconstructed: Vec<EntityKind>,
    pub stats: MigrationStats,
    /// Set when the run stopped early on a fatal error.
    pub aborted: Option<String>,
}

impl MigrationReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at.signed_duration_since(self.started_at);
        let stages: Vec<&str> = self.stages.iter().map(|k| k.stage_name()).collect();
        writeln!(f, "Migration report")?;
        writeln!(f, "  stages:   {}", if stages.is_empty() { "-".to_owned() } else { stages.join(", ") })?;
        if !self.reconstructed.is_empty() {
            let rebuilt: Vec<&str> = self.reconstructed.iter().map(|k| k.stage_name()).collect();
            writeln!(f, "  rebuilt:  {} identity maps", rebuilt.join(", "))?;
        }
        writeln!(f, "  duration: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)?;
        writeln!(f)?;

        for kind in EntityKind::ALL {
            let s = self.stats.entity(kind);
            if kind == EntityKind::User {
                writeln!(
                    f,
                    "  {:<9} total={:<6} migrated={:<6} created={:<6} existing={:<6} errors={}",
                    kind.stage_name(),
                    s.total,
                    s.migrated,
                    s.created,
                    s.existing,
                    s.errors
                )?;
            } else {
                writeln!(
                    f,
                    "  {:<9} total={:<6} migrated={:<6} errors={}",
                    kind.stage_name(),
                    s.total,
                    s.migrated,
                    s.errors
                )?;
            }
        }

        if !self.stats.errors.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "Errors ({}, {} warnings):",
                self.stats.errors.len(),
                self.stats.warning_count()
            )?;
            for (n, e) in self.stats.errors.iter().enumerate() {
                let severity = match e.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warn",
                };
                write!(f, "  {:>4}. [{}] {} {}: {}", n + 1, e.stage, severity, e.kind.as_str(), e.message)?;
                if !e.context.is_empty() {
                    let ctx: Vec<String> =
                        e.context.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    write!(f, " ({})", ctx.join(", "))?;
                }
                writeln!(f)?;
            }
        }

        if let Some(reason) = &self.aborted {
            writeln!(f)?;
            writeln!(f, "Run aborted: {reason}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_stage_errors() {
        let mut stats = MigrationStats::default();
        stats.record(ErrorRecord::error(
            EntityKind::FoodLog,
            ErrorKind::UnresolvedReference,
            "food f1 not migrated",
        ));
        stats.record(ErrorRecord::warning(
            EntityKind::FoodLog,
            ErrorKind::AssetMigrationFailure,
            "photo kept at legacy url",
        ));
        assert_eq!(stats.food_logs.errors, 1);
        assert_eq!(stats.errors.len(), 2);
        assert_eq!(stats.warning_count(), 1);
        assert_eq!(stats.users.errors, 0);
    }

    #[test]
    fn report_lists_every_error_with_context() {
        let mut stats = MigrationStats::default();
        stats.users.total = 2;
        stats.users.migrated = 1;
        stats.users.created = 1;
        stats.record(
            ErrorRecord::error(EntityKind::User, ErrorKind::MissingRequiredField, "missing email")
                .with_context("legacy_id", "u2"),
        );
        let now = Utc::now();
        let report = MigrationReport {
            started_at: now,
            finished_at: now,
            stages: vec![EntityKind::User],
            reconstructed: vec![],
            stats,
            aborted: None,
        };
        let text = report.to_string();
        assert!(text.contains("users     total=2"));
        assert!(text.contains("created=1"));
        assert!(text.contains("missing_required_field: missing email (legacy_id=u2)"));
        assert!(report.is_complete());
    }

    #[test]
    fn report_serializes_error_kinds_in_snake_case() {
        let record = ErrorRecord::error(EntityKind::Food, ErrorKind::BatchWriteFailure, "timeout")
            .with_context("batch", "3");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "batch_write_failure");
        assert_eq!(json["stage"], "food");
        assert_eq!(json["context"]["batch"], "3");
    }
}
