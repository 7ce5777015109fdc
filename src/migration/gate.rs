//! Caller-side guard that lets a store be migrated at most once.

use super::{LegacyMigrator, MigrationOptions, MigrationOutcome};
use crate::error::Result;
use crate::store::keys::MIGRATION_FLAG_KEY;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Value persisted under the completion flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionFlag {
    pub completed_at: DateTime<Utc>,
    pub backup_key: String,
}

#[derive(Debug, Clone)]
pub enum GateOutcome {
    Migrated(Box<MigrationOutcome>),
    AlreadyMigrated(CompletionFlag),
}

/// Read the completion flag, if a previous run left one
pub fn completion<S: KeyValueStore>(store: &S) -> Result<Option<CompletionFlag>> {
    store.get_as(MIGRATION_FLAG_KEY)
}

/// Migrate unless the store is flagged as done; `force` ignores the flag.
///
/// The flag is written only after the migrator finished, so a failed run
/// can simply be retried.
pub fn run_once<S: KeyValueStore>(
    store: &mut S,
    options: MigrationOptions,
    force: bool,
) -> Result<GateOutcome> {
    if !force {
        if let Some(flag) = completion(&*store)? {
            info!(completed_at = %flag.completed_at, "store already migrated");
            return Ok(GateOutcome::AlreadyMigrated(flag));
        }
    }

    let outcome = LegacyMigrator::new(store, options).migrate()?;
    let flag = CompletionFlag {
        completed_at: outcome.report.end_time.unwrap_or_else(Utc::now),
        backup_key: outcome.backup_key.clone(),
    };
    store.set(MIGRATION_FLAG_KEY, &serde_json::to_value(&flag)?)?;

    Ok(GateOutcome::Migrated(Box::new(outcome)))
}
