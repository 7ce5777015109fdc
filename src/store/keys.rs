//! Storage key names, old and new.
//!
//! Over its lifetime the front-end stored the same logical collection under
//! several names. Each legacy category owns one prioritized candidate list;
//! lookup takes the first key holding a non-empty blob and never merges
//! across candidates.

use super::KeyValueStore;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;

pub const NORMALIZED_WORDS_KEY: &str = "normalized_words";
pub const NORMALIZED_TESTS_KEY: &str = "detailed_test_history";
pub const LAST_REPORT_KEY: &str = "last_migration_report";
pub const MIGRATION_FLAG_KEY: &str = "migration_completed";
pub const BACKUP_KEY_PREFIX: &str = "backup_legacy_";

/// Backup key for a migration started at `epoch_ms`
pub fn backup_key(epoch_ms: i64) -> String {
    format!("{BACKUP_KEY_PREFIX}{epoch_ms}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LegacyCategory {
    Words,
    Tests,
    AggregateStats,
    Performance,
}

impl LegacyCategory {
    pub const ALL: [LegacyCategory; 4] = [
        LegacyCategory::Words,
        LegacyCategory::Tests,
        LegacyCategory::AggregateStats,
        LegacyCategory::Performance,
    ];

    /// Historical key names, most recent first
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            LegacyCategory::Words => &[
                "vocabularyWords",
                "vocabulary_words",
                "words",
                "vocabulary",
            ],
            LegacyCategory::Tests => &["testHistory", "test_history", "testResults", "tests"],
            LegacyCategory::AggregateStats => &["wordStats", "word_stats", "vocabularyStats"],
            LegacyCategory::Performance => {
                &["wordPerformance", "word_performance", "performanceData"]
            }
        }
    }
}

/// A legacy blob and the key it was found under
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRecord {
    pub category: LegacyCategory,
    pub key: &'static str,
    /// Decoded blob
    pub value: Value,
    /// The blob exactly as stored
    pub raw: Value,
}

pub struct LegacyRecordLocator;

impl LegacyRecordLocator {
    /// First non-empty blob among the category's candidate keys.
    ///
    /// Store errors propagate: a failed lookup must not be mistaken for
    /// "no data under this key".
    pub fn locate<S: KeyValueStore + ?Sized>(
        store: &S,
        category: LegacyCategory,
    ) -> Result<Option<LocatedRecord>> {
        for key in category.candidates() {
            let Some(value) = store.get(key)? else {
                continue;
            };
            let raw = value.clone();
            let value = unwrap_stringified(value);
            if is_empty_blob(&value) {
                debug!(%category, key, "skipping empty legacy key");
                continue;
            }
            debug!(%category, key, "located legacy data");
            return Ok(Some(LocatedRecord {
                category,
                key,
                value,
                raw,
            }));
        }
        Ok(None)
    }
}

pub fn is_empty_blob(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Browser storage kept collections as JSON text; decode such strings
fn unwrap_stringified(value: Value) -> Value {
    if let Value::String(text) = &value {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(inner) = serde_json::from_str::<Value>(text) {
                return inner;
            }
        }
    }
    value
}
