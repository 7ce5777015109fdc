//! Read-side view of a store for the analytics consumers.
//!
//! Migrated data wins: the normalized keys are read first and the legacy
//! candidate keys are only consulted when no migration has been persisted.
//! Items that fail to parse are skipped and counted, never fatal.

use crate::analytics::{aggregate_auto, chapter_history, ChapterHistoryEntry, ChapterStat};
use crate::error::Result;
use crate::model::{MigratedTest, TestSummary, Word, WordPerformance};
use crate::performance::PerformanceIndex;
use crate::store::keys::{NORMALIZED_TESTS_KEY, NORMALIZED_WORDS_KEY};
use crate::store::{KeyValueStore, LegacyCategory, LegacyRecordLocator};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub words: Vec<Word>,
    pub tests: Vec<TestSummary>,
    pub performance: Vec<WordPerformance>,
    /// Items present in the store that could not be parsed
    pub skipped: usize,
}

impl Snapshot {
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        let mut snapshot = Snapshot::default();

        snapshot.words = match store.get(NORMALIZED_WORDS_KEY)? {
            Some(value) => snapshot.parse_items("word", &value),
            None => snapshot.legacy_items(store, LegacyCategory::Words)?,
        };

        snapshot.tests = match store.get(NORMALIZED_TESTS_KEY)? {
            Some(value) => snapshot
                .parse_items::<MigratedTest>("migrated test", &value)
                .iter()
                .map(MigratedTest::to_summary)
                .collect(),
            None => snapshot.legacy_items(store, LegacyCategory::Tests)?,
        };

        snapshot.performance = snapshot.legacy_items(store, LegacyCategory::Performance)?;

        debug!(
            words = snapshot.words.len(),
            tests = snapshot.tests.len(),
            performance = snapshot.performance.len(),
            skipped = snapshot.skipped,
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn performance_index(&self) -> PerformanceIndex {
        PerformanceIndex::build(&self.performance)
    }

    /// Ordered chapter statistics, word-centric when attempt records exist
    pub fn chapter_stats(&self) -> Vec<ChapterStat> {
        aggregate_auto(&self.words, &self.tests, &self.performance_index())
    }

    pub fn chapter_history(&self, chapter: &str) -> Vec<ChapterHistoryEntry> {
        chapter_history(&self.tests, chapter)
    }

    fn legacy_items<S, T>(&mut self, store: &S, category: LegacyCategory) -> Result<Vec<T>>
    where
        S: KeyValueStore + ?Sized,
        T: DeserializeOwned,
    {
        Ok(match LegacyRecordLocator::locate(store, category)? {
            Some(record) => self.parse_items(record.key, &record.value),
            None => Vec::new(),
        })
    }

    fn parse_items<T: DeserializeOwned>(&mut self, source: &str, value: &Value) -> Vec<T> {
        let Some(items) = value.as_array() else {
            warn!(source, "expected a list, ignoring");
            self.skipped += 1;
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(source, error = %e, "skipping unreadable item");
                    self.skipped += 1;
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AggregationMode;
    use crate::migration::{LegacyMigrator, MigrationOptions};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn legacy_store() -> MemoryStore {
        MemoryStore::with_entries([
            (
                "vocabularyWords",
                json!([
                    {"id": 1, "english": "cat", "italian": "gatto", "chapter": "1"},
                    {"id": 2, "english": "dog", "italian": "cane", "chapter": "1"},
                    {"id": 3, "english": "red", "italian": "rosso", "chapter": "2"},
                    {"id": 4}
                ]),
            ),
            (
                "testHistory",
                json!([
                    {
                        "id": "t1",
                        "timestamp": "2024-03-02T09:00:00Z",
                        "totalWords": 2,
                        "correctWords": 1,
                        "incorrectWords": 1,
                        "chapterStats": {"1": {"correctWords": 1, "incorrectWords": 1, "percentage": 50}}
                    },
                    {"id": "t2"}
                ]),
            ),
        ])
    }

    #[test]
    fn legacy_keys_are_read_when_nothing_migrated() {
        let snapshot = Snapshot::load(&legacy_store()).unwrap();

        // the id-only word still parses; only the timestamp-less test is skipped
        assert_eq!(snapshot.words.len(), 4);
        assert_eq!(snapshot.tests.len(), 1);
        assert_eq!(snapshot.skipped, 1);

        let stats = snapshot.chapter_stats();
        assert_eq!(stats[0].chapter, "1");
        assert_eq!(stats[0].mode, AggregationMode::TestCentric);
        assert_eq!(stats[0].precision, 50.0);
    }

    #[test]
    fn normalized_keys_take_precedence() {
        let mut store = legacy_store();
        LegacyMigrator::new(&mut store, MigrationOptions::default())
            .migrate()
            .unwrap();

        let snapshot = Snapshot::load(&store).unwrap();

        // the empty word was rejected by the migration
        assert_eq!(snapshot.words.len(), 3);
        assert_eq!(snapshot.tests.len(), 1);
        assert_eq!(snapshot.tests[0].id, "migrated_t1");
        assert_eq!(snapshot.chapter_history("1").len(), 1);
    }

    #[test]
    fn empty_store_gives_empty_snapshot() {
        let snapshot = Snapshot::load(&MemoryStore::new()).unwrap();
        assert!(snapshot.words.is_empty());
        assert!(snapshot.chapter_stats().is_empty());
    }
}
