//! One-shot migration of legacy aggregate records into detailed responses.
//!
//! The run is partial-success: a malformed word or test is recorded in the
//! report and skipped. Only a failed read of the legacy data (or a failed
//! write) aborts, and then the error carries the report stamped with its end
//! time.
//!
//! The migrator does not deduplicate across runs. Running it twice against
//! the same legacy blobs writes the same normalized words but a second copy
//! of every test; callers gate invocation, see [`gate::run_once`].

pub mod estimate;
pub mod gate;
pub mod normalize;
pub mod report;

pub use estimate::{EstimationMode, Estimator, LegacyWordStats, DEFAULT_RESPONSE_MS};
pub use gate::{run_once, GateOutcome};
pub use report::{MigrationReport, TestQuality};

use crate::catalog::CatalogProjection;
use crate::error::{Error, Result};
use crate::model::{DetailedWordResponse, MigratedTest, TestSummary, Word, WordPerformance};
use crate::performance::PerformanceIndex;
use crate::store::keys::{
    backup_key, LAST_REPORT_KEY, NORMALIZED_TESTS_KEY, NORMALIZED_WORDS_KEY,
};
use crate::store::{KeyValueStore, LegacyCategory, LegacyRecordLocator, LocatedRecord};
use chrono::{DateTime, Utc};
use estimate::{rank_candidates, word_difficulty, HistoryBook};
use normalize::{infer_difficulty, infer_test_type, map_difficulty, map_test_type, normalize_word};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Knobs for a migration run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MigrationOptions {
    pub estimation: EstimationMode,
    pub default_response_ms: u64,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            estimation: EstimationMode::Deterministic,
            default_response_ms: DEFAULT_RESPONSE_MS,
        }
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub words: Vec<Word>,
    pub tests: Vec<MigratedTest>,
    pub report: MigrationReport,
    pub backup_key: String,
}

/// Located legacy blobs, one per category at most
#[derive(Debug, Default)]
struct LegacySnapshot {
    words: Option<LocatedRecord>,
    tests: Option<LocatedRecord>,
    stats: Option<LocatedRecord>,
    performance: Option<LocatedRecord>,
}

impl LegacySnapshot {
    fn read<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        let snapshot = Self {
            words: LegacyRecordLocator::locate(store, LegacyCategory::Words)?,
            tests: LegacyRecordLocator::locate(store, LegacyCategory::Tests)?,
            stats: LegacyRecordLocator::locate(store, LegacyCategory::AggregateStats)?,
            performance: LegacyRecordLocator::locate(store, LegacyCategory::Performance)?,
        };
        for record in [&snapshot.words, &snapshot.tests, &snapshot.performance]
            .into_iter()
            .flatten()
        {
            if !record.value.is_array() {
                return Err(Error::LegacyShape {
                    key: record.key.to_string(),
                    message: "expected a list".to_string(),
                });
            }
        }
        if let Some(record) = &snapshot.stats {
            if !record.value.is_object() {
                return Err(Error::LegacyShape {
                    key: record.key.to_string(),
                    message: "expected a map of word ids".to_string(),
                });
            }
        }
        Ok(snapshot)
    }

    fn items(record: &Option<LocatedRecord>) -> &[Value] {
        record
            .as_ref()
            .and_then(|r| r.value.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn backup(&self, created_at: DateTime<Utc>) -> Value {
        let mut sources = Map::new();
        for record in [&self.words, &self.tests, &self.stats, &self.performance]
            .into_iter()
            .flatten()
        {
            sources.insert(
                record.category.to_string(),
                json!({ "key": record.key, "value": record.raw }),
            );
        }
        json!({ "createdAt": created_at, "sources": sources })
    }
}

pub struct LegacyMigrator<'s, S: KeyValueStore + ?Sized> {
    store: &'s mut S,
    options: MigrationOptions,
}

impl<'s, S: KeyValueStore + ?Sized> LegacyMigrator<'s, S> {
    pub fn new(store: &'s mut S, options: MigrationOptions) -> Self {
        Self { store, options }
    }

    /// Run the migration. Backup is written before any normalized data.
    pub fn migrate(&mut self) -> Result<MigrationOutcome> {
        let started = Utc::now();
        let mut report = MigrationReport::begin(started);
        info!(estimation = ?self.options.estimation, "starting legacy migration");

        let legacy = match LegacySnapshot::read(&*self.store) {
            Ok(legacy) => legacy,
            Err(e) => return Err(report.abort(e, Utc::now())),
        };

        let words = Self::migrate_words(&legacy, &mut report);
        let performance = Self::read_performance(&legacy, &mut report);
        let index = PerformanceIndex::build(&performance);
        let histories = HistoryBook::new(&index, Self::read_word_stats(&legacy, &mut report));
        let catalog = CatalogProjection::project(&words);
        let mut estimator = Estimator::new(self.options.estimation, self.options.default_response_ms);

        let mut tests = Vec::new();
        let mut scores = Vec::new();
        for raw in LegacySnapshot::items(&legacy.tests) {
            let summary = match parse_test(raw).and_then(check_size) {
                Ok(summary) => summary,
                Err(e) => {
                    report.record_error(&e);
                    continue;
                }
            };
            let (test, quality) = reconstruct(&summary, &catalog, &histories, &mut estimator);
            report.absorb(&quality);
            report.tests_processed += 1;
            scores.push(quality.score);
            tests.push(test);
        }

        let backup_key = backup_key(started.timestamp_millis());
        if let Err(e) = self.store.set(&backup_key, &legacy.backup(started)) {
            return Err(report.abort(e, Utc::now()));
        }
        debug!(key = %backup_key, "legacy backup written");

        report.finish(&scores, Utc::now());
        if let Err(e) = self.persist(&words, &tests, &report) {
            return Err(report.abort(e, Utc::now()));
        }

        info!(
            words = report.words_processed,
            tests = report.tests_processed,
            errors = report.errors_encountered.len(),
            estimations = report.estimations_used,
            quality = report.data_quality_score,
            "legacy migration finished"
        );

        Ok(MigrationOutcome {
            words,
            tests,
            report,
            backup_key,
        })
    }

    fn persist(&mut self, words: &[Word], tests: &[MigratedTest], report: &MigrationReport) -> Result<()> {
        self.store
            .set(NORMALIZED_WORDS_KEY, &serde_json::to_value(words)?)?;
        self.store
            .set(NORMALIZED_TESTS_KEY, &serde_json::to_value(tests)?)?;
        self.store.set(LAST_REPORT_KEY, &serde_json::to_value(report)?)?;
        Ok(())
    }

    fn migrate_words(legacy: &LegacySnapshot, report: &mut MigrationReport) -> Vec<Word> {
        let mut seen = HashSet::new();
        let mut words = Vec::new();
        for raw in LegacySnapshot::items(&legacy.words) {
            match normalize_word(raw) {
                Ok(word) if !seen.insert(word.id.clone()) => {
                    report
                        .warnings
                        .push(format!("word {}: duplicate id, later copy ignored", word.id));
                }
                Ok(word) => {
                    report.words_processed += 1;
                    words.push(word);
                }
                Err(e) => report.record_error(&e),
            }
        }
        words
    }

    fn read_performance(legacy: &LegacySnapshot, report: &mut MigrationReport) -> Vec<WordPerformance> {
        LegacySnapshot::items(&legacy.performance)
            .iter()
            .filter_map(|raw| {
                serde_json::from_value::<WordPerformance>(raw.clone())
                    .map_err(|e| {
                        let identity = raw
                            .get("wordId")
                            .and_then(crate::model::id_from_value)
                            .unwrap_or_else(|| "<missing wordId>".to_string());
                        Error::invalid_record("performance", identity, e.to_string())
                    })
                    .map_err(|e| report.record_error(&e))
                    .ok()
            })
            .collect()
    }

    fn read_word_stats(
        legacy: &LegacySnapshot,
        report: &mut MigrationReport,
    ) -> HashMap<String, LegacyWordStats> {
        let Some(map) = legacy.stats.as_ref().and_then(|r| r.value.as_object()) else {
            return HashMap::new();
        };
        map.iter()
            .filter_map(|(id, raw)| {
                match serde_json::from_value::<LegacyWordStats>(raw.clone()) {
                    Ok(stats) => Some((id.clone(), stats)),
                    Err(e) => {
                        report.record_error(&Error::invalid_record("word stats", id.clone(), e.to_string()));
                        None
                    }
                }
            })
            .collect()
    }
}

fn parse_test(raw: &Value) -> Result<TestSummary> {
    serde_json::from_value::<TestSummary>(raw.clone()).map_err(|e| {
        let identity = raw
            .get("id")
            .and_then(crate::model::id_from_value)
            .unwrap_or_else(|| "<missing id>".to_string());
        Error::invalid_record("test", identity, e.to_string())
    })
}

/// A test claiming more answers than this is treated as corrupt
pub const MAX_TEST_WORDS: u32 = 10_000;

fn check_size(test: TestSummary) -> Result<TestSummary> {
    if test.total_words > MAX_TEST_WORDS {
        return Err(Error::invalid_record(
            "test",
            test.id,
            format!("totalWords {} exceeds {MAX_TEST_WORDS}", test.total_words),
        ));
    }
    Ok(test)
}

/// Rebuild one legacy test as a detailed record and grade how much of it is real
fn reconstruct(
    test: &TestSummary,
    catalog: &CatalogProjection<'_>,
    histories: &HistoryBook<'_>,
    estimator: &mut Estimator,
) -> (MigratedTest, TestQuality) {
    let mut quality = TestQuality::new(&test.id);

    let test_type = map_test_type(test.test_type.as_deref()).unwrap_or_else(|| infer_test_type(test));
    let difficulty =
        map_difficulty(test.difficulty.as_deref()).unwrap_or_else(|| infer_difficulty(test.total_words));

    let responses: Vec<DetailedWordResponse> = match exact_records(test) {
        Some(responses) => {
            if responses.iter().any(|r| r.time_response == 0) {
                quality.missing_timing();
            }
            responses
                .into_iter()
                .map(|mut r| {
                    let history = histories.history(&r.word_id);
                    r.current_difficulty = word_difficulty(catalog.word(&r.word_id), &history);
                    r
                })
                .collect()
        }
        None => {
            quality.missing_exact_data();
            let timing: HashMap<&str, u64> = test
                .word_times
                .iter()
                .flatten()
                .filter_map(|t| t.time_spent.filter(|ms| *ms > 0).map(|ms| (t.word_id.as_str(), ms)))
                .collect();
            if timing.is_empty() {
                quality.missing_timing();
            }
            warn!(test = %test.id, "no per-word detail, estimating responses");
            estimate_responses(test, catalog, histories, estimator, &timing)
        }
    };

    if responses.len() != test.total_words as usize {
        quality.count_mismatch(responses.len(), test.total_words);
    }
    let reconstructed_hints: u32 = responses.iter().map(|r| r.hints_used).sum();
    if reconstructed_hints.abs_diff(test.hints_used) > 1 {
        quality.hint_mismatch(reconstructed_hints, test.hints_used);
    }

    let migrated = MigratedTest {
        id: format!("migrated_{}", test.id),
        legacy_id: test.id.clone(),
        timestamp: test.timestamp,
        test_type,
        difficulty,
        total_words: test.total_words,
        correct_words: test.correct_words,
        incorrect_words: test.incorrect_words,
        hints_used: test.hints_used,
        chapter_stats: test.chapter_stats.clone(),
        responses,
        has_estimations: quality.estimated,
        quality_score: quality.score,
        warnings: quality.warnings.clone(),
    };
    (migrated, quality)
}

/// Verbatim responses when every `wordTimes` entry carries an outcome
fn exact_records(test: &TestSummary) -> Option<Vec<DetailedWordResponse>> {
    let records = test.word_times.as_ref().filter(|t| !t.is_empty())?;
    records
        .iter()
        .map(|record| {
            Some(DetailedWordResponse {
                word_id: record.word_id.clone(),
                time_response: record.time_spent.unwrap_or(0),
                hints_used: record.hints(),
                current_difficulty: crate::model::Difficulty::Medium,
                is_correct: record.is_correct?,
                timestamp: test.timestamp,
                estimated: false,
            })
        })
        .collect()
}

/// Shared context for the responses of one estimated test
struct ResponseBuilder<'t> {
    test: &'t TestSummary,
    histories: &'t HistoryBook<'t>,
    timing: &'t HashMap<&'t str, u64>,
}

impl ResponseBuilder<'_> {
    fn respond(
        &self,
        estimator: &mut Estimator,
        word_id: &str,
        word: Option<&Word>,
        correct: bool,
    ) -> DetailedWordResponse {
        let history = self.histories.history(word_id);
        let time_response = match self.timing.get(word_id) {
            Some(ms) => *ms,
            None => estimator.response_time(&history, correct),
        };
        DetailedWordResponse {
            word_id: word_id.to_string(),
            time_response,
            hints_used: estimator.hints(&history, correct),
            current_difficulty: word_difficulty(word, &history),
            is_correct: correct,
            timestamp: self.test.timestamp,
            estimated: true,
        }
    }
}

fn estimate_responses(
    test: &TestSummary,
    catalog: &CatalogProjection<'_>,
    histories: &HistoryBook<'_>,
    estimator: &mut Estimator,
    timing: &HashMap<&str, u64>,
) -> Vec<DetailedWordResponse> {
    let builder = ResponseBuilder {
        test,
        histories,
        timing,
    };
    let mut responses = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    // Known-wrong words are facts; only their timing and hints are estimated
    for word_ref in test.wrong_words.iter().flatten() {
        let word_id = word_ref.0.as_str();
        if used.insert(word_id) {
            responses.push(builder.respond(estimator, word_id, catalog.word(word_id), false));
        }
    }
    let missing_incorrect = (test.incorrect_words as usize).saturating_sub(responses.len());

    let eligible = catalog_candidates(test, catalog).filter(|w| !used.contains(w.id.as_str()));
    let ranked = rank_candidates(eligible, histories);
    let picked = estimator.pick_correct(&ranked, test.correct_words as usize);

    for &i in &picked {
        let candidate = &ranked[i];
        responses.push(builder.respond(estimator, &candidate.word.id, Some(candidate.word), true));
    }

    // Unlisted wrong answers go to the least likely remaining candidates
    let fillers = (0..ranked.len())
        .rev()
        .filter(|i| !picked.contains(i))
        .take(missing_incorrect);
    for i in fillers {
        let candidate = &ranked[i];
        responses.push(builder.respond(estimator, &candidate.word.id, Some(candidate.word), false));
    }

    responses
}

/// Catalog words belonging to the chapters the test covered (all words when unknown)
fn catalog_candidates<'c, 'w>(
    test: &'c TestSummary,
    catalog: &'c CatalogProjection<'w>,
) -> Box<dyn Iterator<Item = &'w Word> + 'c> {
    if test.chapter_stats.is_empty() {
        Box::new(catalog.groups().flat_map(|g| g.words.iter().copied()))
    } else {
        Box::new(
            test.chapter_stats
                .keys()
                .filter_map(|chapter| catalog.chapter(chapter))
                .flat_map(|g| g.words.iter().copied()),
        )
    }
}
