//! Per-chapter performance aggregation.
//!
//! Two modes exist because the inputs differ in fidelity:
//!
//! - **word-centric**: per-word attempt histories are available, so precision
//!   and efficiency are computed exactly from individual answers;
//! - **test-centric**: only legacy aggregate summaries exist. Chapter counters
//!   are exact, but hints were recorded test-wide and have to be spread over
//!   chapters in proportion to their share of answers. That allocation is an
//!   approximation the source data cannot improve on.
//!
//! Both modes produce the same [`ChapterStat`] shape and the same ordering:
//! tested chapters first by descending efficiency (ties by chapter name),
//! then untested chapters by name.

use crate::catalog::{CatalogProjection, ChapterGroup};
use crate::model::{TestSummary, Word};
use crate::performance::PerformanceIndex;
use crate::util::{mean, percentage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "kebab-case")]
pub enum AggregationMode {
    WordCentric,
    TestCentric,
}

/// Where the answer data for an aggregation comes from
#[derive(Debug, Clone, Copy)]
pub enum AggregationSource<'a> {
    Performance(&'a PerformanceIndex),
    Tests(&'a [TestSummary]),
}

/// Derived statistics for one chapter; always recomputed, never stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterStat {
    pub chapter: String,
    pub mode: AggregationMode,
    pub total_words: usize,
    pub tested_words: usize,
    pub untested_words: usize,
    pub learned_words: usize,
    pub difficult_words: usize,
    pub correct_answers: u64,
    pub incorrect_answers: u64,
    /// Correct answers that needed hints; estimated in test-centric mode
    pub hinted_answers: f64,
    /// Tests (test-centric) or attempts (word-centric) that touched the chapter
    pub sessions: usize,
    pub precision: f64,
    pub hints_percentage: f64,
    pub efficiency: f64,
    pub completion_rate: f64,
    pub difficulty_rate: f64,
    pub untested_percentage: f64,
    pub first_tested: Option<DateTime<Utc>>,
    pub last_tested: Option<DateTime<Utc>>,
}

impl ChapterStat {
    fn empty(group: &ChapterGroup<'_>, mode: AggregationMode) -> Self {
        let total = group.total();
        Self {
            chapter: group.chapter.clone(),
            mode,
            total_words: total,
            tested_words: 0,
            untested_words: total,
            learned_words: group.learned,
            difficult_words: group.difficult,
            correct_answers: 0,
            incorrect_answers: 0,
            hinted_answers: 0.0,
            sessions: 0,
            precision: 0.0,
            hints_percentage: 0.0,
            efficiency: 0.0,
            completion_rate: percentage(group.learned as f64, total as f64),
            difficulty_rate: percentage(group.difficult as f64, total as f64),
            untested_percentage: if total > 0 { 100.0 } else { 0.0 },
            first_tested: None,
            last_tested: None,
        }
    }

    pub fn is_tested(&self) -> bool {
        self.tested_words > 0
    }

    pub fn total_answers(&self) -> u64 {
        self.correct_answers.saturating_add(self.incorrect_answers)
    }

    fn set_tested(&mut self, tested: usize) {
        self.tested_words = tested.min(self.total_words);
        self.untested_words = self.total_words - self.tested_words;
        self.untested_percentage =
            percentage(self.untested_words as f64, self.total_words as f64);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.first_tested = Some(self.first_tested.map_or(at, |t| t.min(at)));
        self.last_tested = Some(self.last_tested.map_or(at, |t| t.max(at)));
    }
}

/// Aggregate every catalog chapter from `source`, ordered for display
pub fn aggregate(words: &[Word], source: AggregationSource<'_>) -> Vec<ChapterStat> {
    let catalog = CatalogProjection::project(words);

    let mut stats: Vec<ChapterStat> = match source {
        AggregationSource::Performance(index) => catalog
            .groups()
            .map(|group| word_centric(group, index))
            .collect(),
        AggregationSource::Tests(tests) => {
            let totals = accumulate_tests(tests);
            for chapter in totals.keys() {
                if catalog.chapter(chapter).is_none() {
                    debug!(chapter = %chapter, "legacy chapter has no catalog words, skipped");
                }
            }
            catalog
                .groups()
                .map(|group| test_centric(group, totals.get(&group.chapter)))
                .collect()
        }
    };

    sort_chapters(&mut stats);
    stats
}

/// Word-centric when the index holds any attempt, test-centric otherwise
pub fn aggregate_auto(
    words: &[Word],
    tests: &[TestSummary],
    index: &PerformanceIndex,
) -> Vec<ChapterStat> {
    if index.is_empty() {
        aggregate(words, AggregationSource::Tests(tests))
    } else {
        aggregate(words, AggregationSource::Performance(index))
    }
}

fn word_centric(group: &ChapterGroup<'_>, index: &PerformanceIndex) -> ChapterStat {
    let mut stat = ChapterStat::empty(group, AggregationMode::WordCentric);
    let mut precisions = Vec::new();
    let mut efficiencies = Vec::new();
    let mut hinted = 0usize;

    for insight in group.words.iter().filter_map(|w| index.insight(&w.id)) {
        precisions.push(insight.precision);
        efficiencies.push(insight.efficiency);
        hinted += insight.hinted_correct;
        stat.correct_answers += insight.correct as u64;
        stat.incorrect_answers += (insight.attempts - insight.correct) as u64;
        stat.sessions += insight.attempts;
        stat.touch(insight.first_attempt);
        stat.touch(insight.last_attempt);
    }

    stat.set_tested(precisions.len());
    stat.hinted_answers = hinted as f64;
    stat.precision = mean(&precisions).unwrap_or(0.0);
    stat.efficiency = mean(&efficiencies).unwrap_or(0.0);
    stat.hints_percentage = percentage(hinted as f64, stat.correct_answers as f64);
    stat
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LegacyChapterTotals {
    correct: u64,
    incorrect: u64,
    hints: f64,
    tests: usize,
    largest_test: u64,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

fn accumulate_tests(tests: &[TestSummary]) -> HashMap<String, LegacyChapterTotals> {
    let mut totals: HashMap<String, LegacyChapterTotals> = HashMap::new();

    for test in tests {
        let hints = hint_allocation(test);
        for (chapter, breakdown) in &test.chapter_stats {
            let entry = totals.entry(chapter.clone()).or_default();
            entry.correct = entry.correct.saturating_add(breakdown.correct_words.into());
            entry.incorrect = entry.incorrect.saturating_add(breakdown.incorrect_words.into());
            entry.hints += hints.get(chapter).copied().unwrap_or(0.0);
            entry.tests += 1;
            entry.largest_test = entry.largest_test.max(breakdown.answers());
            entry.first = Some(entry.first.map_or(test.timestamp, |t| t.min(test.timestamp)));
            entry.last = Some(entry.last.map_or(test.timestamp, |t| t.max(test.timestamp)));
        }
    }

    totals
}

/// Spread a test's total `hintsUsed` over its chapters by share of answers.
///
/// Empty when the test recorded no chapter answers at all.
pub fn hint_allocation(test: &TestSummary) -> BTreeMap<String, f64> {
    let total_answers = test
        .chapter_stats
        .values()
        .fold(0u64, |sum, b| sum.saturating_add(b.answers()));
    if total_answers == 0 {
        return BTreeMap::new();
    }

    test.chapter_stats
        .iter()
        .map(|(chapter, breakdown)| {
            let share = test.hints_used as f64 * breakdown.answers() as f64 / total_answers as f64;
            (chapter.clone(), share)
        })
        .collect()
}

fn test_centric(group: &ChapterGroup<'_>, totals: Option<&LegacyChapterTotals>) -> ChapterStat {
    let mut stat = ChapterStat::empty(group, AggregationMode::TestCentric);
    let Some(totals) = totals else {
        return stat;
    };

    stat.correct_answers = totals.correct;
    stat.incorrect_answers = totals.incorrect;
    stat.sessions = totals.tests;
    stat.first_tested = totals.first;
    stat.last_tested = totals.last;
    // Which words a legacy test covered is unknown; the largest single test
    // bounds how many distinct words have been seen.
    stat.set_tested(usize::try_from(totals.largest_test).unwrap_or(usize::MAX));

    stat.precision = percentage(totals.correct as f64, stat.total_answers() as f64);
    stat.hinted_answers = totals.hints;
    stat.hints_percentage = percentage(totals.hints, totals.correct as f64);
    stat.efficiency = (stat.precision - stat.hints_percentage).max(0.0);
    stat
}

fn sort_chapters(stats: &mut [ChapterStat]) {
    stats.sort_by(|a, b| match (a.is_tested(), b.is_tested()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => b
            .efficiency
            .partial_cmp(&a.efficiency)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chapter.cmp(&b.chapter)),
        (false, false) => a.chapter.cmp(&b.chapter),
    });
}
