//! Heuristics used to reconstruct per-word responses for legacy tests that
//! only recorded totals.
//!
//! Two modes are available. [`EstimationMode::Deterministic`] thresholds every
//! probability, so migrating identical data twice yields identical output.
//! [`EstimationMode::Seeded`] samples from a seeded RNG, which spreads hints
//! and correct answers more naturally while staying reproducible per seed.

use crate::model::{Difficulty, Word};
use crate::performance::PerformanceIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_RESPONSE_MS: u64 = 3000;

const INCORRECT_TIME_FACTOR: f64 = 1.4;
const CORRECT_TIME_FACTOR: f64 = 0.9;
const INCORRECT_HINT_FACTOR: f64 = 1.5;
const CORRECT_HINT_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimationMode {
    #[default]
    Deterministic,
    Seeded(u64),
}

/// Aggregate counters some legacy versions kept per word
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyWordStats {
    #[serde(alias = "correct")]
    pub correct_count: u32,
    #[serde(alias = "incorrect")]
    pub incorrect_count: u32,
    #[serde(alias = "hints")]
    pub hints_used: u32,
    #[serde(alias = "streak")]
    pub current_streak: u32,
    #[serde(alias = "avgTime", alias = "averageTimeMs")]
    pub average_time: Option<f64>,
}

/// What is known about a word's past, whatever the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordHistory {
    pub average_time_ms: Option<f64>,
    /// Fraction (0..=1) of answers that used hints
    pub hint_rate: f64,
    pub streak: u32,
    /// Percentage of correct answers, when any answer is known
    pub precision: Option<f64>,
}

/// Word histories drawn from attempt records first, legacy counters second
#[derive(Debug, Clone)]
pub struct HistoryBook<'a> {
    index: &'a PerformanceIndex,
    legacy: HashMap<String, LegacyWordStats>,
}

impl<'a> HistoryBook<'a> {
    pub fn new(index: &'a PerformanceIndex, legacy: HashMap<String, LegacyWordStats>) -> Self {
        Self { index, legacy }
    }

    pub fn history(&self, word_id: &str) -> WordHistory {
        if let Some(insight) = self.index.insight(word_id) {
            return WordHistory {
                average_time_ms: insight.average_time_ms,
                hint_rate: insight.hint_rate,
                streak: insight.current_streak,
                precision: Some(insight.precision),
            };
        }

        match self.legacy.get(word_id) {
            Some(stats) => {
                let answers = stats.correct_count + stats.incorrect_count;
                let (hint_rate, precision) = if answers > 0 {
                    (
                        (stats.hints_used as f64 / answers as f64).min(1.0),
                        Some(stats.correct_count as f64 / answers as f64 * 100.0),
                    )
                } else {
                    (0.0, None)
                };
                WordHistory {
                    average_time_ms: stats.average_time.filter(|t| *t > 0.0),
                    hint_rate,
                    streak: stats.current_streak,
                    precision,
                }
            }
            None => WordHistory::default(),
        }
    }
}

/// Likelihood (0.1..=0.9) that the word was answered correctly
pub fn correctness_probability(word: &Word, history: &WordHistory) -> f64 {
    let mut probability: f64 = 0.5;
    if history.streak > 2 {
        probability += 0.2;
    }
    if history.hint_rate > 0.5 {
        probability -= 0.1;
    }
    if word.learned {
        probability += 0.3;
    }
    if word.difficult {
        probability -= 0.2;
    }
    probability.clamp(0.1, 0.9)
}

/// Difficulty of a word at the time of the test, from flags then history
pub fn word_difficulty(word: Option<&Word>, history: &WordHistory) -> Difficulty {
    match word {
        Some(w) if w.difficult => return Difficulty::Hard,
        Some(w) if w.learned => return Difficulty::Easy,
        _ => {}
    }
    match history.precision {
        Some(p) if p < 50.0 => Difficulty::Hard,
        Some(p) if p >= 80.0 => Difficulty::Easy,
        _ => Difficulty::Medium,
    }
}

/// A catalog word competing for a reconstructed slot
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub word: &'a Word,
    pub history: WordHistory,
    pub probability: f64,
}

/// Most-likely-correct first; ties by word id so ranking is stable
pub fn rank_candidates<'a>(
    words: impl IntoIterator<Item = &'a Word>,
    histories: &HistoryBook<'_>,
) -> Vec<Candidate<'a>> {
    let mut ranked: Vec<Candidate<'a>> = words
        .into_iter()
        .map(|word| {
            let history = histories.history(&word.id);
            let probability = correctness_probability(word, &history);
            Candidate {
                word,
                history,
                probability,
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.word.id.cmp(&b.word.id))
    });
    ranked
}

#[derive(Debug, Clone)]
pub struct Estimator {
    rng: Option<StdRng>,
    default_response_ms: u64,
}

impl Estimator {
    pub fn new(mode: EstimationMode, default_response_ms: u64) -> Self {
        let rng = match mode {
            EstimationMode::Deterministic => None,
            EstimationMode::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        };
        Self {
            rng,
            default_response_ms,
        }
    }

    /// Historical average scaled up for wrong answers and down for right ones
    pub fn response_time(&self, history: &WordHistory, correct: bool) -> u64 {
        let base = history
            .average_time_ms
            .unwrap_or(self.default_response_ms as f64);
        let factor = if correct {
            CORRECT_TIME_FACTOR
        } else {
            INCORRECT_TIME_FACTOR
        };
        (base * factor).round() as u64
    }

    pub fn hint_probability(history: &WordHistory, correct: bool) -> f64 {
        let factor = if correct {
            CORRECT_HINT_FACTOR
        } else {
            INCORRECT_HINT_FACTOR
        };
        (history.hint_rate * factor).clamp(0.0, 1.0)
    }

    /// Hints (0 or 1) attributed to a reconstructed answer
    pub fn hints(&mut self, history: &WordHistory, correct: bool) -> u32 {
        let probability = Self::hint_probability(history, correct);
        let used = match self.rng.as_mut() {
            Some(rng) => rng.gen_bool(probability),
            None => probability >= 0.5,
        };
        u32::from(used)
    }

    /// Indices into `ranked` of the `n` candidates marked correct
    pub fn pick_correct(&mut self, ranked: &[Candidate<'_>], n: usize) -> Vec<usize> {
        let n = n.min(ranked.len());
        if let Some(rng) = self.rng.as_mut() {
            let indices: Vec<usize> = (0..ranked.len()).collect();
            if let Ok(chosen) =
                indices.choose_multiple_weighted(rng, n, |&i| ranked[i].probability)
            {
                let mut picked: Vec<usize> = chosen.copied().collect();
                picked.sort_unstable();
                return picked;
            }
        }
        (0..n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttemptRecord, WordPerformance};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Map};

    fn word(id: &str, learned: bool, difficult: bool) -> Word {
        Word {
            id: id.to_string(),
            english: id.to_string(),
            italian: id.to_string(),
            chapter: Some("1".into()),
            group: None,
            sentence: None,
            notes: None,
            learned,
            difficult,
            extra: Map::new(),
        }
    }

    fn history(streak: u32, hint_rate: f64) -> WordHistory {
        WordHistory {
            average_time_ms: None,
            hint_rate,
            streak,
            precision: None,
        }
    }

    #[test]
    fn probability_rules() {
        assert_eq!(correctness_probability(&word("a", false, false), &history(0, 0.0)), 0.5);
        assert!((correctness_probability(&word("a", false, false), &history(3, 0.0)) - 0.7).abs() < 1e-9);
        assert!((correctness_probability(&word("a", false, false), &history(0, 0.6)) - 0.4).abs() < 1e-9);
        assert_eq!(correctness_probability(&word("a", true, false), &history(3, 0.0)), 0.9);
        assert_eq!(correctness_probability(&word("a", false, true), &history(0, 0.9)), 0.2);
        assert!((correctness_probability(&word("a", true, true), &history(0, 0.0)) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn probability_is_clamped_low() {
        let p = correctness_probability(&word("a", false, true), &history(0, 1.0));
        assert!((p - 0.2).abs() < 1e-9);
        assert!(p >= 0.1);
    }

    #[test]
    fn history_prefers_attempt_records() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let attempts = (0..4)
            .map(|i| AttemptRecord {
                word_id: "a".into(),
                correct: true,
                used_hint: i == 0,
                hints_count: 0,
                time_response_ms: 2000,
                timestamp: at + Duration::minutes(i),
            })
            .collect();
        let index = PerformanceIndex::build(&[WordPerformance {
            word_id: "a".into(),
            attempts,
        }]);
        let legacy: HashMap<String, LegacyWordStats> = serde_json::from_value(json!({
            "a": {"correctCount": 1, "incorrectCount": 9},
            "b": {"correct": 3, "incorrect": 1, "hints": 2, "streak": 4, "avgTime": 1500.0}
        }))
        .unwrap();
        let book = HistoryBook::new(&index, legacy);

        let a = book.history("a");
        assert_eq!(a.streak, 4);
        assert_eq!(a.hint_rate, 0.25);
        assert_eq!(a.average_time_ms, Some(2000.0));
        assert_eq!(a.precision, Some(100.0));

        let b = book.history("b");
        assert_eq!(b.streak, 4);
        assert_eq!(b.hint_rate, 0.5);
        assert_eq!(b.average_time_ms, Some(1500.0));
        assert_eq!(b.precision, Some(75.0));

        assert_eq!(book.history("c"), WordHistory::default());
    }

    #[test]
    fn response_time_scaling() {
        let estimator = Estimator::new(EstimationMode::Deterministic, DEFAULT_RESPONSE_MS);
        let known = WordHistory {
            average_time_ms: Some(2000.0),
            ..WordHistory::default()
        };
        assert_eq!(estimator.response_time(&known, false), 2800);
        assert_eq!(estimator.response_time(&known, true), 1800);
        assert_eq!(estimator.response_time(&WordHistory::default(), true), 2700);
    }

    #[test]
    fn deterministic_hints_threshold() {
        let mut estimator = Estimator::new(EstimationMode::Deterministic, DEFAULT_RESPONSE_MS);
        // 0.4 * 1.5 = 0.6 when wrong, 0.4 * 0.7 = 0.28 when right
        assert_eq!(estimator.hints(&history(0, 0.4), false), 1);
        assert_eq!(estimator.hints(&history(0, 0.4), true), 0);
        assert_eq!(estimator.hints(&history(0, 0.0), false), 0);
    }

    #[test]
    fn seeded_hints_are_reproducible() {
        let run = |seed| {
            let mut estimator = Estimator::new(EstimationMode::Seeded(seed), DEFAULT_RESPONSE_MS);
            (0..32)
                .map(|_| estimator.hints(&history(0, 0.5), false))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
        // probability 0.75: some hints, not all
        let sample = run(7);
        assert!(sample.contains(&1));
    }

    #[test]
    fn ranking_and_deterministic_pick() {
        let words = vec![
            word("c", false, false),
            word("a", true, false),
            word("b", false, true),
            word("d", false, false),
        ];
        let index = PerformanceIndex::default();
        let book = HistoryBook::new(&index, HashMap::new());
        let ranked = rank_candidates(&words, &book);

        let order: Vec<&str> = ranked.iter().map(|c| c.word.id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "d", "b"]);

        let mut estimator = Estimator::new(EstimationMode::Deterministic, DEFAULT_RESPONSE_MS);
        assert_eq!(estimator.pick_correct(&ranked, 2), vec![0, 1]);
        assert_eq!(estimator.pick_correct(&ranked, 10), vec![0, 1, 2, 3]);
    }

    #[test]
    fn seeded_pick_is_reproducible_and_sized() {
        let words: Vec<Word> = (0..12).map(|i| word(&format!("w{i:02}"), i % 3 == 0, i % 4 == 0)).collect();
        let index = PerformanceIndex::default();
        let book = HistoryBook::new(&index, HashMap::new());
        let ranked = rank_candidates(&words, &book);

        let pick = |seed| Estimator::new(EstimationMode::Seeded(seed), DEFAULT_RESPONSE_MS).pick_correct(&ranked, 5);
        let first = pick(42);
        assert_eq!(first.len(), 5);
        assert_eq!(first, pick(42));
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn difficulty_from_flags_and_history() {
        let known = |p| WordHistory {
            precision: Some(p),
            ..WordHistory::default()
        };
        assert_eq!(word_difficulty(Some(&word("a", true, true)), &known(100.0)), Difficulty::Hard);
        assert_eq!(word_difficulty(Some(&word("a", true, false)), &known(0.0)), Difficulty::Easy);
        assert_eq!(word_difficulty(None, &known(40.0)), Difficulty::Hard);
        assert_eq!(word_difficulty(None, &known(85.0)), Difficulty::Easy);
        assert_eq!(word_difficulty(None, &WordHistory::default()), Difficulty::Medium);
    }

    #[test]
    fn estimation_mode_serde() {
        assert_eq!(serde_json::to_value(EstimationMode::Deterministic).unwrap(), json!("deterministic"));
        assert_eq!(serde_json::to_value(EstimationMode::Seeded(9)).unwrap(), json!({"seeded": 9}));
        let parsed: EstimationMode = serde_json::from_value(json!({"seeded": 3})).unwrap();
        assert_eq!(parsed, EstimationMode::Seeded(3));
    }
}
