//! Per-word attempt lookup and the statistics derived from it.

use crate::model::{AttemptRecord, WordPerformance};
use crate::util::{mean, percentage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Points lost per hint on a correct answer
pub const HINT_PENALTY: f64 = 15.0;
/// Lowest efficiency a correct answer can score, however many hints it took
pub const HINTED_FLOOR: f64 = 55.0;

/// Efficiency of a single attempt: 100 unaided, 55..=85 with hints, 0 when wrong
pub fn attempt_efficiency(attempt: &AttemptRecord) -> f64 {
    if !attempt.correct {
        return 0.0;
    }
    match attempt.effective_hints() {
        0 => 100.0,
        hints => (100.0 - HINT_PENALTY * hints as f64).max(HINTED_FLOOR),
    }
}

/// Derived view of one word's history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordInsight {
    pub word_id: String,
    pub attempts: usize,
    pub correct: usize,
    pub hinted_correct: usize,
    pub precision: f64,
    pub efficiency: f64,
    pub average_time_ms: Option<f64>,
    /// Fraction (0..=1) of attempts that used at least one hint
    pub hint_rate: f64,
    /// Consecutive correct answers ending with the most recent attempt
    pub current_streak: u32,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
}

/// wordId → chronologically ordered attempts
#[derive(Debug, Clone, Default)]
pub struct PerformanceIndex {
    attempts: HashMap<String, Vec<AttemptRecord>>,
}

impl PerformanceIndex {
    /// Build the index; several records for one word are merged
    pub fn build(records: &[WordPerformance]) -> Self {
        let mut attempts: HashMap<String, Vec<AttemptRecord>> = HashMap::new();
        for record in records {
            attempts
                .entry(record.word_id.clone())
                .or_default()
                .extend(record.attempts.iter().cloned());
        }
        for history in attempts.values_mut() {
            history.sort_by_key(|a| a.timestamp);
        }
        attempts.retain(|_, history| !history.is_empty());
        Self { attempts }
    }

    pub fn attempts(&self, word_id: &str) -> &[AttemptRecord] {
        self.attempts
            .get(word_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Number of words with at least one attempt
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.values().map(Vec::len).sum()
    }

    pub fn insight(&self, word_id: &str) -> Option<WordInsight> {
        let history = self.attempts.get(word_id)?;
        let first = history.first()?;
        let last = history.last()?;

        let correct = history.iter().filter(|a| a.correct).count();
        let hinted_correct = history.iter().filter(|a| a.correct && a.hinted()).count();
        let hinted = history.iter().filter(|a| a.hinted()).count();
        let efficiencies: Vec<f64> = history.iter().map(attempt_efficiency).collect();
        let times: Vec<f64> = history
            .iter()
            .filter(|a| a.time_response_ms > 0)
            .map(|a| a.time_response_ms as f64)
            .collect();
        let current_streak = history.iter().rev().take_while(|a| a.correct).count() as u32;

        Some(WordInsight {
            word_id: word_id.to_string(),
            attempts: history.len(),
            correct,
            hinted_correct,
            precision: percentage(correct as f64, history.len() as f64),
            efficiency: mean(&efficiencies).unwrap_or(0.0),
            average_time_ms: mean(&times),
            hint_rate: hinted as f64 / history.len() as f64,
            current_streak,
            first_attempt: first.timestamp,
            last_attempt: last.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn attempt(word: &str, minute: i64, correct: bool, hints: u32, ms: u64) -> AttemptRecord {
        AttemptRecord {
            word_id: word.to_string(),
            correct,
            used_hint: hints > 0,
            hints_count: hints,
            time_response_ms: ms,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    #[test]
    fn efficiency_per_attempt() {
        assert_eq!(attempt_efficiency(&attempt("w", 0, true, 0, 0)), 100.0);
        assert_eq!(attempt_efficiency(&attempt("w", 0, true, 1, 0)), 85.0);
        assert_eq!(attempt_efficiency(&attempt("w", 0, true, 3, 0)), 55.0);
        assert_eq!(attempt_efficiency(&attempt("w", 0, true, 10, 0)), 55.0);
        assert_eq!(attempt_efficiency(&attempt("w", 0, false, 2, 0)), 0.0);
    }

    #[test]
    fn build_merges_and_orders_attempts() {
        let records = vec![
            WordPerformance {
                word_id: "w1".into(),
                attempts: vec![attempt("w1", 5, true, 0, 900)],
            },
            WordPerformance {
                word_id: "w1".into(),
                attempts: vec![attempt("w1", 1, false, 0, 1200)],
            },
            WordPerformance {
                word_id: "w2".into(),
                attempts: vec![],
            },
        ];
        let index = PerformanceIndex::build(&records);

        assert_eq!(index.len(), 1);
        assert_eq!(index.total_attempts(), 2);
        let history = index.attempts("w1");
        assert!(!history[0].correct);
        assert!(history[1].correct);
        assert!(index.attempts("w2").is_empty());
    }

    #[test]
    fn insight_figures() {
        let records = vec![WordPerformance {
            word_id: "w1".into(),
            attempts: vec![
                attempt("w1", 0, false, 0, 3000),
                attempt("w1", 1, true, 1, 2000),
                attempt("w1", 2, true, 0, 1000),
                attempt("w1", 3, true, 0, 0),
            ],
        }];
        let index = PerformanceIndex::build(&records);
        let insight = index.insight("w1").unwrap();

        assert_eq!(insight.attempts, 4);
        assert_eq!(insight.correct, 3);
        assert_eq!(insight.hinted_correct, 1);
        assert_eq!(insight.precision, 75.0);
        assert_eq!(insight.efficiency, (0.0 + 85.0 + 100.0 + 100.0) / 4.0);
        assert_eq!(insight.average_time_ms, Some(2000.0));
        assert_eq!(insight.hint_rate, 0.25);
        assert_eq!(insight.current_streak, 3);
        assert!(insight.first_attempt < insight.last_attempt);
        assert!(index.insight("nope").is_none());
    }
}
