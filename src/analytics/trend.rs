use crate::model::TestSummary;
use crate::util::percentage;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

/// Number of most recent entries a trend keeps
pub const TREND_WINDOW: usize = 15;

/// One test's result for one chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub accuracy: f64,
    pub correct: u32,
    pub incorrect: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    /// `dd/mm`
    pub short_label: String,
    /// `dd/mm/yyyy HH:MM`
    pub full_label: String,
    pub accuracy: f64,
    pub correct: u32,
    pub incorrect: u32,
}

impl From<&ChapterHistoryEntry> for TrendPoint {
    fn from(entry: &ChapterHistoryEntry) -> Self {
        TrendPoint {
            timestamp: entry.timestamp,
            short_label: entry.timestamp.format("%d/%m").to_string(),
            full_label: entry.timestamp.format("%d/%m/%Y %H:%M").to_string(),
            accuracy: entry.accuracy,
            correct: entry.correct,
            incorrect: entry.incorrect,
        }
    }
}

pub fn trend(history: &[ChapterHistoryEntry]) -> Vec<TrendPoint> {
    trend_with_window(history, TREND_WINDOW)
}

/// Chronologically ascending series of the most recent `window` entries
pub fn trend_with_window(history: &[ChapterHistoryEntry], window: usize) -> Vec<TrendPoint> {
    let ordered = history.iter().sorted_by_key(|e| e.timestamp).collect_vec();
    let skip = ordered.len().saturating_sub(window);
    ordered.into_iter().skip(skip).map(TrendPoint::from).collect()
}

/// History of one chapter across legacy test summaries
pub fn chapter_history(tests: &[TestSummary], chapter: &str) -> Vec<ChapterHistoryEntry> {
    tests
        .iter()
        .filter_map(|test| {
            let breakdown = test.chapter_stats.get(chapter)?;
            // Counters win over a stored percentage, which may be stale
            let answers = breakdown.answers();
            let accuracy = if answers > 0 {
                percentage(breakdown.correct_words as f64, answers as f64)
            } else {
                breakdown.percentage.clamp(0.0, 100.0)
            };
            Some(ChapterHistoryEntry {
                timestamp: test.timestamp,
                accuracy,
                correct: breakdown.correct_words,
                incorrect: breakdown.incorrect_words,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChapterBreakdown;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 18, 30, 0).unwrap() + Duration::days(day)
    }

    fn entry(day: i64, accuracy: f64) -> ChapterHistoryEntry {
        ChapterHistoryEntry {
            timestamp: at(day),
            accuracy,
            correct: 0,
            incorrect: 0,
        }
    }

    #[test]
    fn empty_history_gives_empty_trend() {
        assert!(trend(&[]).is_empty());
    }

    #[test]
    fn trend_keeps_most_recent_window_in_order() {
        // Deliberately shuffled input
        let history: Vec<ChapterHistoryEntry> = (0..20)
            .map(|i| (i * 7) % 20)
            .map(|d| entry(d, d as f64))
            .collect();

        let series = trend(&history);
        assert_eq!(series.len(), TREND_WINDOW);
        assert_eq!(series.first().unwrap().timestamp, at(5));
        assert_eq!(series.last().unwrap().timestamp, at(19));
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn trend_labels() {
        let series = trend(&[entry(0, 50.0)]);
        assert_eq!(series[0].short_label, "01/01");
        assert_eq!(series[0].full_label, "01/01/2024 18:30");
    }

    #[test]
    fn trend_is_repeatable() {
        let history = vec![entry(3, 10.0), entry(1, 20.0), entry(2, 30.0)];
        assert_eq!(trend(&history), trend(&history));
        assert_eq!(trend_with_window(&history, 2).len(), 2);
    }

    #[test]
    fn chapter_history_reads_breakdowns() {
        let mk = |id: &str, day: i64, stats: &[(&str, u32, u32, f64)]| TestSummary {
            id: id.to_string(),
            timestamp: at(day),
            total_words: 0,
            correct_words: 0,
            incorrect_words: 0,
            hints_used: 0,
            chapter_stats: stats
                .iter()
                .map(|(ch, c, i, p)| {
                    (
                        ch.to_string(),
                        ChapterBreakdown {
                            correct_words: *c,
                            incorrect_words: *i,
                            percentage: *p,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            wrong_words: None,
            word_times: None,
            test_type: None,
            difficulty: None,
        };
        let tests = vec![
            mk("t1", 0, &[("1", 3, 1, 75.0), ("2", 1, 1, 50.0)]),
            mk("t2", 1, &[("2", 4, 0, 0.0)]),
            mk("t3", 2, &[("1", 0, 2, 0.0)]),
            mk("t4", 3, &[("1", 1, 1, 90.0), ("4", 0, 0, 80.0)]),
        ];

        let one = chapter_history(&tests, "1");
        assert_eq!(one.len(), 3);
        assert_eq!(one[0].accuracy, 75.0);
        assert_eq!(one[1].accuracy, 0.0);
        // stored 90% disagrees with 1 of 2 correct
        assert_eq!(one[2].accuracy, 50.0);

        let two = chapter_history(&tests, "2");
        assert_eq!(two[1].accuracy, 100.0);
        assert!(chapter_history(&tests, "3").is_empty());

        // no counters, so the stored percentage is all there is
        assert_eq!(chapter_history(&tests, "4")[0].accuracy, 80.0);
    }
}
