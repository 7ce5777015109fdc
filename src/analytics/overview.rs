use super::aggregator::ChapterStat;
use crate::util::mean;
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_TOP_PERFORMING: usize = 5;
pub const DEFAULT_STRUGGLING: usize = 3;
/// Chapters with fewer tested words are too thin to call struggling
pub const STRUGGLING_MIN_TESTED: usize = 3;

/// Global figures across all chapters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_chapters: usize,
    pub tested_chapters: usize,
    pub total_words: usize,
    pub learned_words: usize,
    pub tested_words: usize,
    pub best_efficiency: f64,
    /// Mean completion rate over every chapter
    pub average_completion: f64,
    /// Mean precision over tested chapters
    pub average_accuracy: f64,
}

pub fn summarize(stats: &[ChapterStat]) -> Overview {
    let tested: Vec<&ChapterStat> = stats.iter().filter(|s| s.is_tested()).collect();
    let completion: Vec<f64> = stats.iter().map(|s| s.completion_rate).collect();
    let accuracy: Vec<f64> = tested.iter().map(|s| s.precision).collect();

    Overview {
        total_chapters: stats.len(),
        tested_chapters: tested.len(),
        total_words: stats.iter().map(|s| s.total_words).sum(),
        learned_words: stats.iter().map(|s| s.learned_words).sum(),
        tested_words: stats.iter().map(|s| s.tested_words).sum(),
        best_efficiency: tested.iter().map(|s| s.efficiency).fold(0.0, f64::max),
        average_completion: mean(&completion).unwrap_or(0.0),
        average_accuracy: mean(&accuracy).unwrap_or(0.0),
    }
}

/// Best `n` tested chapters by efficiency
pub fn top_performing(stats: &[ChapterStat], n: usize) -> Vec<&ChapterStat> {
    let mut ranked: Vec<&ChapterStat> = stats.iter().filter(|s| s.is_tested()).collect();
    ranked.sort_by(|a, b| by_efficiency(b, a).then_with(|| a.chapter.cmp(&b.chapter)));
    ranked.truncate(n);
    ranked
}

/// Weakest `n` chapters by efficiency among those with at least `min_tested` tested words
pub fn struggling(stats: &[ChapterStat], n: usize, min_tested: usize) -> Vec<&ChapterStat> {
    let mut ranked: Vec<&ChapterStat> = stats
        .iter()
        .filter(|s| s.is_tested() && s.tested_words >= min_tested)
        .collect();
    ranked.sort_by(|a, b| by_efficiency(a, b).then_with(|| a.chapter.cmp(&b.chapter)));
    ranked.truncate(n);
    ranked
}

fn by_efficiency(a: &ChapterStat, b: &ChapterStat) -> Ordering {
    a.efficiency
        .partial_cmp(&b.efficiency)
        .unwrap_or(Ordering::Equal)
}
