//! Plain-text and CSV output for the CLI.

use crate::analytics::{ChapterStat, Overview, TrendPoint};
use crate::error::Result;
use crate::migration::MigrationReport;
use serde::Serialize;
use std::io::Write;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Flat CSV row for one chapter
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
struct ChapterRow<'a> {
    chapter: &'a str,
    mode: String,
    total_words: usize,
    tested_words: usize,
    learned_words: usize,
    difficult_words: usize,
    correct_answers: u64,
    incorrect_answers: u64,
    precision: f64,
    hints_percentage: f64,
    efficiency: f64,
    completion_rate: f64,
    difficulty_rate: f64,
    untested_percentage: f64,
    last_tested: Option<String>,
}

impl<'a> From<&'a ChapterStat> for ChapterRow<'a> {
    fn from(s: &'a ChapterStat) -> Self {
        Self {
            chapter: &s.chapter,
            mode: s.mode.to_string(),
            total_words: s.total_words,
            tested_words: s.tested_words,
            learned_words: s.learned_words,
            difficult_words: s.difficult_words,
            correct_answers: s.correct_answers,
            incorrect_answers: s.incorrect_answers,
            precision: s.precision,
            hints_percentage: s.hints_percentage,
            efficiency: s.efficiency,
            completion_rate: s.completion_rate,
            difficulty_rate: s.difficulty_rate,
            untested_percentage: s.untested_percentage,
            last_tested: s.last_tested.map(|t| t.to_rfc3339()),
        }
    }
}

pub fn chapters_csv<W: Write>(out: W, stats: &[ChapterStat]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for stat in stats {
        writer.serialize(ChapterRow::from(stat))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn chapters_table<W: Write>(out: &mut W, stats: &[ChapterStat]) -> Result<()> {
    if stats.is_empty() {
        writeln!(out, "no chapters")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<16} {:>6} {:>7} {:>9} {:>7} {:>10} {:>10}",
        "chapter", "words", "tested", "accuracy", "hints", "efficiency", "completion"
    )?;
    for s in stats {
        if s.is_tested() {
            writeln!(
                out,
                "{:<16} {:>6} {:>7} {:>8.1}% {:>6.1}% {:>9.1}% {:>9.1}%",
                s.chapter,
                s.total_words,
                s.tested_words,
                s.precision,
                s.hints_percentage,
                s.efficiency,
                s.completion_rate
            )?;
        } else {
            writeln!(
                out,
                "{:<16} {:>6} {:>7} {:>9} {:>7} {:>10} {:>9.1}%",
                s.chapter, s.total_words, "-", "-", "-", "-", s.completion_rate
            )?;
        }
    }
    Ok(())
}

pub fn overview<W: Write>(
    out: &mut W,
    summary: &Overview,
    top: &[&ChapterStat],
    struggling: &[&ChapterStat],
) -> Result<()> {
    writeln!(
        out,
        "chapters: {} ({} tested)",
        summary.total_chapters, summary.tested_chapters
    )?;
    writeln!(
        out,
        "words: {} ({} learned, {} tested)",
        summary.total_words, summary.learned_words, summary.tested_words
    )?;
    writeln!(out, "best efficiency: {:.1}%", summary.best_efficiency)?;
    writeln!(out, "average accuracy: {:.1}%", summary.average_accuracy)?;
    writeln!(out, "average completion: {:.1}%", summary.average_completion)?;

    ranking(out, "top performing", top)?;
    ranking(out, "needs work", struggling)
}

fn ranking<W: Write>(out: &mut W, title: &str, stats: &[&ChapterStat]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}:")?;
    if stats.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (i, s) in stats.iter().enumerate() {
        writeln!(
            out,
            "  {}. {:<16} {:>5.1}% efficiency, {:>5.1}% accuracy",
            i + 1,
            s.chapter,
            s.efficiency,
            s.precision
        )?;
    }
    Ok(())
}

pub fn trend<W: Write>(out: &mut W, chapter: &str, points: &[TrendPoint]) -> Result<()> {
    if points.is_empty() {
        writeln!(out, "no tests recorded for chapter {chapter}")?;
        return Ok(());
    }
    writeln!(out, "chapter {chapter}, last {} tests:", points.len())?;
    for p in points {
        writeln!(
            out,
            "  {:<17} {:>5.1}%  {:>3} correct {:>3} wrong",
            p.full_label, p.accuracy, p.correct, p.incorrect
        )?;
    }
    Ok(())
}

pub fn report<W: Write>(out: &mut W, report: &MigrationReport) -> Result<()> {
    writeln!(out, "started: {}", report.start_time.format(DATE_FORMAT))?;
    match (report.end_time, report.duration()) {
        (Some(end), Some(took)) => writeln!(
            out,
            "finished: {} ({} ms)",
            end.format(DATE_FORMAT),
            took.num_milliseconds()
        )?,
        _ => writeln!(out, "finished: -")?,
    }
    writeln!(out, "words processed: {}", report.words_processed)?;
    writeln!(out, "tests processed: {}", report.tests_processed)?;
    writeln!(out, "estimated tests: {}", report.estimations_used)?;
    writeln!(out, "data quality: {:.1}", report.data_quality_score)?;

    if !report.errors_encountered.is_empty() {
        writeln!(out, "errors ({}):", report.errors_encountered.len())?;
        for e in &report.errors_encountered {
            writeln!(out, "  {e}")?;
        }
    }
    if !report.warnings.is_empty() {
        writeln!(out, "warnings ({}):", report.warnings.len())?;
        for w in &report.warnings {
            writeln!(out, "  {w}")?;
        }
    }
    Ok(())
}
