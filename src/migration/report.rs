use crate::error::Error;
use crate::util::{mean, round1};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

const MISSING_EXACT_PENALTY: f64 = 25.0;
const MISSING_TIMING_PENALTY: f64 = 15.0;
const HINT_MISMATCH_PENALTY: f64 = 10.0;
const COUNT_MISMATCH_PENALTY: f64 = 30.0;
const ERROR_PENALTY: f64 = 5.0;
const MAX_ERROR_PENALTY: f64 = 30.0;
const ESTIMATION_RATE_PENALTY: f64 = 10.0;

/// Audit record of one migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub words_processed: usize,
    pub tests_processed: usize,
    pub errors_encountered: Vec<String>,
    pub warnings: Vec<String>,
    pub estimations_used: usize,
    pub data_quality_score: f64,
}

impl MigrationReport {
    pub fn begin(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: None,
            words_processed: 0,
            tests_processed: 0,
            errors_encountered: Vec::new(),
            warnings: Vec::new(),
            estimations_used: 0,
            data_quality_score: 0.0,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub(crate) fn record_error(&mut self, error: &Error) {
        warn!(%error, "skipping legacy record");
        self.errors_encountered.push(error.to_string());
    }

    pub(crate) fn absorb(&mut self, quality: &TestQuality) {
        self.warnings.extend(quality.warnings.iter().cloned());
        if quality.estimated {
            self.estimations_used += 1;
        }
    }

    /// Stamp the end time and compute the run-level quality score
    pub(crate) fn finish(&mut self, test_scores: &[f64], end_time: DateTime<Utc>) {
        self.data_quality_score = data_quality_score(
            test_scores,
            self.errors_encountered.len(),
            self.estimations_used,
            self.tests_processed,
        );
        self.end_time = Some(end_time);
    }

    /// Close the report on a fatal error and wrap both for the caller
    pub(crate) fn abort(mut self, error: Error, end_time: DateTime<Utc>) -> Error {
        self.errors_encountered.push(format!("fatal: {error}"));
        self.end_time = Some(end_time);
        Error::Migration {
            report: Box::new(self),
            source: Box::new(error),
        }
    }
}

/// Run-level confidence in [0, 100].
///
/// Starts from the mean per-test score (100 when there were no tests) and
/// loses points for conversion errors and for the share of estimated tests.
pub fn data_quality_score(
    test_scores: &[f64],
    errors: usize,
    estimations: usize,
    tests: usize,
) -> f64 {
    let base = mean(test_scores).unwrap_or(100.0);
    let error_penalty = (errors as f64 * ERROR_PENALTY).min(MAX_ERROR_PENALTY);
    let estimation_rate = if tests > 0 {
        estimations as f64 / tests as f64
    } else {
        0.0
    };
    round1((base - error_penalty - estimation_rate * ESTIMATION_RATE_PENALTY).clamp(0.0, 100.0))
}

/// Quality bookkeeping for a single migrated test
#[derive(Debug, Clone, PartialEq)]
pub struct TestQuality {
    test_id: String,
    pub score: f64,
    pub warnings: Vec<String>,
    /// Any response of the test had to be reconstructed
    pub estimated: bool,
}

impl TestQuality {
    pub fn new(test_id: &str) -> Self {
        Self {
            test_id: test_id.to_string(),
            score: 100.0,
            warnings: Vec::new(),
            estimated: false,
        }
    }

    fn penalize(&mut self, points: f64, message: String) {
        self.score = (self.score - points).clamp(0.0, 100.0);
        self.warnings.push(format!("test {}: {message}", self.test_id));
    }

    pub fn missing_exact_data(&mut self) {
        self.estimated = true;
        self.penalize(
            MISSING_EXACT_PENALTY,
            "no per-word outcome records, responses estimated".to_string(),
        );
    }

    pub fn missing_timing(&mut self) {
        self.penalize(
            MISSING_TIMING_PENALTY,
            "no timing data, response times estimated".to_string(),
        );
    }

    pub fn hint_mismatch(&mut self, reconstructed: u32, recorded: u32) {
        self.penalize(
            HINT_MISMATCH_PENALTY,
            format!("reconstructed {reconstructed} hints but {recorded} were recorded"),
        );
    }

    pub fn count_mismatch(&mut self, reconstructed: usize, recorded: u32) {
        self.penalize(
            COUNT_MISMATCH_PENALTY,
            format!("reconstructed {reconstructed} responses but totalWords is {recorded}"),
        );
    }
}
