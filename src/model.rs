//! Domain records shared by the analytics and migration layers.
//!
//! Everything here mirrors the JSON the vocabulary front-end has persisted
//! over the years, so field names are camelCase and the deserializers accept
//! the loose shapes older versions wrote (numeric ids, epoch-millisecond
//! timestamps, `wordTimes` as either a list or a map).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Chapter label used for words that were never assigned one
pub const UNASSIGNED_CHAPTER: &str = "Uncategorized";

/// Example sentence(s) attached to a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sentence {
    Single(String),
    Multiple(Vec<String>),
}

/// A vocabulary entry as owned by the catalog. Read-only for this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub italian: String,
    #[serde(
        default,
        deserialize_with = "de_opt_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub chapter: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<Sentence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub learned: bool,
    #[serde(default)]
    pub difficult: bool,
    /// Fields this crate does not interpret, kept so a round trip is lossless
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Word {
    pub fn chapter_label(&self) -> &str {
        self.chapter.as_deref().unwrap_or(UNASSIGNED_CHAPTER)
    }
}

/// One answer given for one word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    #[serde(deserialize_with = "de_id")]
    pub word_id: String,
    pub correct: bool,
    #[serde(default)]
    pub used_hint: bool,
    #[serde(default)]
    pub hints_count: u32,
    #[serde(default)]
    pub time_response_ms: u64,
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    /// Hints consumed by this attempt. A hint flag without a count is one hint.
    pub fn effective_hints(&self) -> u32 {
        if self.hints_count > 0 {
            self.hints_count
        } else if self.used_hint {
            1
        } else {
            0
        }
    }

    pub fn hinted(&self) -> bool {
        self.effective_hints() > 0
    }
}

/// Attempt history for a single word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPerformance {
    #[serde(deserialize_with = "de_id")]
    pub word_id: String,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

/// Per-chapter counters stored inside a legacy test summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterBreakdown {
    #[serde(default)]
    pub correct_words: u32,
    #[serde(default)]
    pub incorrect_words: u32,
    #[serde(default)]
    pub percentage: f64,
}

impl ChapterBreakdown {
    pub fn answers(&self) -> u64 {
        u64::from(self.correct_words) + u64::from(self.incorrect_words)
    }
}

/// Reference to a word inside `wrongWords`: either a bare id or a word object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WordRef(pub String);

impl<'de> Deserialize<'de> for WordRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let id = match &value {
            Value::Object(obj) => obj.get("id").and_then(id_from_value),
            other => id_from_value(other),
        };
        id.map(WordRef)
            .ok_or_else(|| de::Error::custom("word reference without an id"))
    }
}

/// Per-word timing (and possibly outcome) captured by some legacy versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTime {
    #[serde(deserialize_with = "de_id")]
    pub word_id: String,
    #[serde(default, alias = "time", alias = "timeResponse")]
    pub time_spent: Option<u64>,
    #[serde(default, alias = "correct")]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub used_hint: Option<bool>,
    #[serde(default)]
    pub hints_count: Option<u32>,
}

impl WordTime {
    pub fn hints(&self) -> u32 {
        match (self.hints_count, self.used_hint) {
            (Some(n), _) if n > 0 => n,
            (_, Some(true)) => 1,
            _ => 0,
        }
    }
}

/// Aggregate-only record of one completed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub correct_words: u32,
    #[serde(default)]
    pub incorrect_words: u32,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub chapter_stats: BTreeMap<String, ChapterBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrong_words: Option<Vec<WordRef>>,
    #[serde(
        default,
        deserialize_with = "de_word_times",
        skip_serializing_if = "Option::is_none"
    )]
    pub word_times: Option<Vec<WordTime>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestType {
    Complete,
    Chapters,
    Difficult,
    Review,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Normalized per-word outcome of a migrated test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedWordResponse {
    pub word_id: String,
    pub time_response: u64,
    pub hints_used: u32,
    pub current_difficulty: Difficulty,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
    /// Set when any figure in this response was reconstructed rather than recorded
    pub estimated: bool,
}

/// A legacy test after migration into the detailed representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratedTest {
    pub id: String,
    pub legacy_id: String,
    pub timestamp: DateTime<Utc>,
    pub test_type: TestType,
    pub difficulty: Difficulty,
    pub total_words: u32,
    pub correct_words: u32,
    pub incorrect_words: u32,
    pub hints_used: u32,
    pub chapter_stats: BTreeMap<String, ChapterBreakdown>,
    pub responses: Vec<DetailedWordResponse>,
    pub has_estimations: bool,
    pub quality_score: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl MigratedTest {
    /// Aggregate view of this test, usable wherever legacy summaries are
    pub fn to_summary(&self) -> TestSummary {
        TestSummary {
            id: self.id.clone(),
            timestamp: self.timestamp,
            total_words: self.total_words,
            correct_words: self.correct_words,
            incorrect_words: self.incorrect_words,
            hints_used: self.hints_used,
            chapter_stats: self.chapter_stats.clone(),
            wrong_words: Some(
                self.responses
                    .iter()
                    .filter(|r| !r.is_correct)
                    .map(|r| WordRef(r.word_id.clone()))
                    .collect(),
            ),
            word_times: None,
            test_type: Some(self.test_type.to_string()),
            difficulty: Some(self.difficulty.to_string()),
        }
    }
}

/// Normalize a JSON id (string or number) into its string form
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the timestamp encodings found in legacy data: epoch milliseconds,
/// RFC 3339, or a bare `YYYY-MM-DD` date.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(millis) = s.parse::<i64>() {
                return Utc.timestamp_millis_opt(millis).single();
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
        }
        _ => None,
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| de::Error::custom(format!("invalid id: {value}")))
}

fn de_opt_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_timestamp(&value)
        .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp: {value}")))
}

fn de_word_times<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<WordTime>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(de::Error::custom))
            .collect::<Result<Vec<WordTime>, _>>()
            .map(Some),
        // Oldest format: { "<wordId>": <millis> }
        Some(Value::Object(map)) => Ok(Some(
            map.into_iter()
                .map(|(word_id, ms)| WordTime {
                    word_id,
                    time_spent: ms.as_u64().or_else(|| ms.as_f64().map(|f| f.max(0.0) as u64)),
                    is_correct: None,
                    used_hint: None,
                    hints_count: None,
                })
                .collect(),
        )),
        Some(other) => Err(de::Error::custom(format!(
            "wordTimes must be a list or a map, got {other}"
        ))),
    }
}
