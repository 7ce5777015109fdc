use crate::error::{Error, Result};
use crate::model::{id_from_value, Difficulty, Sentence, TestSummary, TestType, Word};
use serde_json::Value;

/// Tests shorter than this default to easy
pub const EASY_BELOW_WORDS: u32 = 15;
/// Tests longer than this default to hard
pub const HARD_ABOVE_WORDS: u32 = 30;

/// Convert one legacy word blob into a catalog word
pub fn normalize_word(raw: &Value) -> Result<Word> {
    let identity = raw
        .get("id")
        .and_then(id_from_value)
        .unwrap_or_else(|| "<missing id>".to_string());

    if !raw.is_object() {
        return Err(Error::invalid_record("word", identity, "expected an object"));
    }

    let mut word: Word = serde_json::from_value(raw.clone())
        .map_err(|e| Error::invalid_record("word", identity.clone(), e.to_string()))?;

    word.english = word.english.trim().to_string();
    word.italian = word.italian.trim().to_string();
    if word.english.is_empty() || word.italian.is_empty() {
        return Err(Error::invalid_record(
            "word",
            identity,
            "missing english or italian text",
        ));
    }
    word.sentence = word.sentence.take().and_then(split_sentence);

    Ok(word)
}

/// Split a `|`- or `;`-separated sentence field; one part stays a plain string
pub fn split_sentence(sentence: Sentence) -> Option<Sentence> {
    let parts: Vec<String> = match sentence {
        Sentence::Single(text) => text
            .split(['|', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Sentence::Multiple(items) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };

    match parts.len() {
        0 => None,
        1 => parts.into_iter().next().map(Sentence::Single),
        _ => Some(Sentence::Multiple(parts)),
    }
}

/// Map the free-text test types older versions stored
pub fn map_test_type(raw: Option<&str>) -> Option<TestType> {
    let text = raw?.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if text.contains("diffic") || text.contains("hard") {
        Some(TestType::Difficult)
    } else if text.contains("chap") || text.contains("capit") || text.contains("select") {
        Some(TestType::Chapters)
    } else if ["review", "ripass", "wrong", "error", "mistake", "sbagli"]
        .iter()
        .any(|k| text.contains(k))
    {
        Some(TestType::Review)
    } else if ["complet", "all", "tutt", "normal", "standard", "full"]
        .iter()
        .any(|k| text.contains(k))
    {
        Some(TestType::Complete)
    } else {
        None
    }
}

pub fn map_difficulty(raw: Option<&str>) -> Option<Difficulty> {
    match raw?.trim().to_lowercase().as_str() {
        "easy" | "facile" | "low" | "beginner" => Some(Difficulty::Easy),
        "medium" | "medio" | "media" | "normal" | "intermediate" => Some(Difficulty::Medium),
        "hard" | "difficile" | "high" | "advanced" => Some(Difficulty::Hard),
        _ => None,
    }
}

pub fn infer_difficulty(total_words: u32) -> Difficulty {
    if total_words < EASY_BELOW_WORDS {
        Difficulty::Easy
    } else if total_words > HARD_ABOVE_WORDS {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}

/// A single-chapter test was a chapter drill; anything else a complete test
pub fn infer_test_type(test: &TestSummary) -> TestType {
    if test.chapter_stats.len() == 1 {
        TestType::Chapters
    } else {
        TestType::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn normalize_word_splits_sentences() {
        let word = normalize_word(&json!({
            "id": 3,
            "english": " to run ",
            "italian": "correre",
            "sentence": "I run | Tu corri; ",
        }))
        .unwrap();

        assert_eq!(word.id, "3");
        assert_eq!(word.english, "to run");
        assert_eq!(
            word.sentence,
            Some(Sentence::Multiple(vec!["I run".into(), "Tu corri".into()]))
        );
    }

    #[test]
    fn normalize_word_single_sentence_stays_string() {
        let word = normalize_word(&json!({
            "id": "w", "english": "a", "italian": "b", "sentence": "just one"
        }))
        .unwrap();
        assert_eq!(word.sentence, Some(Sentence::Single("just one".into())));

        let blank = normalize_word(&json!({
            "id": "w", "english": "a", "italian": "b", "sentence": " | "
        }))
        .unwrap();
        assert_eq!(blank.sentence, None);
    }

    #[test]
    fn normalize_word_rejects_malformed() {
        assert_matches!(
            normalize_word(&json!({"english": "a", "italian": "b"})),
            Err(Error::InvalidRecord { kind: "word", .. })
        );
        assert_matches!(
            normalize_word(&json!({"id": 9, "english": "", "italian": "b"})),
            Err(Error::InvalidRecord { ref identity, .. }) if identity == "9"
        );
        assert_matches!(normalize_word(&json!("dog")), Err(Error::InvalidRecord { .. }));
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(map_test_type(Some("Parole difficili")), Some(TestType::Difficult));
        assert_eq!(map_test_type(Some("selectedChapters")), Some(TestType::Chapters));
        assert_eq!(map_test_type(Some("ripasso")), Some(TestType::Review));
        assert_eq!(map_test_type(Some("COMPLETE")), Some(TestType::Complete));
        assert_eq!(map_test_type(Some("???")), None);
        assert_eq!(map_test_type(Some("  ")), None);
        assert_eq!(map_test_type(None), None);
    }

    #[test]
    fn difficulty_mapping_and_inference() {
        assert_eq!(map_difficulty(Some("Facile")), Some(Difficulty::Easy));
        assert_eq!(map_difficulty(Some("hard")), Some(Difficulty::Hard));
        assert_eq!(map_difficulty(Some("extreme")), None);

        assert_eq!(infer_difficulty(10), Difficulty::Easy);
        assert_eq!(infer_difficulty(15), Difficulty::Medium);
        assert_eq!(infer_difficulty(30), Difficulty::Medium);
        assert_eq!(infer_difficulty(31), Difficulty::Hard);
    }
}
