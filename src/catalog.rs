use crate::model::Word;
use std::collections::{BTreeMap, HashMap};

/// Words of one chapter plus their catalog-level counters
#[derive(Debug, Clone)]
pub struct ChapterGroup<'a> {
    pub chapter: String,
    pub words: Vec<&'a Word>,
    pub learned: usize,
    pub difficult: usize,
}

impl ChapterGroup<'_> {
    pub fn total(&self) -> usize {
        self.words.len()
    }
}

/// The word catalog grouped by chapter
#[derive(Debug, Clone, Default)]
pub struct CatalogProjection<'a> {
    chapters: BTreeMap<String, ChapterGroup<'a>>,
    by_id: HashMap<&'a str, &'a Word>,
}

impl<'a> CatalogProjection<'a> {
    pub fn project(words: &'a [Word]) -> Self {
        let mut chapters: BTreeMap<String, ChapterGroup<'a>> = BTreeMap::new();
        let mut by_id = HashMap::with_capacity(words.len());

        for word in words {
            // Duplicate ids: the first occurrence is the catalog entry
            if by_id.contains_key(word.id.as_str()) {
                continue;
            }
            by_id.insert(word.id.as_str(), word);

            let group = chapters
                .entry(word.chapter_label().to_string())
                .or_insert_with(|| ChapterGroup {
                    chapter: word.chapter_label().to_string(),
                    words: Vec::new(),
                    learned: 0,
                    difficult: 0,
                });
            group.words.push(word);
            if word.learned {
                group.learned += 1;
            }
            if word.difficult {
                group.difficult += 1;
            }
        }

        Self { chapters, by_id }
    }

    /// Chapter groups in lexicographic chapter order
    pub fn groups(&self) -> impl Iterator<Item = &ChapterGroup<'a>> {
        self.chapters.values()
    }

    pub fn chapter(&self, name: &str) -> Option<&ChapterGroup<'a>> {
        self.chapters.get(name)
    }

    pub fn word(&self, id: &str) -> Option<&'a Word> {
        self.by_id.get(id).copied()
    }

    pub fn chapter_names(&self) -> impl Iterator<Item = &str> {
        self.chapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}
