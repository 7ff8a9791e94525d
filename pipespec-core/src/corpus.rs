//! Specification corpus: chapter → {title, ordered section-number → text}.
//!
//! Corpora are loaded once at startup and never mutated. File order is kept
//! for both chapters and sections since match lists are numbered by it.

use indexmap::IndexMap;
use pipespec_common::{Result, ResultExt};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// A chapter of a specification document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Section number → section text, in file order
    pub content: IndexMap<String, String>,
}

/// An immutable specification corpus.
#[derive(Debug, Clone, Default)]
pub struct SpecCorpus {
    chapters: IndexMap<String, Chapter>,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: IndexMap<String, Value>,
}

/// Section bodies are usually strings; tables occasionally arrive as arrays
/// or objects and are kept as their compact JSON text.
fn section_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SpecCorpus {
    /// Build a corpus from already-parsed chapters.
    pub fn new(chapters: IndexMap<String, Chapter>) -> Self {
        Self { chapters }
    }

    /// Parse a corpus from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: IndexMap<String, RawChapter> = serde_json::from_str(json)?;
        let chapters = raw
            .into_iter()
            .map(|(id, chapter)| {
                let content = chapter
                    .content
                    .into_iter()
                    .map(|(section, text)| (section, section_text(text)))
                    .collect();
                (
                    id,
                    Chapter {
                        title: chapter.title,
                        content,
                    },
                )
            })
            .collect();
        Ok(Self { chapters })
    }

    /// Load a corpus from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).context(format!("reading {}", path.display()))?;
        Self::from_json_str(&json).context(format!("parsing {}", path.display()))
    }

    /// Load a corpus, degrading to an empty one when the file is missing or
    /// unreadable.
    pub fn load_or_empty(path: &Path, name: &str) -> Self {
        match Self::from_path(path) {
            Ok(corpus) => {
                tracing::info!(
                    corpus = name,
                    path = %path.display(),
                    chapters = corpus.chapter_count(),
                    sections = corpus.section_count(),
                    "Loaded specification corpus"
                );
                corpus
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(corpus = name, path = %path.display(), "Corpus file not found, using empty corpus");
                Self::default()
            }
            Err(e) => {
                tracing::error!(corpus = name, error = %e, "Failed to load corpus, using empty corpus");
                Self::default()
            }
        }
    }

    /// Iterate chapters in file order.
    pub fn chapters(&self) -> impl Iterator<Item = (&str, &Chapter)> {
        self.chapters.iter().map(|(id, ch)| (id.as_str(), ch))
    }

    /// Look up a chapter by identifier.
    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.get(id)
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn section_count(&self) -> usize {
        self.chapters.values().map(|c| c.content.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "3": { "title": "試壓", "content": { "3.2": "水壓試驗", "3.1": "氣壓試驗" } },
        "1": { "title": "總則", "content": { "1.1": "適用範圍" } }
    }"#;

    #[test]
    fn test_preserves_file_order() {
        let corpus = SpecCorpus::from_json_str(SAMPLE).unwrap();
        let ids: Vec<&str> = corpus.chapters().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["3", "1"]);

        let sections: Vec<&String> = corpus.chapter("3").unwrap().content.keys().collect();
        assert_eq!(sections, vec!["3.2", "3.1"]);
        assert_eq!(corpus.section_count(), 3);
    }

    #[test]
    fn test_missing_fields_default() {
        let corpus = SpecCorpus::from_json_str(r#"{ "9": {} }"#).unwrap();
        let chapter = corpus.chapter("9").unwrap();
        assert!(chapter.title.is_empty());
        assert!(chapter.content.is_empty());
    }

    #[test]
    fn test_non_string_sections_kept_as_json() {
        let corpus = SpecCorpus::from_json_str(
            r#"{ "2": { "title": "熱處理", "content": { "2.1": ["P1", 600], "2.2": null } } }"#,
        )
        .unwrap();
        let chapter = corpus.chapter("2").unwrap();
        assert_eq!(chapter.content["2.1"], r#"["P1",600]"#);
        assert_eq!(chapter.content["2.2"], "");
    }

    #[test]
    fn test_load_or_empty_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = SpecCorpus::load_or_empty(&dir.path().join("nope.json"), "piping");
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_load_or_empty_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(SpecCorpus::from_path(&path).is_err());
        assert!(SpecCorpus::load_or_empty(&path, "heat").is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let corpus = SpecCorpus::from_path(&path).unwrap();
        assert_eq!(corpus.chapter_count(), 2);
    }
}
