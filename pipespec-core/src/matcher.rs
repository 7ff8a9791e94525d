//! Spec matcher: finds corpus sections relevant to a free-text query.

use pipespec_common::config::{MatchStrategy, MatcherConfig};

use crate::corpus::SpecCorpus;
use crate::fuzz::{normalize, partial_ratio_with_floor};

/// One matched section (or, for the substring strategy, chapter header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMatch {
    /// `第{chapter}章 {title} - {section}`, or `第{chapter}章 {title}` for a header
    pub label: String,
    pub chapter: String,
    pub section: Option<String>,
    /// Full text shown when the user selects this match
    pub text: String,
    /// 0-100
    pub score: u8,
}

/// Ordered result of a matcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matches: Vec<SpecMatch>,
}

impl MatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn total(&self) -> usize {
        self.matches.len()
    }

    /// Numbered label list, one per line: `1. 第3章 試壓 - 3.1`.
    pub fn summary(&self) -> String {
        self.matches
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, m.label))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `(label, text)` pairs in match order, the shape round-tripped as
    /// selection options.
    pub fn options(&self) -> Vec<(String, String)> {
        self.matches
            .iter()
            .map(|m| (m.label.clone(), m.text.clone()))
            .collect()
    }
}

/// Configured matcher.
#[derive(Debug, Clone)]
pub struct SpecMatcher {
    strategy: MatchStrategy,
    threshold: u8,
    keywords: Vec<String>,
}

impl Default for SpecMatcher {
    fn default() -> Self {
        Self::from_config(&MatcherConfig::default())
    }
}

impl SpecMatcher {
    pub fn new(strategy: MatchStrategy, threshold: u8, keywords: Vec<String>) -> Self {
        Self {
            strategy,
            threshold,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &MatcherConfig) -> Self {
        Self::new(config.strategy, config.threshold, config.keywords.clone())
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Run the configured strategy. A query that normalizes to nothing
    /// matches nothing.
    pub fn find(&self, query: &str, corpus: &SpecCorpus) -> MatchOutcome {
        let query = normalize(query);
        if query.is_empty() {
            return MatchOutcome::default();
        }

        let outcome = match self.strategy {
            MatchStrategy::Fuzzy => self.find_fuzzy(&query, corpus),
            MatchStrategy::Substring => self.find_substring(&query, corpus),
        };

        tracing::debug!(
            strategy = ?self.strategy,
            matches = outcome.total(),
            "Matcher finished"
        );
        outcome
    }

    fn find_fuzzy(&self, query: &str, corpus: &SpecCorpus) -> MatchOutcome {
        let mut matches = Vec::new();

        for (chapter_id, chapter) in corpus.chapters() {
            for (section, text) in &chapter.content {
                let score = partial_ratio_with_floor(query, &normalize(text), self.threshold);
                if score >= self.threshold {
                    matches.push(SpecMatch {
                        label: section_label(chapter_id, &chapter.title, section),
                        chapter: chapter_id.to_string(),
                        section: Some(section.clone()),
                        text: text.clone(),
                        score,
                    });
                }
            }
        }

        MatchOutcome { matches }
    }

    /// A chapter matches when its title carries one of the keywords or any of
    /// its sections contains the query; it then contributes a header entry
    /// followed by every section.
    fn find_substring(&self, query: &str, corpus: &SpecCorpus) -> MatchOutcome {
        let mut matches = Vec::new();

        for (chapter_id, chapter) in corpus.chapters() {
            let title = chapter.title.to_lowercase();
            let chapter_matched = self.keywords.iter().any(|k| title.contains(k.as_str()))
                || chapter
                    .content
                    .values()
                    .any(|text| normalize(text).contains(query));

            if !chapter_matched {
                continue;
            }

            let joined = chapter
                .content
                .iter()
                .map(|(section, text)| format!("{section} {text}"))
                .collect::<Vec<_>>()
                .join("\n");

            matches.push(SpecMatch {
                label: format!("第{}章 {}", chapter_id, chapter.title),
                chapter: chapter_id.to_string(),
                section: None,
                text: joined,
                score: 100,
            });

            for (section, text) in &chapter.content {
                matches.push(SpecMatch {
                    label: section_label(chapter_id, &chapter.title, section),
                    chapter: chapter_id.to_string(),
                    section: Some(section.clone()),
                    text: text.clone(),
                    score: 100,
                });
            }
        }

        MatchOutcome { matches }
    }
}

fn section_label(chapter: &str, title: &str, section: &str) -> String {
    format!("第{chapter}章 {title} - {section}")
}
