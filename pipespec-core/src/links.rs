//! Read-only link tables.

use pipespec_common::config::DownloadLinkEntry;
use pipespec_common::{Result, ResultExt};
use std::collections::HashMap;
use std::path::Path;

use crate::extract::{Category, Source};

/// Code (support type, M-code, or grade) → URL or instruction text.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    links: HashMap<String, String>,
}

impl LinkTable {
    pub fn new(links: HashMap<String, String>) -> Self {
        Self { links }
    }

    /// Parse a link table from its JSON text (`{ "TYPE05": "https://..." }`).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let links: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { links })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).context(format!("reading {}", path.display()))?;
        Self::from_json_str(&json).context(format!("parsing {}", path.display()))
    }

    /// Load a link table, degrading to an empty one on any failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(table) => {
                tracing::info!(path = %path.display(), links = table.len(), "Loaded link table");
                table
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(path = %path.display(), "Link table not found, using empty table");
                Self::default()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load link table, using empty table");
                Self::default()
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.links.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Download links for the support/insulation standards, keyed by
/// (category, source).
#[derive(Debug, Clone, Default)]
pub struct DownloadLinks {
    links: HashMap<(Category, Source), String>,
}

impl DownloadLinks {
    /// Build from configuration entries. Entries with unknown labels are
    /// skipped with a warning.
    pub fn from_entries(entries: &[DownloadLinkEntry]) -> Self {
        let mut links = HashMap::new();
        for entry in entries {
            match (
                Category::from_label(&entry.category),
                Source::from_label(&entry.source),
            ) {
                (Some(category), Some(source)) => {
                    links.insert((category, source), entry.link.clone());
                }
                _ => tracing::warn!(
                    category = %entry.category,
                    source = %entry.source,
                    "Skipping download link with unknown category or source"
                ),
            }
        }
        Self { links }
    }

    pub fn get(&self, category: Category, source: Source) -> Option<&str> {
        self.links.get(&(category, source)).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipespec_common::Config;

    #[test]
    fn test_link_table_lookup() {
        let table =
            LinkTable::from_json_str(r#"{ "TYPE05": "https://x/t5", "A012": "https://x/a012" }"#)
                .unwrap();
        assert_eq!(table.get("TYPE05"), Some("https://x/t5"));
        assert_eq!(table.get("type05"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_link_table_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LinkTable::load_or_empty(&dir.path().join("links.json")).is_empty());
    }

    #[test]
    fn test_default_download_links() {
        let links = DownloadLinks::from_entries(&Config::default().download_links);
        assert_eq!(
            links.get(Category::Support, Source::Petrochemical),
            Some("https://tinyurl.com/5vk67ywh")
        );
        assert!(links
            .get(Category::Insulation, Source::Petrochemical)
            .unwrap()
            .starts_with("保溫規範請參考企業規範"));
    }

    #[test]
    fn test_unknown_entries_skipped() {
        let entries = vec![DownloadLinkEntry {
            category: "閥門".into(),
            source: "企業".into(),
            link: "https://x".into(),
        }];
        let links = DownloadLinks::from_entries(&entries);
        assert!(links.get(Category::Support, Source::Enterprise).is_none());
    }
}
