//! Keyword extraction for the pipe-support / insulation dialog.
//!
//! Pulls a category, a source standard, and an action out of free text.
//! Matching is case-insensitive; the first category whose keyword appears
//! wins, with support keywords checked before insulation keywords.

use serde::{Deserialize, Serialize};

/// Specification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// 管支撐
    Support,
    /// 保溫
    Insulation,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Support, Category::Insulation];

    /// Label used in replies, button text, and round-tripped context.
    pub fn label(self) -> &'static str {
        match self {
            Self::Support => "管支撐",
            Self::Insulation => "保溫",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Support => &["管支撐", "支撐", "管道支撐", "PIPING SUPPORT", "SUPPORT"],
            Self::Insulation => &["保溫", "INSULATION", "岩棉", "氣膠體", "保溫材", "PIR"],
        }
    }
}

/// Which organisation's standard is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// 企業
    Enterprise,
    /// 塑化
    Petrochemical,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Enterprise, Source::Petrochemical];

    pub fn label(self) -> &'static str {
        match self {
            Self::Enterprise => "企業",
            Self::Petrochemical => "塑化",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

/// What the user wants to do with the standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// 下載
    Download,
    /// 詢問內容
    Inquire,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Self::Download => "下載",
            Self::Inquire => "詢問內容",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Download, Self::Inquire]
            .into_iter()
            .find(|a| a.label() == label)
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Download => &["下載", "給我", "提供"],
            Self::Inquire => &["查詢", "查", "詢問", "找"],
        }
    }
}

/// Category, source, and action found in a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryExtraction {
    pub category: Option<Category>,
    pub source: Option<Source>,
    pub action: Option<Action>,
}

impl QueryExtraction {
    /// Extract from free text.
    pub fn from_query(text: &str) -> Self {
        let upper = text.to_uppercase();

        let category = Category::ALL
            .into_iter()
            .find(|c| c.keywords().iter().any(|k| upper.contains(k)));

        let source = Source::ALL
            .into_iter()
            .find(|s| upper.contains(s.label()));

        // Download wins: "查詢並下載" is a download request
        let action = [Action::Download, Action::Inquire]
            .into_iter()
            .find(|a| a.keywords().iter().any(|k| upper.contains(k)));

        Self {
            category,
            source,
            action,
        }
    }

    /// Fill whatever this extraction missed from an earlier turn's values.
    pub fn or(self, earlier: QueryExtraction) -> Self {
        Self {
            category: self.category.or(earlier.category),
            source: self.source.or(earlier.source),
            action: self.action.or(earlier.action),
        }
    }
}
