//! Parsers for the structured identifiers users type into chat.
//!
//! Two families exist:
//! - pipe-support codes, `TYPE05`, `TYPE12A`, `M03`, normalized to a
//!   zero-padded link-table key;
//! - piping grade (class) codes such as `A012`, `B012`, `A144N`, looked up
//!   verbatim.
//!
//! All parsing is case-insensitive; keys are returned upper-cased.

use regex::Regex;
use std::sync::LazyLock;

static GRADE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9])([A-Z]{1,2}[0-9]{2,4}[A-Z]?)(?:$|[^A-Z0-9])").unwrap()
});

static M_MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"M[-\s]*[0-9]+").unwrap());

static TYPE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TY(?:PE)?[-\s]*0*([0-9]{1,3}[A-Z]?)").unwrap());

static M_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:管支撐\s*)?M[-\s]*0*([0-9]{1,2}[A-Z]?)").unwrap());

/// Which family a support code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportCodeKind {
    /// `TYPE` codes from the petrochemical support standard
    Type,
    /// `M` codes from the enterprise support standard
    M,
}

impl SupportCodeKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::M => "M",
        }
    }
}

/// A normalized pipe-support code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportCode {
    pub kind: SupportCodeKind,
    /// Link-table key, e.g. `TYPE05A`
    pub key: String,
}

/// Whether the query talks about a support code at all (`TYPE…` or `M<digits>`).
pub fn mentions_support_code(query: &str) -> bool {
    let upper = query.to_uppercase();
    upper.contains("TYPE") || M_MENTION.is_match(&upper)
}

/// Extract and normalize a support code. `TYPE` codes win over `M` codes.
pub fn parse_support_code(query: &str) -> Option<SupportCode> {
    let upper = query.to_uppercase();

    let (kind, id) = if let Some(caps) = TYPE_CODE.captures(&upper) {
        (SupportCodeKind::Type, caps.get(1)?.as_str().to_string())
    } else if let Some(caps) = M_CODE.captures(&upper) {
        (SupportCodeKind::M, caps.get(1)?.as_str().to_string())
    } else {
        return None;
    };

    Some(SupportCode {
        kind,
        key: format!("{}{}", kind.prefix(), pad_code_number(&id)),
    })
}

/// Zero-pad the numeric part to two digits, keeping a trailing letter.
///
/// `5` → `05`, `5A` → `05A`, `123` → `123`.
pub fn pad_code_number(id: &str) -> String {
    let (digits, suffix) = match id.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => id.split_at(idx),
        _ => (id, ""),
    };
    format!("{digits:0>2}{suffix}")
}

/// Extract a piping grade code such as `A012` or `A144N`.
pub fn parse_grade_code(query: &str) -> Option<String> {
    let upper = query.to_uppercase();
    GRADE_CODE
        .captures(&upper)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
