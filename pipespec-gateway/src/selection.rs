//! Pending selection menus.
//!
//! After a multi-result match the options travel to the client inside the
//! spec context and come back on the next turn. The returned list is
//! untrusted: it is validated as a whole before any index is dereferenced.

use serde_json::{json, Map, Value};

/// Outcome of resolving a user's reply against a pending menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    Picked { label: &'a str, text: &'a str },
    /// Numeric, but not within `1..=len`
    OutOfRange,
    NotANumber,
}

/// Options offered to the user, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    options: Vec<(String, String)>,
}

impl PendingSelection {
    pub fn new(options: Vec<(String, String)>) -> Self {
        Self { options }
    }

    /// Parse `spec_options` from context parameters. Returns `None` when the
    /// list is missing, empty, or any entry is not a `[label, text]` pair of
    /// strings.
    pub fn from_params(params: &Map<String, Value>) -> Option<Self> {
        let raw = params.get("spec_options")?.as_array()?;
        let options = raw
            .iter()
            .map(|entry| match entry.as_array()?.as_slice() {
                [Value::String(label), Value::String(text)] => Some((label.clone(), text.clone())),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        if options.is_empty() {
            None
        } else {
            Some(Self { options })
        }
    }

    /// Context parameters that present this menu on the next turn.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("await_spec_selection".into(), Value::Bool(true));
        params.insert(
            "spec_options".into(),
            Value::Array(
                self.options
                    .iter()
                    .map(|(label, text)| json!([label, text]))
                    .collect(),
            ),
        );
        params
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Resolve the user's reply. Full-width digits count as digits.
    pub fn select(&self, input: &str) -> Selection<'_> {
        let digits: String = input.trim().chars().map(fold_fullwidth_digit).collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Selection::NotANumber;
        }

        match digits.parse::<usize>() {
            Ok(n) if (1..=self.options.len()).contains(&n) => {
                let (label, text) = &self.options[n - 1];
                Selection::Picked { label, text }
            }
            _ => Selection::OutOfRange,
        }
    }
}

fn fold_fullwidth_digit(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        _ => c,
    }
}
