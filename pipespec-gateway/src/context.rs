//! Typed access to the round-tripped `spec-context` parameters.
//!
//! Dialogflow hands the parameters back verbatim, so every read tolerates
//! missing keys and wrong types.

use pipespec_core::{Action, Category, QueryExtraction, Source};
use serde_json::{json, Map, Value};

/// Mode flags set by the "start Q&A" intents and consumed by the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitFlag {
    HeatQuestion,
    PipingClassDownload,
    CommonSpecQuestion,
    PipingClassQuestion,
}

impl AwaitFlag {
    pub fn key(self) -> &'static str {
        match self {
            Self::HeatQuestion => "await_heat_question",
            Self::PipingClassDownload => "await_pipinclass_download",
            Self::CommonSpecQuestion => "await_pipecommon_question",
            Self::PipingClassQuestion => "await_pipeclass_question",
        }
    }

    /// Parameters that set only this flag.
    pub fn params(self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(self.key().into(), Value::Bool(true));
        params
    }
}

/// Read-only view over inbound context parameters.
#[derive(Debug, Clone, Default)]
pub struct SpecContext {
    params: Map<String, Value>,
}

impl SpecContext {
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Truthy flag: `true` or the string `"true"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.params.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn is_set(&self, flag: AwaitFlag) -> bool {
        self.flag(flag.key())
    }

    pub fn awaiting_selection(&self) -> bool {
        self.flag("await_spec_selection")
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Category, source, and action remembered from earlier dialog turns.
    pub fn remembered(&self) -> QueryExtraction {
        QueryExtraction {
            category: self.label("category").and_then(Category::from_label),
            source: self.label("source").and_then(Source::from_label),
            action: self.label("action").and_then(Action::from_label),
        }
    }
}

/// Parameters remembering the support/insulation dialog state. Unknown
/// values are left out, so an all-`None` state clears the context.
pub fn dialog_params(
    category: Option<Category>,
    source: Option<Source>,
    action: Option<Action>,
) -> Map<String, Value> {
    let mut params = Map::new();
    if let Some(category) = category {
        params.insert("category".into(), json!(category.label()));
    }
    if let Some(source) = source {
        params.insert("source".into(), json!(source.label()));
    }
    if let Some(action) = action {
        params.insert("action".into(), json!(action.label()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(value: Value) -> SpecContext {
        match value {
            Value::Object(map) => SpecContext::new(map),
            _ => SpecContext::default(),
        }
    }

    #[test]
    fn test_flags_tolerate_types() {
        let ctx = context(json!({
            "await_heat_question": true,
            "await_pipecommon_question": "true",
            "await_pipeclass_question": 1,
            "await_spec_selection": false
        }));
        assert!(ctx.is_set(AwaitFlag::HeatQuestion));
        assert!(ctx.is_set(AwaitFlag::CommonSpecQuestion));
        assert!(!ctx.is_set(AwaitFlag::PipingClassQuestion));
        assert!(!ctx.is_set(AwaitFlag::PipingClassDownload));
        assert!(!ctx.awaiting_selection());
    }

    #[test]
    fn test_remembered_dialog_state() {
        let ctx = context(json!({ "category": "保溫", "source": "", "action": 3 }));
        let state = ctx.remembered();
        assert_eq!(state.category, Some(Category::Insulation));
        assert_eq!(state.source, None);
        assert_eq!(state.action, None);
    }

    #[test]
    fn test_dialog_params_round_trip() {
        let params = dialog_params(Some(Category::Support), None, Some(Action::Download));
        assert_eq!(params.len(), 2);
        let state = SpecContext::new(params).remembered();
        assert_eq!(state.category, Some(Category::Support));
        assert_eq!(state.action, Some(Action::Download));

        assert!(dialog_params(None, None, None).is_empty());
    }

    #[test]
    fn test_await_flag_params() {
        let params = AwaitFlag::PipingClassDownload.params();
        assert_eq!(params["await_pipinclass_download"], true);
    }
}
