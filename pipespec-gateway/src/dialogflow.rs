//! Dialogflow ES fulfillment wire format.
//!
//! Only the fields the router reads are modelled; everything else in the
//! inbound payload is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Name suffix of the context the webhook round-trips through Dialogflow.
pub const SPEC_CONTEXT: &str = "spec-context";

// ============================================================================
// Inbound
// ============================================================================

/// Fulfillment request sent by Dialogflow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    /// `projects/<project>/agent/sessions/<session>`
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub query_result: QueryResult,
    /// Request as received from the messaging platform (LINE, ...)
    #[serde(default)]
    pub original_detect_intent_request: Option<OriginalRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub intent: IntentRef,
    #[serde(default)]
    pub output_contexts: Vec<InboundContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: String,
}

/// An active context as reported by Dialogflow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginalRequest {
    #[serde(default)]
    pub payload: Value,
}

impl WebhookRequest {
    pub fn query_text(&self) -> &str {
        &self.query_result.query_text
    }

    pub fn intent_name(&self) -> &str {
        &self.query_result.intent.display_name
    }

    /// Parameters of the round-tripped spec context. When several contexts
    /// match, the last one wins.
    pub fn spec_context_params(&self) -> Map<String, Value> {
        self.query_result
            .output_contexts
            .iter()
            .rev()
            .find(|ctx| ctx.name.contains(SPEC_CONTEXT))
            .map(|ctx| ctx.parameters.clone())
            .unwrap_or_default()
    }

    /// LINE user id of the sender, when the request came through LINE.
    pub fn line_user_id(&self) -> Option<&str> {
        self.original_detect_intent_request
            .as_ref()?
            .payload
            .pointer("/data/source/userId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Fulfillment response returned to Dialogflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fulfillment_messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<OutputContext>,
}

impl WebhookResponse {
    /// Plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            fulfillment_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// LINE button menu.
    pub fn buttons<S: AsRef<str>>(text: &str, options: &[S]) -> Self {
        Self {
            fulfillment_messages: vec![line_buttons(text, options)],
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: OutputContext) -> Self {
        self.output_contexts.push(context);
        self
    }

    /// Text of the reply, or of the first button menu.
    pub fn display_text(&self) -> Option<&str> {
        self.fulfillment_text.as_deref().or_else(|| {
            self.fulfillment_messages
                .first()?
                .pointer("/payload/line/altText")?
                .as_str()
        })
    }
}

/// A context set (or cleared) by the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputContext {
    pub name: String,
    pub lifespan_count: u32,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl OutputContext {
    /// The spec context for `session`. Empty parameters, or an explicit
    /// `await_spec_selection: false`, clear the context.
    pub fn spec(session: &str, parameters: Map<String, Value>, lifespan: u32) -> Self {
        let name = format!("{session}/contexts/{SPEC_CONTEXT}");
        let clears = parameters.is_empty()
            || parameters.get("await_spec_selection") == Some(&Value::Bool(false));

        if clears {
            Self {
                name,
                lifespan_count: 0,
                parameters: Map::new(),
            }
        } else {
            Self {
                name,
                lifespan_count: lifespan,
                parameters,
            }
        }
    }

    pub fn is_clearing(&self) -> bool {
        self.lifespan_count == 0
    }
}

/// LINE buttons template wrapped as a Dialogflow custom payload. Each option
/// becomes a message action that sends its own label.
pub fn line_buttons<S: AsRef<str>>(text: &str, options: &[S]) -> Value {
    let actions: Vec<Value> = options
        .iter()
        .map(|o| json!({ "type": "message", "label": o.as_ref(), "text": o.as_ref() }))
        .collect();

    json!({
        "payload": {
            "line": {
                "type": "template",
                "altText": text,
                "template": {
                    "type": "buttons",
                    "text": text,
                    "actions": actions
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Value {
        json!({
            "responseId": "r-1",
            "session": "projects/p/agent/sessions/s-1",
            "queryResult": {
                "queryText": "2",
                "intent": { "displayName": "Default Fallback Intent" },
                "parameters": {},
                "outputContexts": [
                    { "name": "projects/p/agent/sessions/s-1/contexts/other", "parameters": { "x": 1 } },
                    {
                        "name": "projects/p/agent/sessions/s-1/contexts/spec-context",
                        "lifespanCount": 4,
                        "parameters": { "await_heat_question": true }
                    }
                ]
            },
            "originalDetectIntentRequest": {
                "source": "line",
                "payload": { "data": { "source": { "userId": "U123", "type": "user" } } }
            }
        })
    }

    #[test]
    fn test_parse_request() {
        let request: WebhookRequest = serde_json::from_value(sample_request()).unwrap();
        assert_eq!(request.query_text(), "2");
        assert_eq!(request.intent_name(), "Default Fallback Intent");
        assert_eq!(request.spec_context_params()["await_heat_question"], true);
        assert_eq!(request.line_user_id(), Some("U123"));
    }

    #[test]
    fn test_minimal_request_defaults() {
        let request: WebhookRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.query_text(), "");
        assert!(request.spec_context_params().is_empty());
        assert!(request.line_user_id().is_none());
    }

    #[test]
    fn test_spec_context_clearing() {
        let cleared = OutputContext::spec("s", Map::new(), 5);
        assert_eq!(cleared.name, "s/contexts/spec-context");
        assert!(cleared.is_clearing());

        let mut params = Map::new();
        params.insert("await_spec_selection".into(), Value::Bool(false));
        params.insert("spec_options".into(), json!([]));
        let cleared = OutputContext::spec("s", params, 5);
        assert!(cleared.is_clearing());
        assert!(cleared.parameters.is_empty());

        let mut params = Map::new();
        params.insert("await_heat_question".into(), Value::Bool(true));
        let kept = OutputContext::spec("s", params, 5);
        assert_eq!(kept.lifespan_count, 5);
    }

    #[test]
    fn test_response_serialization() {
        let response = WebhookResponse::buttons("請選擇規範類別", &["查管支撐", "查保溫"])
            .with_context(OutputContext::spec("s", Map::new(), 5));
        let json = serde_json::to_value(&response).unwrap();

        assert!(json.get("fulfillmentText").is_none());
        let line = &json["fulfillmentMessages"][0]["payload"]["line"];
        assert_eq!(line["altText"], "請選擇規範類別");
        assert_eq!(line["template"]["actions"][1]["text"], "查保溫");
        assert_eq!(json["outputContexts"][0]["lifespanCount"], 0);
        assert_eq!(response.display_text(), Some("請選擇規範類別"));
    }
}
