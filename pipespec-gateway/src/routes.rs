//! Route definitions for PipeSpec Gateway.
//!
//! Provides the Dialogflow fulfillment endpoint and health checks.

use axum::{body::Bytes, extract::State, response::Json, routing::{get, post}, Router};
use chrono::Utc;
use pipespec_common::logging::generate_trace_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

use crate::dialogflow::{WebhookRequest, WebhookResponse};
use crate::replies;
use crate::router::{Inbound, IntentRouter};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<IntentRouter>,
}

impl AppState {
    pub fn new(router: IntentRouter) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Readiness response with what the router has to work with.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub service: String,
    pub corpus: CorpusStats,
    pub llm_configured: bool,
    pub push_enabled: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusStats {
    pub piping_chapters: usize,
    pub piping_sections: usize,
    pub heat_treatment_chapters: usize,
    pub heat_treatment_sections: usize,
    pub links: usize,
}

/// Build all routes.
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook
// ─────────────────────────────────────────────────────────────────────────────

/// Parse the raw body. Anything that is not a JSON object in the expected
/// shape is a format error.
fn parse_request(body: &[u8]) -> Result<WebhookRequest, String> {
    let value: Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, got {}", json_type(&value)));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Dialogflow fulfillment. Always answers 200 with a fulfillment body.
async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> Json<WebhookResponse> {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(reason) => {
            tracing::warn!(reason = %reason, "Rejecting malformed webhook payload");
            return Json(WebhookResponse::text(replies::FORMAT_ERROR));
        }
    };

    let inbound = Inbound::from_request(&request);
    let trace_id = generate_trace_id();
    let span = pipespec_common::request_span!(
        "webhook",
        trace_id,
        session = %inbound.session,
        intent = %inbound.intent
    );

    let response = state.router.handle(inbound, Utc::now()).instrument(span).await;
    Json(response)
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "pipespec-gateway".into(),
    })
}

async fn ready_handler(State(state): State<AppState>) -> Json<ReadyResponse> {
    let knowledge = state.router.knowledge();
    Json(ReadyResponse {
        status: "ready".into(),
        service: "pipespec-gateway".into(),
        corpus: CorpusStats {
            piping_chapters: knowledge.piping.chapter_count(),
            piping_sections: knowledge.piping.section_count(),
            heat_treatment_chapters: knowledge.heat_treatment.chapter_count(),
            heat_treatment_sections: knowledge.heat_treatment.section_count(),
            links: knowledge.links.len(),
        },
        llm_configured: state.router.assistant().is_enabled(),
        push_enabled: state.router.push_enabled(),
        active_sessions: state.router.active_sessions().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_rejects_non_objects() {
        assert!(parse_request(b"[1, 2]").unwrap_err().contains("array"));
        assert!(parse_request(b"\"hi\"").unwrap_err().contains("string"));
        assert!(parse_request(b"not json").is_err());
        assert!(parse_request(b"").is_err());
    }

    #[test]
    fn test_parse_request_rejects_wrong_shape() {
        assert!(parse_request(br#"{"queryResult": {"queryText": 5}}"#).is_err());
    }

    #[test]
    fn test_parse_request_accepts_minimal_object() {
        let request = parse_request(br#"{"session": "s"}"#).unwrap();
        assert_eq!(request.session, "s");
    }
}
