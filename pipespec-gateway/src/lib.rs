//! PipeSpec Gateway - Dialogflow fulfillment webhook for piping specifications.
//!
//! This crate provides the HTTP service in front of the spec matcher:
//! - Dialogflow request/response wire types
//! - Intent routing with pending selection menus
//! - Per-session conversation history with idle expiry
//! - Chat-completion fallback and translation
//! - Optional out-of-band answers over the LINE Messaging API
//!
//! ## Architecture
//!
//! ```text
//! Dialogflow → POST /webhook → IntentRouter ─┬→ SpecMatcher (corpus)
//!                                            ├→ LinkTable (codes)
//!                                            ├→ Assistant → OpenAI
//!                                            └→ PushChannel → LINE
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod assistant;
pub mod context;
pub mod dialogflow;
pub mod intent;
pub mod provider;
pub mod push;
pub mod replies;
pub mod router;
pub mod routes;
pub mod selection;
pub mod session;
mod support;

pub use assistant::{Assistant, AssistantError};
pub use dialogflow::{OutputContext, WebhookRequest, WebhookResponse};
pub use intent::Intent;
pub use provider::{ChatRequest, ChatResponse, Message, OpenAIProvider, Provider, ProviderError};
pub use push::{ChannelError, LinePushClient, PushChannel};
pub use router::{Inbound, IntentRouter, Knowledge, RouterSettings};
pub use routes::AppState;
pub use session::{InMemorySessionStore, SessionState, SessionStore};

use axum::Router;
use pipespec_common::config::Config;
use pipespec_common::util::mask_secret;
use pipespec_core::SpecMatcher;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the router and its collaborators from configuration.
pub fn create_state(config: &Config) -> AppState {
    let knowledge = Knowledge::load(config);
    let matcher = SpecMatcher::from_config(&config.matcher);

    let assistant = match config.llm.api_key.as_deref().filter(|_| config.has_llm_key()) {
        Some(key) => {
            tracing::info!(
                api_key = %mask_secret(key),
                model = %config.llm.model,
                base_url = %config.llm.base_url,
                "LLM provider configured"
            );
            let provider =
                OpenAIProvider::with_base_url(key, &config.llm.base_url, config.llm.timeout_secs);
            Assistant::new(Arc::new(provider), &config.llm.model)
        }
        None => {
            tracing::warn!("No OPENAI_API_KEY configured, model answers will fall back to an apology");
            Assistant::disabled(&config.llm.model)
        }
    };

    let sessions = Arc::new(InMemorySessionStore::from_secs(
        config.session.idle_timeout_secs(),
    ));

    let mut router = IntentRouter::new(
        knowledge,
        matcher,
        assistant,
        sessions,
        RouterSettings::from_config(config),
    );

    if config.line.push_enabled() {
        if let Some(token) = config.line.channel_access_token.as_deref() {
            tracing::info!("LINE push replies enabled");
            router = router.with_push(Arc::new(LinePushClient::with_base_url(
                token,
                &config.line.base_url,
            )));
        }
    }

    AppState::new(router)
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::build_routes(state).layer(cors)
}

/// Start the webhook server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = config.bind_address()?;

    let router = build_router(create_state(config));

    tracing::info!("Starting PipeSpec Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
