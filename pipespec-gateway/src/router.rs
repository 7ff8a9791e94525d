//! Intent router: turns one webhook turn into a fulfillment response.
//!
//! A pending selection menu takes priority over the detected intent. Every
//! failure of an outbound call ends up as user-facing text; nothing here
//! returns an error to the HTTP layer.

use chrono::{DateTime, Utc};
use pipespec_common::config::Config;
use pipespec_common::util::sanitize_for_log;
use pipespec_core::{
    normalize, parse_grade_code, DownloadLinks, LinkTable, MatchOutcome, SpecCorpus, SpecMatcher,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::Instrument;

use crate::assistant::Assistant;
use crate::context::{AwaitFlag, SpecContext};
use crate::dialogflow::{OutputContext, WebhookRequest, WebhookResponse};
use crate::intent::Intent;
use crate::provider::Message;
use crate::push::PushChannel;
use crate::replies;
use crate::selection::{PendingSelection, Selection};
use crate::session::{SessionState, SessionStore};

// ============================================================================
// Inputs
// ============================================================================

/// Static documents the router answers from.
#[derive(Debug, Clone, Default)]
pub struct Knowledge {
    pub piping: Arc<SpecCorpus>,
    pub heat_treatment: Arc<SpecCorpus>,
    pub links: LinkTable,
    pub downloads: DownloadLinks,
}

impl Knowledge {
    /// Load every document, degrading missing or malformed files to empty
    /// ones.
    pub fn load(config: &Config) -> Self {
        let corpus = &config.corpus;
        Self {
            piping: Arc::new(SpecCorpus::load_or_empty(
                &corpus.piping_specification,
                "piping_specification",
            )),
            heat_treatment: Arc::new(SpecCorpus::load_or_empty(&corpus.heat_treatment, "heat_treatment")),
            links: LinkTable::load_or_empty(&corpus.links),
            downloads: DownloadLinks::from_entries(&config.download_links),
        }
    }
}

/// Tunables taken from configuration.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// `lifespanCount` of contexts the router keeps alive
    pub context_lifespan: u32,
    /// Selected sections longer than this (in chars) get a model summary
    pub summarize_over_chars: usize,
    /// Session history bound (user + assistant messages)
    pub max_messages: usize,
    /// Words that open the support/insulation menus
    pub dialog_keywords: Vec<String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RouterSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            context_lifespan: config.session.context_lifespan,
            summarize_over_chars: config.matcher.summarize_over_chars,
            max_messages: config.session.max_messages,
            dialog_keywords: config.matcher.keywords.clone(),
        }
    }
}

/// The parts of a webhook request the router acts on.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub session: String,
    pub query: String,
    pub intent: Intent,
    pub context: SpecContext,
    pub line_user: Option<String>,
}

impl Inbound {
    pub fn from_request(request: &WebhookRequest) -> Self {
        Self {
            session: request.session.clone(),
            query: request.query_text().to_string(),
            intent: Intent::from_display_name(request.intent_name()),
            context: SpecContext::new(request.spec_context_params()),
            line_user: request.line_user_id().map(str::to_string),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub struct IntentRouter {
    pub(crate) knowledge: Knowledge,
    matcher: SpecMatcher,
    assistant: Assistant,
    sessions: Arc<dyn SessionStore>,
    push: Option<Arc<dyn PushChannel>>,
    pub(crate) settings: RouterSettings,
}

impl IntentRouter {
    pub fn new(
        knowledge: Knowledge,
        matcher: SpecMatcher,
        assistant: Assistant,
        sessions: Arc<dyn SessionStore>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            knowledge,
            matcher,
            assistant,
            sessions,
            push: None,
            settings,
        }
    }

    /// Deliver general conversation answers out of band when the request
    /// identifies a push recipient.
    pub fn with_push(mut self, push: Arc<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    /// Handle one turn.
    pub async fn handle(&self, inbound: Inbound, now: DateTime<Utc>) -> WebhookResponse {
        tracing::info!(query = %sanitize_for_log(&inbound.query), "Handling webhook turn");

        if inbound.context.awaiting_selection() {
            return self.handle_selection(&inbound).await;
        }

        match &inbound.intent {
            Intent::StartHeatTreatmentQa => self.start_mode(
                &inbound,
                replies::HEAT_TREATMENT_PROMPT,
                AwaitFlag::HeatQuestion,
            ),
            Intent::PromptPipingClass => self.start_mode(
                &inbound,
                replies::PIPING_CLASS_PROMPT,
                AwaitFlag::PipingClassDownload,
            ),
            Intent::DownloadPipingClass => self.lookup_grade(&inbound.query),
            Intent::StartCommonSpecQa => self.start_mode(
                &inbound,
                replies::COMMON_SPEC_PROMPT,
                AwaitFlag::CommonSpecQuestion,
            ),
            Intent::SupportInsulationSpec => self.support_dialog(&inbound),
            Intent::PipingClassQuestion => self.piping_class_question(&inbound).await,
            Intent::Fallback => self.fallback(&inbound, now).await,
            Intent::Other(_) => {
                self.spec_reply(&inbound, &self.knowledge.piping, replies::DESC_PIPING_DEFAULT)
                    .await
            }
        }
    }

    /// Spec context for `session`; empty parameters clear it.
    pub(crate) fn spec_context(&self, session: &str, params: Map<String, Value>) -> OutputContext {
        OutputContext::spec(session, params, self.settings.context_lifespan)
    }

    fn start_mode(&self, inbound: &Inbound, prompt: &str, flag: AwaitFlag) -> WebhookResponse {
        WebhookResponse::text(prompt).with_context(self.spec_context(&inbound.session, flag.params()))
    }

    // ------------------------------------------------------------------------
    // Pending selection
    // ------------------------------------------------------------------------

    async fn handle_selection(&self, inbound: &Inbound) -> WebhookResponse {
        let Some(menu) = PendingSelection::from_params(inbound.context.params()) else {
            tracing::debug!("Selection context has no usable options");
            return WebhookResponse::text(replies::SELECTION_EXPIRED)
                .with_context(self.spec_context(&inbound.session, Map::new()));
        };

        match menu.select(&inbound.query) {
            Selection::Picked { label, text } => {
                let reply = if text.chars().count() > self.settings.summarize_over_chars {
                    match self.assistant.summarize_section(text).await {
                        Ok(summary) => replies::selection_summary(label, &summary, text),
                        Err(e) => {
                            tracing::warn!(error = %e, "Section summary failed, sending full text");
                            replies::selection_detail(label, text)
                        }
                    }
                } else {
                    replies::selection_detail(label, text)
                };
                WebhookResponse::text(reply)
                    .with_context(self.spec_context(&inbound.session, Map::new()))
            }
            Selection::OutOfRange => WebhookResponse::text(replies::selection_out_of_range(menu.len()))
                .with_context(self.spec_context(&inbound.session, menu.to_params())),
            Selection::NotANumber => WebhookResponse::text(replies::SELECTION_NOT_A_NUMBER),
        }
    }

    // ------------------------------------------------------------------------
    // Spec matching
    // ------------------------------------------------------------------------

    /// Match the query against `corpus`, retrying once with an English
    /// translation, and fall back to a model answer when nothing matches.
    async fn spec_reply(&self, inbound: &Inbound, corpus: &Arc<SpecCorpus>, desc: &str) -> WebhookResponse {
        let query = inbound.query.as_str();
        let mut outcome = self.find_matches(query, corpus).await;

        if outcome.is_empty() && !normalize(query).is_empty() {
            match self.assistant.translate_to_english(query).await {
                Ok(english) => {
                    tracing::debug!(translated = %sanitize_for_log(&english), "Retrying match in English");
                    outcome = self.find_matches(&english, corpus).await;
                }
                Err(e) => tracing::warn!(error = %e, "Translation failed, skipping retry"),
            }
        }

        if !outcome.is_empty() {
            tracing::info!(matches = outcome.total(), corpus = desc, "Spec matches found");
            let menu = PendingSelection::new(outcome.options());
            return WebhookResponse::text(replies::spec_matches(
                desc,
                outcome.total(),
                &outcome.summary(),
            ))
            .with_context(self.spec_context(&inbound.session, menu.to_params()));
        }

        let reply = self
            .assistant
            .answer_spec_question(query)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Spec answer failed");
                replies::APOLOGY.to_string()
            });
        WebhookResponse::text(reply)
    }

    /// Run the matcher on the blocking pool; scoring long sections is CPU
    /// bound.
    async fn find_matches(&self, query: &str, corpus: &Arc<SpecCorpus>) -> MatchOutcome {
        let matcher = self.matcher.clone();
        let corpus = Arc::clone(corpus);
        let query = query.to_string();
        let span = tracing::Span::current();
        match tokio::task::spawn_blocking(move || span.in_scope(|| matcher.find(&query, &corpus))).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Matcher task failed");
                MatchOutcome::default()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Link lookups
    // ------------------------------------------------------------------------

    fn lookup_grade(&self, query: &str) -> WebhookResponse {
        let Some(code) = parse_grade_code(query) else {
            return WebhookResponse::text(replies::GRADE_INVALID);
        };

        match self.knowledge.links.get(&code) {
            Some(link) => WebhookResponse::text(replies::grade_found(&code, link)),
            None => WebhookResponse::text(replies::grade_not_found(&code)),
        }
    }

    // ------------------------------------------------------------------------
    // Model answers
    // ------------------------------------------------------------------------

    async fn piping_class_question(&self, inbound: &Inbound) -> WebhookResponse {
        let reply = self
            .assistant
            .answer_piping_class(&inbound.query)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Piping class answer failed");
                replies::APOLOGY.to_string()
            });

        WebhookResponse::text(reply).with_context(
            self.spec_context(&inbound.session, AwaitFlag::PipingClassQuestion.params()),
        )
    }

    /// Session-backed conversation, re-routed by whichever Q&A mode the
    /// context says is active.
    async fn fallback(&self, inbound: &Inbound, now: DateTime<Utc>) -> WebhookResponse {
        let max = self.settings.max_messages;

        if replies::RESET_COMMANDS.contains(&inbound.query.trim()) {
            self.sessions.remove(&inbound.session).await;
            tracing::info!("Conversation reset");
            return WebhookResponse::text(replies::RESET_DONE);
        }

        let mut state = self.sessions.load(&inbound.session, now).await;

        state.push(Message::user(inbound.query.as_str()), max);
        state.last_seen = now;
        let reminder = if state.is_full(max) {
            replies::history_full_reminder(max / 2)
        } else {
            String::new()
        };
        self.sessions.save(&inbound.session, state.clone()).await;

        let context = &inbound.context;
        if context.is_set(AwaitFlag::HeatQuestion) {
            return self
                .spec_reply(inbound, &self.knowledge.heat_treatment, replies::DESC_HEAT_QA)
                .await;
        }
        if context.is_set(AwaitFlag::CommonSpecQuestion) {
            return self
                .spec_reply(inbound, &self.knowledge.piping, replies::DESC_PIPING_QA)
                .await;
        }
        if context.is_set(AwaitFlag::PipingClassDownload) {
            return self.lookup_grade(&inbound.query);
        }
        if context.is_set(AwaitFlag::PipingClassQuestion) {
            let reply = self
                .assistant
                .answer_piping_class_followup(&state.messages)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Piping class follow-up failed");
                    replies::APOLOGY.to_string()
                });
            return WebhookResponse::text(reply);
        }

        let conversation = Conversation {
            assistant: self.assistant.clone(),
            sessions: Arc::clone(&self.sessions),
            session: inbound.session.clone(),
            max_messages: max,
        };

        if let (Some(push), Some(user)) = (&self.push, inbound.line_user.as_deref()) {
            let push = Arc::clone(push);
            let user = user.to_string();
            let history = state.messages;
            tokio::spawn(
                async move {
                    let text = conversation.answer(&history, &reminder, now).await;
                    if let Err(e) = push.push_text(&user, &text).await {
                        tracing::error!(channel = push.name(), error = %e, "Push delivery failed");
                    }
                }
                .instrument(tracing::Span::current()),
            );
            return WebhookResponse::text(replies::ASYNC_ACK);
        }

        WebhookResponse::text(conversation.answer(&state.messages, &reminder, now).await)
    }
}

/// What a general conversation answer needs, detached from the router so it
/// can move into a background task.
struct Conversation {
    assistant: Assistant,
    sessions: Arc<dyn SessionStore>,
    session: String,
    max_messages: usize,
}

impl Conversation {
    /// Ask the model and record its answer in the session.
    async fn answer(&self, history: &[Message], reminder: &str, now: DateTime<Utc>) -> String {
        match self.assistant.converse(history).await {
            Ok(answer) => {
                let mut state: SessionState = self.sessions.load(&self.session, now).await;
                state.push(Message::assistant(answer.as_str()), self.max_messages);
                state.last_seen = now;
                self.sessions.save(&self.session, state).await;
                format!("{reminder}{answer}")
            }
            Err(e) => {
                tracing::warn!(error = %e, "Conversation answer failed");
                replies::APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::assistant::testing::ScriptedProvider;
    use crate::session::InMemorySessionStore;
    use std::collections::HashMap;

    pub const SESSION: &str = "projects/p/agent/sessions/s-1";

    const PIPING: &str = r#"{
        "3": { "title": "試壓", "content": {
            "3.1": "水壓試驗壓力應為設計壓力之 1.5 倍",
            "3.2": "氣壓試驗壓力應為設計壓力之 1.1 倍"
        } }
    }"#;

    const HEAT: &str = r#"{
        "2": { "title": "熱處理", "content": { "2.1": "P1 材料預熱溫度 80°C 以上" } }
    }"#;

    pub struct Fixture {
        pub router: IntentRouter,
        pub provider: Arc<ScriptedProvider>,
        pub sessions: Arc<InMemorySessionStore>,
    }

    pub fn fixture(answers: &[&str]) -> Fixture {
        let links: HashMap<String, String> = [
            ("TYPE05", "https://x/type05"),
            ("M03", "https://x/m03"),
            ("A012", "https://x/a012"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = Config::default();
        let knowledge = Knowledge {
            piping: Arc::new(SpecCorpus::from_json_str(PIPING).unwrap()),
            heat_treatment: Arc::new(SpecCorpus::from_json_str(HEAT).unwrap()),
            links: LinkTable::new(links),
            downloads: DownloadLinks::from_entries(&config.download_links),
        };

        let provider = Arc::new(ScriptedProvider::new(answers));
        let sessions = Arc::new(InMemorySessionStore::from_secs(300));
        let settings = RouterSettings {
            max_messages: 4,
            ..RouterSettings::default()
        };
        let router = IntentRouter::new(
            knowledge,
            SpecMatcher::from_config(&config.matcher),
            Assistant::new(provider.clone(), "gpt-3.5-turbo"),
            sessions.clone(),
            settings,
        );

        Fixture {
            router,
            provider,
            sessions,
        }
    }

    pub fn inbound(intent: Intent, query: &str, context: Value) -> Inbound {
        Inbound {
            session: SESSION.into(),
            query: query.into(),
            intent,
            context: match context {
                Value::Object(params) => SpecContext::new(params),
                _ => SpecContext::default(),
            },
            line_user: None,
        }
    }

    pub fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::push::{ChannelError, ChannelResult};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn text(response: &WebhookResponse) -> &str {
        response.fulfillment_text.as_deref().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_start_modes_set_flags() {
        let f = fixture(&[]);
        let response = f
            .router
            .handle(inbound(Intent::StartHeatTreatmentQa, "熱處理", json!({})), at(0))
            .await;
        assert_eq!(text(&response), replies::HEAT_TREATMENT_PROMPT);
        let ctx = &response.output_contexts[0];
        assert_eq!(ctx.name, format!("{SESSION}/contexts/spec-context"));
        assert_eq!(ctx.lifespan_count, 5);
        assert_eq!(ctx.parameters["await_heat_question"], true);
    }

    #[tokio::test]
    async fn test_other_intent_offers_matches() {
        let f = fixture(&[]);
        let response = f
            .router
            .handle(inbound(Intent::Other("詢問試壓".into()), "設計壓力", json!({})), at(0))
            .await;

        assert_eq!(
            text(&response),
            "根據《企業配管共同規範》，找到 2 筆相關內容：\n1. 第3章 試壓 - 3.1\n2. 第3章 試壓 - 3.2\n請輸入對應的項目編號查看詳細內容（例如輸入 1）"
        );
        let params = &response.output_contexts[0].parameters;
        assert_eq!(params["await_spec_selection"], true);
        assert_eq!(params["spec_options"][1][0], "第3章 試壓 - 3.2");
        assert_eq!(f.provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_no_match_translates_then_answers() {
        let f = fixture(&["valve torque table", "請參考閥門製造商資料"]);
        let response = f
            .router
            .handle(inbound(Intent::Other("x".into()), "閥門扭力規格", json!({})), at(0))
            .await;

        assert_eq!(text(&response), "請參考閥門製造商資料");
        assert!(response.output_contexts.is_empty());
        assert_eq!(f.provider.request_count(), 2);
        assert_eq!(f.provider.request(0).temperature, Some(0.2));
        assert_eq!(f.provider.request(1).max_tokens, Some(350));
    }

    #[tokio::test]
    async fn test_no_match_and_model_down_apologises() {
        let f = fixture(&[]);
        let response = f
            .router
            .handle(inbound(Intent::Other("x".into()), "閥門扭力規格", json!({})), at(0))
            .await;
        assert_eq!(text(&response), replies::APOLOGY);
    }

    #[tokio::test]
    async fn test_selection_picks_and_clears() {
        let f = fixture(&[]);
        let context = json!({
            "await_spec_selection": true,
            "spec_options": [["第3章 試壓 - 3.1", "水壓試驗"], ["第3章 試壓 - 3.2", "氣壓試驗"]]
        });
        let response = f
            .router
            .handle(inbound(Intent::Fallback, "2", context), at(0))
            .await;

        assert_eq!(text(&response), "📘 您選擇的是：第3章 試壓 - 3.2\n內容如下：\n氣壓試驗");
        assert!(response.output_contexts[0].is_clearing());
        // The selection never reaches the conversation history
        assert!(f.sessions.load(SESSION, at(0)).await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_selection_summarises_long_content() {
        let long = "管".repeat(301);
        let context = json!({
            "await_spec_selection": true,
            "spec_options": [["第9章 長條文 - 9.1", long]]
        });

        let f = fixture(&["- 重點一"]);
        let response = f
            .router
            .handle(inbound(Intent::Fallback, "1", context.clone()), at(0))
            .await;
        assert!(text(&response).contains("📌 **重點整理：**\n- 重點一"));
        assert!(text(&response).ends_with(&long));
        assert_eq!(f.provider.request(0).top_p, Some(0.8));

        let f = fixture(&[]);
        let response = f.router.handle(inbound(Intent::Fallback, "1", context), at(0)).await;
        assert!(text(&response).starts_with("📘 您選擇的是：第9章 長條文 - 9.1\n內容如下：\n"));
    }

    #[tokio::test]
    async fn test_selection_rejects_bad_input() {
        let f = fixture(&[]);
        let context = json!({
            "await_spec_selection": true,
            "spec_options": [["a", "A"], ["b", "B"]]
        });

        let response = f
            .router
            .handle(inbound(Intent::Fallback, "3", context.clone()), at(0))
            .await;
        assert_eq!(text(&response), "請輸入有效的數字（例如 1~2）");
        let kept = &response.output_contexts[0];
        assert_eq!(kept.lifespan_count, 5);
        assert_eq!(kept.parameters["spec_options"], context["spec_options"]);

        let response = f
            .router
            .handle(inbound(Intent::Fallback, "第一個", context), at(0))
            .await;
        assert_eq!(text(&response), replies::SELECTION_NOT_A_NUMBER);
        assert!(response.output_contexts.is_empty());
    }

    #[tokio::test]
    async fn test_selection_without_options_expires() {
        let f = fixture(&[]);
        for context in [
            json!({ "await_spec_selection": true }),
            json!({ "await_spec_selection": true, "spec_options": [[1, 2]] }),
        ] {
            let response = f.router.handle(inbound(Intent::Fallback, "1", context), at(0)).await;
            assert_eq!(text(&response), replies::SELECTION_EXPIRED);
            assert!(response.output_contexts[0].is_clearing());
        }
    }

    #[tokio::test]
    async fn test_grade_lookup() {
        let f = fixture(&[]);
        let cases = [
            ("a012", "這是管線等級 A012 的對應連結：\nhttps://x/a012".to_string()),
            ("B012", replies::grade_not_found("B012")),
            ("等級", replies::GRADE_INVALID.to_string()),
        ];
        for (query, expected) in cases {
            let response = f
                .router
                .handle(inbound(Intent::DownloadPipingClass, query, json!({})), at(0))
                .await;
            assert_eq!(text(&response), expected);
        }
    }

    #[tokio::test]
    async fn test_piping_class_question_keeps_mode() {
        let f = fixture(&["A012 為碳鋼管線等級"]);
        let response = f
            .router
            .handle(inbound(Intent::PipingClassQuestion, "A012 是什麼", json!({})), at(0))
            .await;
        assert_eq!(text(&response), "A012 為碳鋼管線等級");
        assert_eq!(response.output_contexts[0].parameters["await_pipeclass_question"], true);
    }

    #[tokio::test]
    async fn test_fallback_truncates_history_and_reminds() {
        let f = fixture(&["a1", "a2", "a3"]);

        let first = f.router.handle(inbound(Intent::Fallback, "q1", json!({})), at(0)).await;
        assert_eq!(text(&first), "a1");

        f.router.handle(inbound(Intent::Fallback, "q2", json!({})), at(10)).await;
        let state = f.sessions.load(SESSION, at(10)).await;
        assert_eq!(state.messages.len(), 4);

        let third = f.router.handle(inbound(Intent::Fallback, "q3", json!({})), at(20)).await;
        assert!(text(&third).starts_with("⚠️ 您的對話已超過 2 輪"));
        assert!(text(&third).ends_with("a3"));

        let state = f.sessions.load(SESSION, at(20)).await;
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[0], Message::user("q2"));
        assert_eq!(state.messages[3], Message::assistant("a3"));

        // The model saw the bounded history ending with the current question
        let sent = f.provider.request(2).messages;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent.last(), Some(&Message::user("q3")));
    }

    #[tokio::test]
    async fn test_fallback_resets_idle_session() {
        let f = fixture(&["a1", "a2"]);
        f.router.handle(inbound(Intent::Fallback, "q1", json!({})), at(0)).await;
        f.router.handle(inbound(Intent::Fallback, "q2", json!({})), at(301)).await;

        assert_eq!(f.provider.request(1).messages, vec![Message::user("q2")]);
        let state = f.sessions.load(SESSION, at(301)).await;
        assert_eq!(state.messages, vec![Message::user("q2"), Message::assistant("a2")]);
    }

    #[tokio::test]
    async fn test_reset_command_clears_history() {
        let f = fixture(&["a1"]);
        f.router.handle(inbound(Intent::Fallback, "q1", json!({})), at(0)).await;
        let response = f
            .router
            .handle(inbound(Intent::Fallback, " 重設對話 ", json!({})), at(5))
            .await;

        assert_eq!(text(&response), replies::RESET_DONE);
        assert_eq!(f.sessions.len().await, 0);
        assert!(f.sessions.load(SESSION, at(5)).await.messages.is_empty());
        assert_eq!(f.provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_reroutes_by_mode() {
        let f = fixture(&[]);
        let response = f
            .router
            .handle(
                inbound(Intent::Fallback, "預熱溫度", json!({ "await_heat_question": true })),
                at(0),
            )
            .await;
        assert!(text(&response).starts_with("根據《詢問熱處理規範》，找到 1 筆相關內容："));

        let response = f
            .router
            .handle(
                inbound(Intent::Fallback, "A012", json!({ "await_pipinclass_download": true })),
                at(0),
            )
            .await;
        assert_eq!(text(&response), "這是管線等級 A012 的對應連結：\nhttps://x/a012");
    }

    #[tokio::test]
    async fn test_failed_answer_is_not_recorded() {
        let f = fixture(&[]);
        let response = f.router.handle(inbound(Intent::Fallback, "q1", json!({})), at(0)).await;
        assert_eq!(text(&response), replies::APOLOGY);
        let state = f.sessions.load(SESSION, at(0)).await;
        assert_eq!(state.messages, vec![Message::user("q1")]);
    }

    /// Records every delivery attempt; `reject` makes each one fail after
    /// recording it.
    struct RecordingPush {
        tx: mpsc::UnboundedSender<(String, String)>,
        reject: bool,
    }

    #[async_trait]
    impl PushChannel for RecordingPush {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn push_text(&self, to: &str, text: &str) -> ChannelResult<()> {
            self.tx
                .send((to.to_string(), text.to_string()))
                .map_err(|e| ChannelError::Connection(e.to_string()))?;
            if self.reject {
                return Err(ChannelError::SendFailed("LINE API error (400): bad recipient".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fallback_pushes_answer_out_of_band() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let f = fixture(&["依 ASME B31.3 辦理"]);
        let router = f.router.with_push(Arc::new(RecordingPush { tx, reject: false }));

        let mut turn = inbound(Intent::Fallback, "試壓依據？", json!({}));
        turn.line_user = Some("U123".into());
        let response = router.handle(turn, at(0)).await;
        assert_eq!(text(&response), replies::ASYNC_ACK);

        let (to, pushed) = rx.recv().await.unwrap();
        assert_eq!(to, "U123");
        assert_eq!(pushed, "依 ASME B31.3 辦理");

        let state = f.sessions.load(SESSION, at(0)).await;
        assert_eq!(state.messages.last(), Some(&Message::assistant("依 ASME B31.3 辦理")));
    }

    #[tokio::test]
    async fn test_push_needs_a_recipient() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let f = fixture(&["answer"]);
        let router = f.router.with_push(Arc::new(RecordingPush { tx, reject: false }));

        let response = router.handle(inbound(Intent::Fallback, "q", json!({})), at(0)).await;
        assert_eq!(text(&response), "answer");
    }

    #[tokio::test]
    async fn test_failed_push_keeps_the_answer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let f = fixture(&["依 ASME B31.3 辦理", "第二題答案"]);
        let router = f.router.with_push(Arc::new(RecordingPush { tx, reject: true }));

        let mut turn = inbound(Intent::Fallback, "試壓依據？", json!({}));
        turn.line_user = Some("U123".into());
        let response = router.handle(turn, at(0)).await;
        assert_eq!(text(&response), replies::ASYNC_ACK);

        let (to, pushed) = rx.recv().await.unwrap();
        assert_eq!(to, "U123");
        assert_eq!(pushed, "依 ASME B31.3 辦理");

        let state = f.sessions.load(SESSION, at(0)).await;
        assert_eq!(
            state.messages,
            vec![Message::user("試壓依據？"), Message::assistant("依 ASME B31.3 辦理")]
        );

        // the router keeps serving after a failed delivery
        let response = router.handle(inbound(Intent::Fallback, "下一題", json!({})), at(1)).await;
        assert_eq!(text(&response), "第二題答案");
    }
}
