//! Pipe-support / insulation standard dialog.
//!
//! Steps, first applicable wins:
//! 1. a support code (`TYPE05`, `M03`) is looked up in the link table;
//! 2. a download request with category and source known gets the link;
//! 3. a query keyword opens the next missing menu (category, source, next step);
//! 4. a bare source reply completes a remembered category;
//! 5. `詢問內容` asks what to look up;
//! 6. otherwise the category menu is shown and the dialog state cleared.

use pipespec_core::{
    mentions_support_code, parse_support_code, Action, Category, QueryExtraction, Source,
    SupportCodeKind,
};
use serde_json::Map;

use crate::context::dialog_params;
use crate::dialogflow::WebhookResponse;
use crate::replies;
use crate::router::{Inbound, IntentRouter};

const CATEGORY_OPTIONS: [&str; 2] = ["查管支撐", "查保溫"];
const DEFAULT_CATEGORY_OPTIONS: [&str; 2] = ["查詢管支撐", "查詢保溫"];

impl IntentRouter {
    pub(crate) fn support_dialog(&self, inbound: &Inbound) -> WebhookResponse {
        let query = inbound.query.trim();
        let session = inbound.session.as_str();

        if mentions_support_code(query) {
            return self.lookup_support_code(query);
        }

        let remembered = inbound.context.remembered();
        let QueryExtraction {
            category,
            source,
            action,
        } = QueryExtraction::from_query(query).or(remembered);

        tracing::debug!(?category, ?source, ?action, "Support dialog state");

        if let (Some(Action::Download), Some(category), Some(source)) = (action, category, source) {
            return WebhookResponse::text(replies::download_link(
                category.label(),
                source.label(),
                self.download_link(category, source),
            ))
            .with_context(self.spec_context(session, dialog_params(Some(category), None, None)));
        }

        if self.mentions_dialog_keyword(query) {
            return match (category, source) {
                // nothing known yet leaves no params, which clears the context
                // rather than carrying empty ones forward
                (None, _) => WebhookResponse::buttons(replies::CATEGORY_MENU, &CATEGORY_OPTIONS)
                    .with_context(self.spec_context(session, dialog_params(None, source, action))),
                (Some(category), None) => WebhookResponse::buttons(
                    &replies::source_menu(category.label()),
                    &Source::ALL.map(Source::label),
                )
                .with_context(self.spec_context(session, dialog_params(Some(category), None, action))),
                (Some(category), Some(source)) => self
                    .next_step_menu(category, source)
                    .with_context(
                        self.spec_context(session, dialog_params(Some(category), Some(source), None)),
                    ),
            };
        }

        if let Some(source) = Source::from_label(query) {
            return match remembered.category {
                Some(category) if remembered.action == Some(Action::Download) => {
                    WebhookResponse::text(replies::download_link(
                        category.label(),
                        source.label(),
                        self.download_link(category, source),
                    ))
                    .with_context(self.spec_context(
                        session,
                        dialog_params(Some(category), Some(source), Some(Action::Download)),
                    ))
                }
                Some(category) => self.next_step_menu(category, source).with_context(
                    self.spec_context(
                        session,
                        dialog_params(Some(category), Some(source), remembered.action),
                    ),
                ),
                None => WebhookResponse::buttons(
                    replies::CATEGORY_MENU,
                    &Category::ALL.map(Category::label),
                )
                .with_context(
                    self.spec_context(session, dialog_params(None, Some(source), remembered.action)),
                ),
            };
        }

        if query == Action::Inquire.label() {
            return WebhookResponse::text(replies::INQUIRE_PROMPT)
                .with_context(self.spec_context(session, dialog_params(category, None, None)));
        }

        WebhookResponse::buttons(replies::DEFAULT_CATEGORY_MENU, &DEFAULT_CATEGORY_OPTIONS)
            .with_context(self.spec_context(session, Map::new()))
    }

    fn lookup_support_code(&self, query: &str) -> WebhookResponse {
        let Some(code) = parse_support_code(query) else {
            return WebhookResponse::text(replies::SUPPORT_CODE_INVALID);
        };

        let reply = match (self.knowledge.links.get(&code.key), code.kind) {
            (Some(link), SupportCodeKind::Type) => replies::type_code_found(&code.key, link),
            (Some(link), SupportCodeKind::M) => replies::m_code_found(&code.key, link),
            (None, _) => replies::support_code_not_found(&code.key),
        };
        WebhookResponse::text(reply)
    }

    fn download_link(&self, category: Category, source: Source) -> &str {
        self.knowledge
            .downloads
            .get(category, source)
            .unwrap_or(replies::DOWNLOAD_LINK_MISSING)
    }

    fn mentions_dialog_keyword(&self, query: &str) -> bool {
        self.settings
            .dialog_keywords
            .iter()
            .any(|k| !k.is_empty() && query.contains(k.as_str()))
    }

    fn next_step_menu(&self, category: Category, source: Source) -> WebhookResponse {
        WebhookResponse::buttons(
            &replies::next_step_menu(category.label(), source.label()),
            &[
                replies::download_option(category.label(), source.label()),
                Action::Inquire.label().to_string(),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::intent::Intent;
    use crate::replies;
    use crate::router::testing::{at, fixture, inbound};
    use serde_json::{json, Value};

    async fn turn(query: &str, context: Value) -> crate::dialogflow::WebhookResponse {
        fixture(&[])
            .router
            .handle(inbound(Intent::SupportInsulationSpec, query, context), at(0))
            .await
    }

    fn button_labels(response: &crate::dialogflow::WebhookResponse) -> Vec<String> {
        response.fulfillment_messages[0]
            .pointer("/payload/line/template/actions")
            .and_then(Value::as_array)
            .map(|actions| {
                actions
                    .iter()
                    .filter_map(|a| a["label"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_support_code_lookup() {
        let response = turn("TYPE5", json!({})).await;
        assert_eq!(
            response.display_text(),
            Some("這是管支撐規範（塑化）TYPE05 的下載連結：\nhttps://x/type05")
        );

        let response = turn("m3 規範", json!({})).await;
        assert_eq!(response.display_text(), Some("這是管支撐規範 M03 的下載連結：\nhttps://x/m03"));

        let response = turn("TYPE99", json!({})).await;
        assert_eq!(response.display_text(), Some(replies::support_code_not_found("TYPE99").as_str()));
    }

    #[tokio::test]
    async fn test_direct_download() {
        let response = turn("我要下載保溫企業規範", json!({})).await;
        assert_eq!(
            response.display_text(),
            Some("這是 保溫（企業）規範的下載連結：\nhttps://tinyurl.com/2s4cb5cn")
        );
        let params = &response.output_contexts[0].parameters;
        assert_eq!(params["category"], "保溫");
        assert!(params.get("source").is_none());
    }

    #[tokio::test]
    async fn test_keyword_opens_next_menu() {
        let response = turn("查詢規範", json!({})).await;
        assert_eq!(response.display_text(), Some(replies::CATEGORY_MENU));
        assert_eq!(button_labels(&response), ["查管支撐", "查保溫"]);

        let response = turn("查管支撐", json!({})).await;
        assert_eq!(response.display_text(), Some("管支撐：請選擇來源類型"));
        assert_eq!(button_labels(&response), ["企業", "塑化"]);
        assert_eq!(response.output_contexts[0].parameters["category"], "管支撐");

        let response = turn("查", json!({ "category": "保溫", "source": "塑化" })).await;
        assert_eq!(response.display_text(), Some("保溫（塑化）：請選擇下一步"));
        assert_eq!(button_labels(&response), ["下載保溫（塑化）", "詢問內容"]);
    }

    #[tokio::test]
    async fn test_keyword_with_nothing_known_clears_dialog() {
        let response = turn("標準圖", json!({})).await;
        assert_eq!(response.display_text(), Some(replies::CATEGORY_MENU));
        assert_eq!(button_labels(&response), ["查管支撐", "查保溫"]);
        assert!(response.output_contexts[0].is_clearing());
        assert!(response.output_contexts[0].parameters.is_empty());

        // a known source survives the category menu
        let response = turn("標準圖", json!({ "source": "企業" })).await;
        assert_eq!(response.display_text(), Some(replies::CATEGORY_MENU));
        assert!(!response.output_contexts[0].is_clearing());
        assert_eq!(response.output_contexts[0].parameters["source"], "企業");
    }

    #[tokio::test]
    async fn test_bare_source_completes_remembered_category() {
        let response = turn("塑化", json!({ "category": "管支撐", "action": "下載" })).await;
        assert_eq!(
            response.display_text(),
            Some("這是 管支撐（塑化）規範的下載連結：\nhttps://tinyurl.com/5vk67ywh")
        );

        let response = turn("塑化", json!({ "category": "保溫" })).await;
        assert_eq!(response.display_text(), Some("保溫（塑化）：請選擇下一步"));
        let params = &response.output_contexts[0].parameters;
        assert_eq!(params["category"], "保溫");
        assert_eq!(params["source"], "塑化");

        let response = turn("企業", json!({})).await;
        assert_eq!(response.display_text(), Some(replies::CATEGORY_MENU));
        assert_eq!(button_labels(&response), ["管支撐", "保溫"]);
        assert_eq!(response.output_contexts[0].parameters["source"], "企業");
    }

    #[tokio::test]
    async fn test_inquire_and_default_menu() {
        let response = turn("詢問內容", json!({ "category": "管支撐" })).await;
        assert_eq!(response.display_text(), Some(replies::INQUIRE_PROMPT));
        assert_eq!(response.output_contexts[0].parameters["category"], "管支撐");

        let response = turn("你好", json!({ "category": "管支撐" })).await;
        assert_eq!(response.display_text(), Some(replies::DEFAULT_CATEGORY_MENU));
        assert_eq!(button_labels(&response), ["查詢管支撐", "查詢保溫"]);
        assert!(response.output_contexts[0].is_clearing());
    }
}
