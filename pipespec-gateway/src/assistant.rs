//! Generative answers: prompts and sampling settings for every place the
//! webhook asks the model for text.

use crate::provider::{ChatRequest, Message, Provider, ProviderError};
use std::sync::Arc;

const TRANSLATE_PROMPT: &str = "請將下面的中文工程問題翻譯為簡潔精確的英文，供資料比對使用。";

const SPEC_EXPERT_PROMPT: &str = "你是配管設計專家，只回答與配管規範相關的問題。";

const SUMMARIZE_PROMPT: &str =
    "你是配管設計專家，請將以下配管規範內容進行條列式重點整理，保留原意並清楚簡明。";

const PIPING_CLASS_PROMPT: &str = "你是配管設計專家，只回答與工程規範、標準圖或施工標準相關的問題，請根據使用者的問題提供清楚簡潔的回答。";

const CONVERSATION_PROMPT: &str = "你是配管設計專家，具有十年以上工業配管、設備及鋼構設計經驗，熟悉ASME、JIS、API等相關標準與施工規範。
回答時請保持專業且簡潔明瞭，避免過度冗長。
回答內容須具體且技術性強，並以正式且禮貌的語氣回覆。
如果問題超出規範範圍，請禮貌告知並建議相關查詢方向。
請避免提供與工程設計無關的資訊。
請在回答中盡量包含標準編號、法規條文或標準圖引用。
若使用專有名詞，請適當解釋以確保清晰易懂。";

/// Why a generative answer could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("no LLM API key configured")]
    NotConfigured,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("model returned an empty answer")]
    EmptyAnswer,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sampling {
    max_tokens: Option<i64>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    frequency_penalty: Option<f64>,
    presence_penalty: Option<f64>,
}

/// Model-backed helper shared by the router and background push tasks.
#[derive(Clone)]
pub struct Assistant {
    provider: Option<Arc<dyn Provider>>,
    model: String,
}

impl Assistant {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
        }
    }

    /// An assistant whose every call fails with [`AssistantError::NotConfigured`].
    pub fn disabled(model: impl Into<String>) -> Self {
        Self {
            provider: None,
            model: model.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        sampling: Sampling,
    ) -> Result<String, AssistantError> {
        let provider = self.provider.as_ref().ok_or(AssistantError::NotConfigured)?;

        let response = provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages,
                max_tokens: sampling.max_tokens,
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                frequency_penalty: sampling.frequency_penalty,
                presence_penalty: sampling.presence_penalty,
                system: Some(system.to_string()),
            })
            .await?;

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AssistantError::EmptyAnswer);
        }
        tracing::debug!(
            provider = provider.name(),
            model = %response.model,
            chars = answer.chars().count(),
            "Model answered"
        );
        Ok(answer.to_string())
    }

    /// Translate a Chinese engineering question to English for a second
    /// matcher pass.
    pub async fn translate_to_english(&self, query: &str) -> Result<String, AssistantError> {
        self.complete(
            TRANSLATE_PROMPT,
            vec![Message::user(query)],
            Sampling {
                temperature: Some(0.2),
                ..Default::default()
            },
        )
        .await
    }

    /// Free-text answer when no corpus section matched.
    pub async fn answer_spec_question(&self, query: &str) -> Result<String, AssistantError> {
        self.complete(
            SPEC_EXPERT_PROMPT,
            vec![Message::user(query)],
            Sampling {
                max_tokens: Some(350),
                temperature: Some(0.4),
                top_p: Some(1.0),
                ..Default::default()
            },
        )
        .await
    }

    /// Bullet-point summary of a long section.
    pub async fn summarize_section(&self, content: &str) -> Result<String, AssistantError> {
        self.complete(
            SUMMARIZE_PROMPT,
            vec![Message::user(content)],
            Sampling {
                max_tokens: Some(400),
                temperature: Some(0.3),
                top_p: Some(0.8),
                ..Default::default()
            },
        )
        .await
    }

    /// Single-turn answer about piping classes and engineering standards.
    pub async fn answer_piping_class(&self, query: &str) -> Result<String, AssistantError> {
        self.complete(
            PIPING_CLASS_PROMPT,
            vec![Message::user(query)],
            Sampling {
                max_tokens: Some(400),
                temperature: Some(0.4),
                top_p: Some(1.0),
                ..Default::default()
            },
        )
        .await
    }

    /// Piping-class follow-up answered with the conversation so far.
    pub async fn answer_piping_class_followup(
        &self,
        history: &[Message],
    ) -> Result<String, AssistantError> {
        self.complete(
            CONVERSATION_PROMPT,
            history.to_vec(),
            Sampling {
                max_tokens: Some(400),
                temperature: Some(0.3),
                top_p: Some(1.0),
                ..Default::default()
            },
        )
        .await
    }

    /// General expert conversation over the session history. The history
    /// already ends with the current user turn.
    pub async fn converse(&self, history: &[Message]) -> Result<String, AssistantError> {
        self.complete(
            CONVERSATION_PROMPT,
            history.to_vec(),
            Sampling {
                max_tokens: Some(400),
                temperature: Some(0.4),
                top_p: Some(1.0),
                frequency_penalty: Some(0.1),
                presence_penalty: Some(0.0),
            },
        )
        .await
    }
}
