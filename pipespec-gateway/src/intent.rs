//! Intents recognised by the NLU agent.

/// One variant per intent display name configured in the Dialogflow agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// 啟動管線熱處理規範問答模式
    StartHeatTreatmentQa,
    /// 請輸入管線等級名稱
    PromptPipingClass,
    /// 下載管線等級
    DownloadPipingClass,
    /// 啟動配管共同要求規範問答模式
    StartCommonSpecQa,
    /// 查詢管支撐及保溫規範
    SupportInsulationSpec,
    /// 詢問管線等級問題回答
    PipingClassQuestion,
    /// Default Fallback Intent
    Fallback,
    /// Any other intent; answered from the piping specification
    Other(String),
}

impl Intent {
    pub fn from_display_name(name: &str) -> Self {
        match name {
            "啟動管線熱處理規範問答模式" => Self::StartHeatTreatmentQa,
            "請輸入管線等級名稱" => Self::PromptPipingClass,
            "下載管線等級" => Self::DownloadPipingClass,
            "啟動配管共同要求規範問答模式" => Self::StartCommonSpecQa,
            "查詢管支撐及保溫規範" => Self::SupportInsulationSpec,
            "詢問管線等級問題回答" => Self::PipingClassQuestion,
            "Default Fallback Intent" => Self::Fallback,
            other => Self::Other(other.to_string()),
        }
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::StartHeatTreatmentQa => "start_heat_treatment_qa",
            Self::PromptPipingClass => "prompt_piping_class",
            Self::DownloadPipingClass => "download_piping_class",
            Self::StartCommonSpecQa => "start_common_spec_qa",
            Self::SupportInsulationSpec => "support_insulation_spec",
            Self::PipingClassQuestion => "piping_class_question",
            Self::Fallback => "fallback",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_intents() {
        assert_eq!(
            Intent::from_display_name("查詢管支撐及保溫規範"),
            Intent::SupportInsulationSpec
        );
        assert_eq!(Intent::from_display_name("Default Fallback Intent"), Intent::Fallback);
        assert_eq!(
            Intent::from_display_name("下載管線等級").to_string(),
            "download_piping_class"
        );
    }

    #[test]
    fn test_unknown_intent_keeps_name() {
        let intent = Intent::from_display_name("詢問試壓規範");
        assert_eq!(intent, Intent::Other("詢問試壓規範".into()));
        assert_eq!(intent.as_str(), "詢問試壓規範");
        assert_eq!(Intent::from_display_name(""), Intent::Other(String::new()));
    }
}
