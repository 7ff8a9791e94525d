//! User-facing reply texts.

pub const APOLOGY: &str = "抱歉，目前無法處理您的請求，請稍後再試。";
pub const FORMAT_ERROR: &str = "請求格式錯誤，請確保 Content-Type 為 application/json。";
pub const ASYNC_ACK: &str = "⏳ 正在查詢中，稍後會將回答傳送給您。";

// Q&A mode prompts
pub const HEAT_TREATMENT_PROMPT: &str =
    "請問您想詢問哪段熱處理規範內容？\n例如：預熱溫度、PWHT溫度、保溫時間、冷卻方式等。";
pub const PIPING_CLASS_PROMPT: &str = "請輸入管線等級（如 A012、B012、A144N 等）以查詢對應連結。";
pub const COMMON_SPEC_PROMPT: &str = "請問您想詢問哪段配管共同要求規範內容";

// Pending selection
pub const SELECTION_EXPIRED: &str = "上下文已過期，請重新查詢。";
pub const SELECTION_NOT_A_NUMBER: &str = "請輸入項目編號（例如 1 或 2），以查看詳細內容。";

pub fn selection_out_of_range(len: usize) -> String {
    format!("請輸入有效的數字（例如 1~{len}）")
}

pub fn selection_detail(label: &str, content: &str) -> String {
    format!("📘 您選擇的是：{label}\n內容如下：\n{content}")
}

pub fn selection_summary(label: &str, summary: &str, content: &str) -> String {
    format!(
        "📘 您選擇的是：{label}\n\n📌 **重點整理：**\n{summary}\n\n📄 **原始內容如下：**\n{content}"
    )
}

pub fn spec_matches(desc: &str, total: usize, summary: &str) -> String {
    format!(
        "根據《{desc}》，找到 {total} 筆相關內容：\n{summary}\n請輸入對應的項目編號查看詳細內容（例如輸入 1）"
    )
}

// Piping grade lookup
pub const GRADE_INVALID: &str = "請輸入正確的管線等級（如 A012、B012、A144N 等）以查詢對應連結。";

pub fn grade_found(code: &str, link: &str) -> String {
    format!("這是管線等級 {code} 的對應連結：\n{link}")
}

pub fn grade_not_found(code: &str) -> String {
    format!("找不到管線等級 {code} 的連結，請確認是否輸入正確。")
}

// Support / insulation dialog
pub const SUPPORT_CODE_INVALID: &str = "請輸入正確的管支撐型式編號（如 TYPE01 或 M01）以查詢規範連結。";
pub const DOWNLOAD_LINK_MISSING: &str = "查無對應的下載連結";
pub const INQUIRE_PROMPT: &str = "請問您想詢問哪段規範內容？例如：測試、清洗、壓力等。";
pub const CATEGORY_MENU: &str = "請選擇規範類別";
pub const DEFAULT_CATEGORY_MENU: &str = "請選擇規範類別-";

pub fn type_code_found(key: &str, link: &str) -> String {
    format!("這是管支撐規範（塑化）{key} 的下載連結：\n{link}")
}

pub fn m_code_found(key: &str, link: &str) -> String {
    format!("這是管支撐規範 {key} 的下載連結：\n{link}")
}

pub fn support_code_not_found(key: &str) -> String {
    format!("找不到 {key} 的對應連結，請確認是否輸入正確。")
}

pub fn download_link(category: &str, source: &str, link: &str) -> String {
    format!("這是 {category}（{source}）規範的下載連結：\n{link}")
}

pub fn source_menu(category: &str) -> String {
    format!("{category}：請選擇來源類型")
}

pub fn next_step_menu(category: &str, source: &str) -> String {
    format!("{category}（{source}）：請選擇下一步")
}

pub fn download_option(category: &str, source: &str) -> String {
    format!("下載{category}（{source}）")
}

// Fallback conversation
pub const RESET_COMMANDS: &[&str] = &["重新開始", "reset", "重設對話", "重新來"];
pub const RESET_DONE: &str = "✅ 對話已重置，請重新輸入您想查詢的規範或問題。";
/// Prefix shown once the history bound is reached. `rounds` counts
/// user + assistant pairs.
pub fn history_full_reminder(rounds: usize) -> String {
    format!("⚠️ 您的對話已超過 {rounds} 輪，為保持效能，建議整理問題請輸入重設對話。\n\n")
}

/// Spec corpus descriptions used in match replies.
pub const DESC_PIPING_DEFAULT: &str = "企業配管共同規範";
pub const DESC_PIPING_QA: &str = "詢問配管共同規範";
pub const DESC_HEAT_QA: &str = "詢問熱處理規範";
