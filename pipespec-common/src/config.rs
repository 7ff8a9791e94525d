//! Configuration management for the PipeSpec webhook.
//!
//! Configuration lives in `config.json` inside the config directory, with an
//! optional `secrets.json` next to it (see [`crate::config_loader`]).
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. `secrets.json` (credentials only, fills unset keys)
//! 3. `config.json` values
//! 4. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PIPESPEC_CONFIG_DIR` → location of `config.json` / `secrets.json`
//! - `PORT` → server.port
//! - `PIPESPEC_BIND_ADDRESS` → server.host
//! - `OPENAI_API_KEY` → llm.api_key
//! - `OPENAI_BASE_URL` → llm.base_url
//! - `PIPESPEC_LLM_MODEL` → llm.model
//! - `LINE_CHANNEL_ACCESS_TOKEN` → line.channel_access_token
//! - `PIPESPEC_LOG_LEVEL` → observability.log_level
//! - `PIPESPEC_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::config_loader::load_modular_config;
use crate::util::parse_duration_secs;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PIPESPEC_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".pipespec"),
        |dirs| dirs.home_dir().join(".pipespec"),
    )
}

// ============================================================================
// Server
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

// ============================================================================
// Corpus files
// ============================================================================

/// Paths of the static JSON documents loaded at startup.
///
/// Relative paths are resolved against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Piping common-requirements specification (chapter → sections)
    #[serde(default = "default_piping_spec_path")]
    pub piping_specification: PathBuf,
    /// Piping heat-treatment specification (chapter → sections)
    #[serde(default = "default_heat_treatment_path")]
    pub heat_treatment: PathBuf,
    /// Type / grade code → download link table
    #[serde(default = "default_links_path")]
    pub links: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            piping_specification: default_piping_spec_path(),
            heat_treatment: default_heat_treatment_path(),
            links: default_links_path(),
        }
    }
}

fn default_piping_spec_path() -> PathBuf {
    PathBuf::from("piping_specification.json")
}

fn default_heat_treatment_path() -> PathBuf {
    PathBuf::from("piping_heat_treatment.json")
}

fn default_links_path() -> PathBuf {
    PathBuf::from("links.json")
}

// ============================================================================
// Matcher
// ============================================================================

/// How free text is matched against corpus sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Partial-ratio similarity against each section, kept above a threshold
    #[default]
    Fuzzy,
    /// Exact containment of the query, plus chapter-title keyword hits
    Substring,
}

/// Spec matcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub strategy: MatchStrategy,

    /// Minimum fuzzy score (0-100) for a section to count as a match
    #[serde(default = "default_threshold")]
    pub threshold: u8,

    /// Chapter-title keywords used by the substring strategy, also the
    /// trigger words for the support/insulation menus
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Selected sections longer than this (in chars) get an LLM summary
    #[serde(default = "default_summarize_over_chars")]
    pub summarize_over_chars: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            threshold: default_threshold(),
            keywords: default_keywords(),
            summarize_over_chars: default_summarize_over_chars(),
        }
    }
}

fn default_threshold() -> u8 {
    70
}

fn default_keywords() -> Vec<String> {
    ["規範", "資料", "標準圖", "查詢", "我要查", "查"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_summarize_over_chars() -> usize {
    300
}

// ============================================================================
// Sessions
// ============================================================================

/// Conversation session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of stored messages (user + assistant) per session
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Idle time after which a session is reset ("30s", "5m", "1h")
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: String,

    /// `lifespanCount` for contexts handed back to the NLU platform
    #[serde(default = "default_context_lifespan")]
    pub context_lifespan: u32,
}

impl SessionConfig {
    /// Idle timeout in seconds. Falls back to five minutes when unparseable;
    /// [`Config::validate`] rejects such values up front.
    pub fn idle_timeout_secs(&self) -> u64 {
        parse_duration_secs(&self.idle_timeout).unwrap_or(300)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            idle_timeout: default_idle_timeout(),
            context_lifespan: default_context_lifespan(),
        }
    }
}

fn default_max_messages() -> usize {
    10
}

fn default_idle_timeout() -> String {
    "5m".into()
}

fn default_context_lifespan() -> u32 {
    5
}

// ============================================================================
// LLM
// ============================================================================

/// Hosted chat-completion API configuration (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_llm_timeout() -> u64 {
    60
}

// ============================================================================
// LINE push
// ============================================================================

/// LINE Messaging API configuration for asynchronous replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default)]
    pub channel_access_token: Option<String>,
    #[serde(default = "default_line_base_url")]
    pub base_url: String,
    /// Answer slow fallback questions out of band via push
    #[serde(default)]
    pub async_replies: bool,
}

impl LineConfig {
    /// Whether asynchronous push replies can actually be delivered.
    pub fn push_enabled(&self) -> bool {
        self.async_replies
            && self
                .channel_access_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            base_url: default_line_base_url(),
            async_replies: false,
        }
    }
}

fn default_line_base_url() -> String {
    "https://api.line.me".into()
}

// ============================================================================
// Download links
// ============================================================================

/// Download link for a (category, source) pair of the support/insulation specs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadLinkEntry {
    pub category: String,
    pub source: String,
    pub link: String,
}

impl DownloadLinkEntry {
    fn new(category: &str, source: &str, link: &str) -> Self {
        Self {
            category: category.into(),
            source: source.into(),
            link: link.into(),
        }
    }
}

fn default_download_links() -> Vec<DownloadLinkEntry> {
    vec![
        DownloadLinkEntry::new("管支撐", "塑化", "https://tinyurl.com/5vk67ywh"),
        DownloadLinkEntry::new("管支撐", "企業", "https://tinyurl.com/msxhmnha"),
        DownloadLinkEntry::new("保溫", "企業", "https://tinyurl.com/2s4cb5cn"),
        DownloadLinkEntry::new(
            "保溫",
            "塑化",
            "保溫規範請參考企業規範\nhttps://tinyurl.com/2s4cb5cn",
        ),
    ]
}

// ============================================================================
// Secrets / observability
// ============================================================================

/// Credentials merged in from `secrets.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub line_channel_access_token: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub line: LineConfig,

    #[serde(default = "default_download_links")]
    pub download_links: Vec<DownloadLinkEntry>,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default, skip_serializing)]
    pub secrets: SecretsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            corpus: CorpusConfig::default(),
            matcher: MatcherConfig::default(),
            session: SessionConfig::default(),
            llm: LlmConfig::default(),
            line: LineConfig::default(),
            download_links: default_download_links(),
            observability: ObservabilityConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default directory, apply secrets and
    /// environment overrides, and validate the result.
    pub fn load() -> Result<Self> {
        Self::load_from_dir(&config_dir())
    }

    /// Load configuration from a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let raw = load_modular_config(Some(dir.to_path_buf()))?;
        let mut config: Self = serde_json::from_value(raw)
            .with_context(|| format!("Failed to parse config from {}", dir.display()))?;

        config.apply_secrets();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Fill credentials that `config.json` left unset from `secrets.json`.
    pub fn apply_secrets(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = self.secrets.openai_api_key.clone();
        }
        if self.line.channel_access_token.is_none() {
            self.line.channel_access_token = self.secrets.line_channel_access_token.clone();
        }
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(host) = lookup("PIPESPEC_BIND_ADDRESS") {
            self.server.host = host;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("PIPESPEC_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(token) = lookup("LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = Some(token);
        }
        if let Some(level) = lookup("PIPESPEC_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("PIPESPEC_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Reject values the router cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.matcher.threshold > 100 {
            return Err(crate::Error::Config(format!(
                "matcher.threshold must be within 0-100, got {}",
                self.matcher.threshold
            )));
        }
        if self.session.max_messages == 0 {
            return Err(crate::Error::Config(
                "session.max_messages must be at least 1".into(),
            ));
        }
        parse_duration_secs(&self.session.idle_timeout).map_err(|e| {
            crate::Error::Config(format!(
                "session.idle_timeout '{}': {e}",
                self.session.idle_timeout
            ))
        })?;
        self.bind_address()?;
        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> crate::Result<SocketAddr> {
        let ip: IpAddr = self.server.host.parse().map_err(|e| {
            crate::Error::Config(format!("server.host '{}': {e}", self.server.host))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Whether an LLM API key is configured.
    pub fn has_llm_key(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}
