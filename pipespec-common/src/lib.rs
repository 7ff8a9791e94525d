//! PipeSpec Common - Shared types and utilities for the PipeSpec webhook.
//!
//! This crate provides:
//! - Configuration types and loading (`config.json` + `secrets.json` + env)
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers
//! - Small string utilities used across crates

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod util;

pub use config::{
    Config, CorpusConfig, DownloadLinkEntry, LineConfig, LlmConfig, MatchStrategy, MatcherConfig,
    ObservabilityConfig, ServerConfig, SessionConfig,
};
pub use error::{Error, Result, ResultExt};

