//! PipeSpec Core - Domain logic for the piping-specification webhook.
//!
//! This crate provides:
//! - The specification corpus model and its JSON loader
//! - Fuzzy partial-ratio scoring and the spec matcher
//! - Pure parsers for support type codes and piping grade codes
//! - Link tables and support/insulation keyword extraction
//!
//! Nothing here performs network I/O; the gateway crate wires these pieces to
//! the webhook, the LLM, and the push channel.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod codes;
pub mod corpus;
pub mod extract;
pub mod fuzz;
pub mod links;
pub mod matcher;

pub use codes::{mentions_support_code, parse_grade_code, parse_support_code, SupportCode, SupportCodeKind};
pub use corpus::{Chapter, SpecCorpus};
pub use extract::{Action, Category, QueryExtraction, Source};
pub use fuzz::{normalize, partial_ratio, partial_ratio_with_floor};
pub use links::{DownloadLinks, LinkTable};
pub use matcher::{MatchOutcome, SpecMatch, SpecMatcher};
