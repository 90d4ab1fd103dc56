//! Reasoning-model client for the AIcity simulation.
//!
//! The engine treats the reasoning model as a pluggable service; this
//! crate is the HTTP-backed implementation. Prompt templates live on disk
//! and render through `minijinja`; responses are parsed tolerantly (code
//! fences, trailing commas, case-variant action names); backends dispatch
//! through an enum to stay dyn-compatible despite async methods.
//!
//! # Modules
//!
//! - [`prompt`] -- The [`PromptEngine`] and its template files.
//! - [`parse`] -- Tolerant JSON parsing into decisions and verdict notes.
//! - [`llm`] -- The [`LlmBackend`] enum (OpenAI-compatible, Anthropic).
//! - [`service`] -- [`HttpReasoner`], the sync bridge implementing the
//!   core [`aicity_core::ReasoningService`] trait.

pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod service;

pub use error::RunnerError;
pub use llm::{BackendConfig, LlmBackend};
pub use parse::{parse_decision, parse_verdict};
pub use prompt::{PromptEngine, RenderedPrompt};
pub use service::HttpReasoner;
