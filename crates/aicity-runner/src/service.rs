//! The HTTP-backed reasoning service.
//!
//! [`HttpReasoner`] implements the core [`ReasoningService`] trait over
//! an [`LlmBackend`]. The trait is synchronous, but HTTP calls are async;
//! the bridge uses [`tokio::task::block_in_place`] plus
//! [`tokio::runtime::Handle::block_on`], so the engine must run on the
//! multi-thread runtime. Every call carries its own timeout -- a slow
//! model costs one agent one fallback, never the day.

use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use aicity_core::config::ReasoningConfig;
use aicity_core::reasoner::{ReasonError, ReasoningService};
use aicity_types::{CasePrompt, Decision, DecisionContext, NarrativeRequest, Role, VerdictNote};

use crate::error::RunnerError;
use crate::llm::{BackendConfig, LlmBackend};
use crate::parse::{parse_decision, parse_verdict};
use crate::prompt::{PromptEngine, RenderedPrompt};

/// A reasoning service backed by an HTTP model API.
pub struct HttpReasoner {
    backend: LlmBackend,
    prompts: PromptEngine,
    call_timeout: Duration,
    handle: Handle,
}

impl HttpReasoner {
    /// Build a reasoner from the simulation's reasoning configuration.
    ///
    /// Must be called from within a running multi-thread tokio runtime;
    /// the current handle is captured for the sync/async bridge.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] outside a runtime or for an
    /// unknown backend flavor, and [`RunnerError::Template`] when the
    /// template directory is unusable.
    pub fn from_config(config: &ReasoningConfig) -> Result<Self, RunnerError> {
        let handle = Handle::try_current()
            .map_err(|_| RunnerError::Config(String::from("no tokio runtime available")))?;
        let backend = LlmBackend::from_flavor(
            &config.backend,
            &BackendConfig {
                api_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            },
        )?;
        let prompts = PromptEngine::new(&config.templates_dir)?;
        Ok(Self {
            backend,
            prompts,
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            handle,
        })
    }

    /// Execute one prompt with the per-call timeout.
    fn call(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        tokio::task::block_in_place(|| {
            self.handle.block_on(async {
                tokio::time::timeout(self.call_timeout, self.backend.complete(prompt))
                    .await
                    .map_err(|_| RunnerError::Timeout)?
            })
        })
    }
}

/// Translate client errors into the core's error vocabulary.
fn to_reason_error(error: RunnerError) -> ReasonError {
    match error {
        RunnerError::Timeout => ReasonError::Timeout,
        RunnerError::Parse(message) => ReasonError::Parse(message),
        other => ReasonError::Backend(other.to_string()),
    }
}

impl ReasoningService for HttpReasoner {
    fn decide(&mut self, context: &DecisionContext) -> Result<Decision, ReasonError> {
        let payload = serde_json::to_value(context).map_err(|e| ReasonError::Parse(e.to_string()))?;
        let prompt = self
            .prompts
            .render_decision(&payload)
            .map_err(to_reason_error)?;
        let raw = self.call(&prompt).map_err(to_reason_error)?;
        debug!(agent = context.name.as_str(), backend = self.backend.name(), "decision received");
        parse_decision(&raw).map_err(to_reason_error)
    }

    fn judge(&mut self, case: &CasePrompt) -> Result<VerdictNote, ReasonError> {
        let payload = serde_json::to_value(case).map_err(|e| ReasonError::Parse(e.to_string()))?;
        let prompt = self.prompts.render_judge(&payload).map_err(to_reason_error)?;
        let raw = self.call(&prompt).map_err(to_reason_error)?;
        parse_verdict(&raw).map_err(to_reason_error)
    }

    fn write_narrative(&mut self, request: &NarrativeRequest) -> Result<String, ReasonError> {
        let payload =
            serde_json::to_value(request).map_err(|e| ReasonError::Parse(e.to_string()))?;
        let prompt = self
            .prompts
            .render_narrative(&payload)
            .map_err(to_reason_error)?;
        let raw = self.call(&prompt).map_err(to_reason_error)?;
        // The template asks for {"text": ...}; tolerate bare prose too.
        let text = serde_json::from_str::<serde_json::Value>(raw.trim())
            .ok()
            .and_then(|v| v.get("text").and_then(|t| t.as_str()).map(str::to_owned))
            .unwrap_or_else(|| raw.trim().to_owned());
        if text.is_empty() {
            return Err(ReasonError::Parse(String::from("empty narrative")));
        }
        Ok(text)
    }

    fn choose_role(&mut self, agent_name: &str, allowed: &[Role]) -> Result<Role, ReasonError> {
        let options: Vec<String> = allowed.iter().map(|r| format!("{r:?}")).collect();
        let prompt = RenderedPrompt {
            system: String::from(
                "You assign adult roles to graduating students in a simulated city. \
                 Answer with exactly one role name from the offered list.",
            ),
            user: format!(
                "{agent_name} has finished their schooling. Choose their role from: {}.",
                options.join(", ")
            ),
        };
        let raw = self.call(&prompt).map_err(to_reason_error)?;
        let lower = raw.to_lowercase();
        allowed
            .iter()
            .copied()
            .find(|role| lower.contains(&format!("{role:?}").to_lowercase()))
            .ok_or_else(|| {
                warn!(agent = agent_name, "graduation answer named no allowed role");
                ReasonError::Parse(format!("no allowed role in answer: {raw}"))
            })
    }
}
