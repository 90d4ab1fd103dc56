//! The reasoning-service trait and its scripted test double.
//!
//! The engine treats the reasoning model as a pluggable service with four
//! operations: per-agent decisions, case judgements, narrative prose, and
//! graduation role choice. The trait is synchronous from the scheduler's
//! point of view; network-backed implementations bridge into the async
//! runtime internally and enforce their own timeouts.
//!
//! Every operation is allowed to fail; the caller owns the fallback. The
//! tick never stops because a model was unavailable.

use std::collections::{BTreeMap, VecDeque};

use aicity_types::{CasePrompt, Decision, DecisionContext, NarrativeRequest, Role, VerdictNote};

/// Errors that can occur while consulting the reasoning model.
#[derive(Debug, thiserror::Error)]
pub enum ReasonError {
    /// The call exceeded its deadline.
    #[error("reasoning call timed out")]
    Timeout,

    /// The backend returned an error or was unreachable.
    #[error("reasoning backend error: {0}")]
    Backend(String),

    /// The response could not be parsed into the expected shape.
    #[error("reasoning response parse error: {0}")]
    Parse(String),
}

/// A pluggable reasoning service.
pub trait ReasoningService {
    /// Produce a decision for one agent from their packed context.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonError`] when the call fails or parses badly; the
    /// facade substitutes the role default.
    fn decide(&mut self, context: &DecisionContext) -> Result<Decision, ReasonError>;

    /// Weigh a case's evidence into a structured investigation note.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonError`] when the call fails; the case simply gets
    /// no note that day.
    fn judge(&mut self, prompt: &CasePrompt) -> Result<VerdictNote, ReasonError>;

    /// Write narrative prose from public material.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonError`] when the call fails; the day goes without
    /// a newspaper.
    fn write_narrative(&mut self, request: &NarrativeRequest) -> Result<String, ReasonError>;

    /// Choose a graduation role from the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonError`] when the call fails; the caller assigns
    /// the first allowed role.
    fn choose_role(&mut self, agent_name: &str, allowed: &[Role]) -> Result<Role, ReasonError>;
}

/// A scripted reasoning service for tests and offline runs.
///
/// Scripted answers are consumed in FIFO order per agent name; when a
/// queue runs dry the service falls back to the role-default decision, a
/// low-confidence note, and flat prose. Deterministic by construction.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    decisions: BTreeMap<String, VecDeque<Decision>>,
    notes: VecDeque<VerdictNote>,
    role_choices: VecDeque<Role>,
}

impl ScriptedReasoner {
    /// Create an empty scripted service (everything falls back).
    pub const fn new() -> Self {
        Self {
            decisions: BTreeMap::new(),
            notes: VecDeque::new(),
            role_choices: VecDeque::new(),
        }
    }

    /// Queue a decision for the named agent.
    #[must_use]
    pub fn with_decision(mut self, agent_name: &str, decision: Decision) -> Self {
        self.script_decision(agent_name, decision);
        self
    }

    /// Queue a decision for the named agent.
    pub fn script_decision(&mut self, agent_name: &str, decision: Decision) {
        self.decisions
            .entry(agent_name.to_owned())
            .or_default()
            .push_back(decision);
    }

    /// Queue an investigation note.
    pub fn script_note(&mut self, note: VerdictNote) {
        self.notes.push_back(note);
    }

    /// Queue a graduation role choice.
    pub fn script_role(&mut self, role: Role) {
        self.role_choices.push_back(role);
    }
}

impl ReasoningService for ScriptedReasoner {
    fn decide(&mut self, context: &DecisionContext) -> Result<Decision, ReasonError> {
        if let Some(queue) = self.decisions.get_mut(&context.name)
            && let Some(decision) = queue.pop_front()
        {
            return Ok(decision);
        }
        Ok(Decision::fallback(context.role))
    }

    fn judge(&mut self, _prompt: &CasePrompt) -> Result<VerdictNote, ReasonError> {
        self.notes.pop_front().map_or_else(
            || {
                Ok(VerdictNote {
                    confidence: rust_decimal::Decimal::new(20, 2),
                    suspect_rank: Vec::new(),
                    next_actions: String::from("keep watching"),
                    case_note_text: String::from("nothing conclusive today"),
                    request_arrest: false,
                })
            },
            Ok,
        )
    }

    fn write_narrative(&mut self, request: &NarrativeRequest) -> Result<String, ReasonError> {
        if request.headlines.is_empty() {
            return Ok(format!("Day {}: a quiet day in the city.", request.day));
        }
        Ok(format!(
            "Day {}: {}.",
            request.day,
            request.headlines.join("; ")
        ))
    }

    fn choose_role(&mut self, _agent_name: &str, allowed: &[Role]) -> Result<Role, ReasonError> {
        if let Some(choice) = self.role_choices.pop_front()
            && allowed.contains(&choice)
        {
            return Ok(choice);
        }
        allowed
            .first()
            .copied()
            .ok_or_else(|| ReasonError::Backend(String::from("empty graduation allow-list")))
    }
}
