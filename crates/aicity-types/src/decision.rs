//! Decision-facade payloads: the context packed for the reasoning model and
//! the structured outputs parsed back from it.
//!
//! The reasoning model sees only what [`DecisionContext`] includes -- mood
//! and bribe susceptibility arrive as descriptive text, never as numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionKind, Role, TimePhase};
use crate::structs::StoryKind;

// ---------------------------------------------------------------------------
// Context (input)
// ---------------------------------------------------------------------------

/// One inbox message as shown to the reasoning model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InboxView {
    /// Sender display name, or "someone" for anonymous mail.
    pub from: String,
    /// The day the message was sent.
    pub day: u64,
    /// Message text.
    pub body: String,
}

/// One bond as shown to the reasoning model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BondView {
    /// The other agent's display name.
    pub other: String,
    /// A descriptive annotation ("a trusted friend", "an open enemy").
    pub annotation: String,
}

/// Everything a per-agent decision request may draw on.
///
/// Assembled by the decision facade from a snapshot of observable state;
/// rendered into the prompt by the runner's template engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DecisionContext {
    /// The current day number.
    pub day: u64,
    /// Coarse phase of day.
    pub time_phase: TimePhase,
    /// Agent display name.
    pub name: String,
    /// Agent role.
    pub role: Role,
    /// Current token balance.
    pub tokens: i64,
    /// Age in days.
    pub age_days: u64,
    /// Mood rendered as descriptive text (never a number).
    pub mood_text: String,
    /// Susceptibility framing for police ("honest", "pragmatic", "corrupt").
    /// Absent for every other role.
    pub susceptibility_text: Option<String>,
    /// Comprehension score, newborns only.
    pub comprehension: Option<u32>,
    /// Yesterday's public newspaper, if one was published.
    pub newspaper: Option<String>,
    /// Flags describing standing assets ("the city has a watchtower").
    pub asset_flags: Vec<String>,
    /// The N most recent inbox messages.
    pub inbox: Vec<InboxView>,
    /// Top-k warmest bonds.
    pub bonds_positive: Vec<BondView>,
    /// Top-k coldest bonds.
    pub bonds_negative: Vec<BondView>,
    /// Memory recalls relevant to today.
    pub recalls: Vec<String>,
    /// The actions this role may take today.
    pub available_actions: Vec<ActionKind>,
}

// ---------------------------------------------------------------------------
// Decision (output)
// ---------------------------------------------------------------------------

/// The parsed decision returned by the reasoning model.
///
/// `target`, `message_to`, and `message_body` carry display names and free
/// text; the behavior dispatcher resolves names to ids and discards
/// unresolvable ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Decision {
    /// The chosen action. Must be in the role's vocabulary.
    pub action: ActionKind,
    /// Agent or asset name the action applies to.
    pub target: Option<String>,
    /// Recipient name for an outgoing message.
    pub message_to: Option<String>,
    /// Body of the outgoing message.
    pub message_body: Option<String>,
    /// The agent's one-line self-described mood.
    pub mood_self: String,
    /// Short rationale (logged, never executed).
    pub rationale: String,
}

impl Decision {
    /// The fallback decision for a role when the reasoning call fails.
    pub fn fallback(role: Role) -> Self {
        Self {
            action: crate::capabilities::default_action(role),
            target: None,
            message_to: None,
            message_body: None,
            mood_self: String::from("going through the motions"),
            rationale: String::from("fallback: no usable answer from the model"),
        }
    }
}

// ---------------------------------------------------------------------------
// Judge payloads
// ---------------------------------------------------------------------------

/// The evidence pack for one day of case investigation.
///
/// Built strictly from police-scope evidence plus ledger records around the
/// event window. The officer framing sentence is where bribe susceptibility
/// surfaces -- as tone, never as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePrompt {
    /// The day of the investigation.
    pub day: u64,
    /// Short case label for the prompt ("case opened day 4: theft").
    pub case_label: String,
    /// Description of the triggering event.
    pub trigger: String,
    /// Prior note texts, oldest first.
    pub prior_notes: Vec<String>,
    /// Police-scope evidence lines.
    pub evidence_lines: Vec<String>,
    /// Ledger lines around the event window.
    pub ledger_lines: Vec<String>,
    /// Current suspect display names.
    pub suspects: Vec<String>,
    /// One sentence framing the investigating officer's disposition.
    pub officer_framing: String,
}

/// The structured note parsed from a judge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictNote {
    /// Confidence in the leading suspect, in [0, 1].
    pub confidence: Decimal,
    /// Suspect display names, strongest first.
    pub suspect_rank: Vec<String>,
    /// What the officer intends to do next.
    pub next_actions: String,
    /// The note text appended to the case file.
    pub case_note_text: String,
    /// Whether the officer asks to arrest the leading suspect.
    pub request_arrest: bool,
}

// ---------------------------------------------------------------------------
// Narrative payloads
// ---------------------------------------------------------------------------

/// A request for narrative prose from public material only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeRequest {
    /// The day being written about.
    pub day: u64,
    /// The publication cadence.
    pub kind: StoryKind,
    /// Public-scope headline lines.
    pub headlines: Vec<String>,
    /// Whether the archive asset grants the narrator precise sourcing.
    pub archive_precision: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_role_default() {
        let d = Decision::fallback(Role::Thief);
        assert_eq!(d.action, ActionKind::Lurk);
        let d = Decision::fallback(Role::Builder);
        assert_eq!(d.action, ActionKind::Work);
    }

    #[test]
    fn decision_roundtrip() {
        let d = Decision {
            action: ActionKind::Steal,
            target: Some(String::from("Marta")),
            message_to: None,
            message_body: None,
            mood_self: String::from("desperate"),
            rationale: String::from("rent is due"),
        };
        let json = serde_json::to_string(&d).unwrap_or_default();
        let back: Result<Decision, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(d));
    }
}
