//! Reasoning-model response parsing into typed structures.
//!
//! The model returns raw text (ideally JSON). These parsers extract and
//! validate it into [`Decision`] and [`VerdictNote`] values, tolerating
//! mild reformatting: markdown code fences, trailing commas, and
//! case-variant action names. Anything beyond that is a parse error; the
//! caller falls back to the role default and the day proceeds.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use aicity_types::{ActionKind, Decision, VerdictNote};

use crate::error::RunnerError;

/// Intermediate struct for deserializing the model's raw decision JSON.
#[derive(Debug, serde::Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    message_to: Option<String>,
    #[serde(default)]
    message_body: Option<String>,
    #[serde(default)]
    mood_self: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Intermediate struct for deserializing the model's raw verdict JSON.
#[derive(Debug, serde::Deserialize)]
struct RawVerdict {
    confidence: f64,
    #[serde(default)]
    suspect_rank: Vec<String>,
    #[serde(default)]
    next_actions: Option<String>,
    #[serde(default)]
    case_note_text: Option<String>,
    #[serde(default)]
    request_arrest: bool,
}

/// Parse a raw model response into a [`Decision`].
///
/// # Errors
///
/// Returns [`RunnerError::Parse`] if every recovery strategy fails or the
/// action name is outside the vocabulary.
pub fn parse_decision(raw: &str) -> Result<Decision, RunnerError> {
    let parsed: RawDecision = parse_with_recovery(raw)?;
    let action = parse_action_kind(&parsed.action)?;
    Ok(Decision {
        action,
        target: parsed.target.filter(|t| !t.is_empty()),
        message_to: parsed.message_to.filter(|t| !t.is_empty()),
        message_body: parsed.message_body.filter(|t| !t.is_empty()),
        mood_self: parsed.mood_self.unwrap_or_else(|| String::from("unreadable")),
        rationale: parsed.rationale.unwrap_or_default(),
    })
}

/// Parse a raw model response into a [`VerdictNote`].
///
/// # Errors
///
/// Returns [`RunnerError::Parse`] if every recovery strategy fails.
pub fn parse_verdict(raw: &str) -> Result<VerdictNote, RunnerError> {
    let parsed: RawVerdict = parse_with_recovery(raw)?;
    let confidence = Decimal::from_f64(parsed.confidence)
        .unwrap_or(Decimal::ZERO)
        .clamp(Decimal::ZERO, Decimal::ONE)
        .round_dp(2);
    Ok(VerdictNote {
        confidence,
        suspect_rank: parsed.suspect_rank,
        next_actions: parsed.next_actions.unwrap_or_default(),
        case_note_text: parsed
            .case_note_text
            .unwrap_or_else(|| String::from("no note recorded")),
        request_arrest: parsed.request_arrest,
    })
}

/// Attempt deserialization through multiple recovery strategies:
/// 1. Direct parse.
/// 2. Extract JSON from a markdown code fence.
/// 3. Strip trailing commas and retry.
/// 4. Code fence plus comma stripping.
fn parse_with_recovery<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RunnerError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Some(inner) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(inner)
    {
        return Ok(parsed);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    if let Some(inner) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(inner);
        if let Ok(parsed) = serde_json::from_str::<T>(&cleaned_inner) {
            return Ok(parsed);
        }
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Parse a string action name into the typed enum.
///
/// Tries exact serde deserialization first, then a case-insensitive match
/// over the snake and lower variants the models actually produce.
fn parse_action_kind(s: &str) -> Result<ActionKind, RunnerError> {
    let quoted = format!("\"{s}\"");
    if let Ok(kind) = serde_json::from_str::<ActionKind>(&quoted) {
        return Ok(kind);
    }

    match s.to_lowercase().replace([' ', '-'], "_").as_str() {
        "work" => Ok(ActionKind::Work),
        "lurk" => Ok(ActionKind::Lurk),
        "steal" => Ok(ActionKind::Steal),
        "patrol" => Ok(ActionKind::Patrol),
        "heal" => Ok(ActionKind::Heal),
        "teach" => Ok(ActionKind::Teach),
        "study" => Ok(ActionKind::Study),
        "trade" => Ok(ActionKind::Trade),
        "explore" => Ok(ActionKind::Explore),
        "deliver" => Ok(ActionKind::Deliver),
        "defend" => Ok(ActionKind::Defend),
        "report" => Ok(ActionKind::Report),
        "sendmessage" | "send_message" | "message" => Ok(ActionKind::SendMessage),
        "contributeproject" | "contribute_project" | "contribute" => {
            Ok(ActionKind::ContributeProject)
        }
        "startproject" | "start_project" => Ok(ActionKind::StartProject),
        "claimhome" | "claim_home" => Ok(ActionKind::ClaimHome),
        "recruit" => Ok(ActionKind::Recruit),
        "blackmail" => Ok(ActionKind::Blackmail),
        "destroyasset" | "destroy_asset" | "sabotage" => Ok(ActionKind::DestroyAsset),
        "offerbribe" | "offer_bribe" | "bribe" => Ok(ActionKind::OfferBribe),
        "rest" | "none" | "no_action" => Ok(ActionKind::Rest),
        other => Err(RunnerError::Parse(format!("unknown action: {other}"))),
    }
}

/// Extract the contents of the first markdown code fence.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    // Skip a language tag like `json` on the fence line.
    let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end)
}

/// Remove trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            // Look ahead past whitespace for a closing delimiter.
            let mut lookahead = chars.clone();
            let mut next_significant = None;
            for upcoming in lookahead.by_ref() {
                if !upcoming.is_whitespace() {
                    next_significant = Some(upcoming);
                    break;
                }
            }
            if matches!(next_significant, Some('}' | ']')) {
                continue;
            }
        }
        cleaned.push(c);
    }
    cleaned
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clean_decision_parses_directly() {
        let raw = r#"{"action": "Steal", "target": "Marta", "mood_self": "hungry", "rationale": "easy mark"}"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.action, ActionKind::Steal);
        assert_eq!(decision.target.as_deref(), Some("Marta"));
    }

    #[test]
    fn code_fenced_decision_recovers() {
        let raw = "Here is my choice:\n```json\n{\"action\": \"work\", \"rationale\": \"steady pay\"}\n```";
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.action, ActionKind::Work);
    }

    #[test]
    fn trailing_commas_recover() {
        let raw = r#"{"action": "rest", "rationale": "tired",}"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.action, ActionKind::Rest);
    }

    #[test]
    fn snake_case_actions_parse() {
        let raw = r#"{"action": "destroy_asset", "target": "market"}"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.action, ActionKind::DestroyAsset);
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        let raw = r#"{"action": "fly_to_the_moon"}"#;
        assert!(matches!(parse_decision(raw), Err(RunnerError::Parse(_))));
    }

    #[test]
    fn prose_without_json_is_a_parse_error() {
        assert!(matches!(
            parse_decision("I think I will just walk around today."),
            Err(RunnerError::Parse(_))
        ));
    }

    #[test]
    fn verdict_confidence_clamps_and_rounds() {
        let raw = r#"{"confidence": 1.7, "suspect_rank": ["Sable"], "request_arrest": true}"#;
        let note = parse_verdict(raw).unwrap();
        assert_eq!(note.confidence, Decimal::ONE);
        assert!(note.request_arrest);

        let raw = r#"{"confidence": 0.456}"#;
        let note = parse_verdict(raw).unwrap();
        assert_eq!(note.confidence, Decimal::new(46, 2));
        assert!(!note.request_arrest);
    }

    #[test]
    fn empty_strings_become_none() {
        let raw = r#"{"action": "rest", "target": "", "message_to": ""}"#;
        let decision = parse_decision(raw).unwrap();
        assert!(decision.target.is_none());
        assert!(decision.message_to.is_none());
    }
}
