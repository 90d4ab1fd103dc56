//! The meeting matcher.
//!
//! Scans recent messages for meet intent between two agents and, when both
//! stand in the same zone today, fires the matching outcome. Intent
//! detection is a small pluggable predicate; the default is a keyword
//! scan, and a model-backed predicate can replace it without touching the
//! matcher.

use tracing::debug;

use aicity_types::{AgentId, MessageSender, Role};

use crate::city::City;

/// The pluggable meet-intent predicate.
pub trait MeetIntent {
    /// Whether the message body proposes a meeting.
    fn is_meet_intent(&self, body: &str) -> bool;
}

/// The default keyword-scan intent detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntent;

impl MeetIntent for KeywordIntent {
    fn is_meet_intent(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        ["meet me", "let's meet", "lets meet", "let's talk at", "find me at"]
            .iter()
            .any(|phrase| lower.contains(phrase))
    }
}

/// What a matched meeting turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingKind {
    /// A gang leader courted a recruit face to face.
    FormGang,
    /// An officer debriefed an informant.
    Debrief,
    /// Two civilians agreed to start a project together.
    StartProject,
    /// A criminal tried to compromise the other party.
    Compromise,
    /// An ordinary trade.
    Trade,
}

/// A matched meeting, ready for the scheduler to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meeting {
    /// The agent who proposed.
    pub proposer: AgentId,
    /// The agent who showed up.
    pub partner: AgentId,
    /// What the pairing turns into.
    pub kind: MeetingKind,
}

/// Find today's meetings: meet intent in yesterday's or today's mail plus
/// co-location in the same zone.
pub fn match_meetings(city: &City, intent: &dyn MeetIntent) -> Vec<Meeting> {
    let since = city.day.saturating_sub(1);
    let mut meetings: Vec<Meeting> = Vec::new();

    for message in city.messages.recent(since) {
        let MessageSender::Agent(proposer) = message.from else {
            continue;
        };
        let partner = message.to;
        if !intent.is_meet_intent(&message.body) {
            continue;
        }
        let (Some(a), Some(b)) = (city.agents.get(&proposer), city.agents.get(&partner)) else {
            continue;
        };
        if !a.takes_turn() || !b.takes_turn() || a.zone != b.zone {
            continue;
        }
        if meetings
            .iter()
            .any(|m| (m.proposer == proposer && m.partner == partner)
                || (m.proposer == partner && m.partner == proposer))
        {
            continue;
        }

        let kind = classify(a.role, b.role);
        debug!(day = city.day, %proposer, %partner, ?kind, "meeting matched");
        meetings.push(Meeting {
            proposer,
            partner,
            kind,
        });
    }

    meetings
}

/// Decide what a pairing of roles turns into.
const fn classify(proposer: Role, partner: Role) -> MeetingKind {
    if matches!(proposer, Role::GangLeader) || matches!(partner, Role::GangLeader) {
        return MeetingKind::FormGang;
    }
    if matches!(proposer, Role::Police) || matches!(partner, Role::Police) {
        return MeetingKind::Debrief;
    }
    if proposer.is_criminal() || partner.is_criminal() {
        return MeetingKind::Compromise;
    }
    if matches!(proposer, Role::Builder) || matches!(partner, Role::Builder) {
        return MeetingKind::StartProject;
    }
    MeetingKind::Trade
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::config::SimulationConfig;

    use super::*;

    fn city_with_pair(proposer_role: Role, partner_role: Role) -> (City, AgentId, AgentId) {
        let mut city = City::genesis(SimulationConfig::default());
        let a = city.spawn_agent("Asha", proposer_role).unwrap();
        let b = city.spawn_agent("Brone", partner_role).unwrap();
        // Put both in the same zone for the day.
        for id in [a, b] {
            if let Some(record) = city.agents.get_mut(&id) {
                record.zone = 0;
            }
        }
        (city, a, b)
    }

    #[test]
    fn keyword_intent_matches_meet_phrases() {
        let intent = KeywordIntent;
        assert!(intent.is_meet_intent("Meet me at the market at dusk"));
        assert!(intent.is_meet_intent("let's meet tomorrow"));
        assert!(!intent.is_meet_intent("the weather has turned"));
    }

    #[test]
    fn colocated_intent_fires_a_meeting() {
        let (mut city, a, b) = city_with_pair(Role::Builder, Role::Merchant);
        let _ = city
            .messages
            .send(1, MessageSender::Agent(a), b, "meet me at the stalls");
        city.day = 1;
        let meetings = match_meetings(&city, &KeywordIntent);
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings.first().unwrap().kind, MeetingKind::StartProject);
    }

    #[test]
    fn different_zones_block_the_meeting() {
        let (mut city, a, b) = city_with_pair(Role::Builder, Role::Merchant);
        if let Some(record) = city.agents.get_mut(&b) {
            record.zone = 5;
        }
        let _ = city
            .messages
            .send(1, MessageSender::Agent(a), b, "meet me at the stalls");
        city.day = 1;
        assert!(match_meetings(&city, &KeywordIntent).is_empty());
    }

    #[test]
    fn anonymous_mail_never_matches() {
        let (mut city, _a, b) = city_with_pair(Role::Builder, Role::Merchant);
        let _ = city
            .messages
            .send(1, MessageSender::Anon, b, "meet me at the stalls");
        city.day = 1;
        assert!(match_meetings(&city, &KeywordIntent).is_empty());
    }

    #[test]
    fn role_pairings_classify_as_documented() {
        assert_eq!(classify(Role::GangLeader, Role::Thief), MeetingKind::FormGang);
        assert_eq!(classify(Role::Police, Role::Messenger), MeetingKind::Debrief);
        assert_eq!(classify(Role::Thief, Role::Merchant), MeetingKind::Compromise);
        assert_eq!(classify(Role::Builder, Role::Merchant), MeetingKind::StartProject);
        assert_eq!(classify(Role::Merchant, Role::Healer), MeetingKind::Trade);
    }
}
