//! Query scopes: who is allowed to see which events.
//!
//! Every query against the event log names its caller. The scope decides,
//! per event, whether the caller may see it. The narrator scope is the
//! tightest gate in the system -- it feeds the newspaper, and anything that
//! leaks through it becomes common knowledge in prose.

use aicity_types::{AgentId, CityEvent, Visibility};

/// The caller of an event-log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// The narrator. Sees `public` events only, ever.
    Narrator,
    /// The police. Sees `witnessed | reported | public` -- never `private`
    /// (unobserved) and never `rumor` (not yet in the book).
    Police,
    /// A specific agent. Sees events they took part in plus everything
    /// `public`.
    Agent(AgentId),
}

impl EventScope {
    /// Whether this scope may see the given event.
    pub fn permits(&self, event: &CityEvent) -> bool {
        match self {
            Self::Narrator => event.visibility == Visibility::Public,
            Self::Police => matches!(
                event.visibility,
                Visibility::Witnessed | Visibility::Reported | Visibility::Public
            ),
            Self::Agent(agent) => {
                event.visibility == Visibility::Public
                    || event.actor == *agent
                    || event.target == Some(*agent)
                    || event.witnesses.contains(agent)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use aicity_types::{EventId, EventKind};

    use super::*;

    fn event_with(visibility: Visibility, actor: AgentId) -> CityEvent {
        CityEvent {
            id: EventId::new(),
            day: 1,
            seq: 0,
            kind: EventKind::Theft,
            actor,
            target: None,
            asset: None,
            description: String::new(),
            visibility,
            witnesses: BTreeSet::new(),
            knowers: BTreeSet::new(),
            evidence: Vec::new(),
            case: None,
        }
    }

    #[test]
    fn narrator_sees_public_only() {
        let actor = AgentId::new();
        for visibility in [
            Visibility::Private,
            Visibility::Witnessed,
            Visibility::Rumor,
            Visibility::Reported,
        ] {
            assert!(!EventScope::Narrator.permits(&event_with(visibility, actor)));
        }
        assert!(EventScope::Narrator.permits(&event_with(Visibility::Public, actor)));
    }

    #[test]
    fn police_never_see_private_or_rumor() {
        let actor = AgentId::new();
        assert!(!EventScope::Police.permits(&event_with(Visibility::Private, actor)));
        assert!(!EventScope::Police.permits(&event_with(Visibility::Rumor, actor)));
        assert!(EventScope::Police.permits(&event_with(Visibility::Witnessed, actor)));
        assert!(EventScope::Police.permits(&event_with(Visibility::Reported, actor)));
        assert!(EventScope::Police.permits(&event_with(Visibility::Public, actor)));
    }

    #[test]
    fn agent_sees_own_private_events() {
        let actor = AgentId::new();
        let other = AgentId::new();
        let event = event_with(Visibility::Private, actor);
        assert!(EventScope::Agent(actor).permits(&event));
        assert!(!EventScope::Agent(other).permits(&event));
    }

    #[test]
    fn witness_sees_the_event() {
        let actor = AgentId::new();
        let witness = AgentId::new();
        let mut event = event_with(Visibility::Witnessed, actor);
        event.witnesses.insert(witness);
        assert!(EventScope::Agent(witness).permits(&event));
    }
}
