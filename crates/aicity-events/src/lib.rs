//! Event log and visibility machine for the AIcity simulation.
//!
//! Every observable act produces an immutable [`aicity_types::CityEvent`]
//! appended to the [`EventLog`]. Each event carries a visibility label
//! that moves only forward along
//! `private -> witnessed -> rumor -> reported -> public`, and every query
//! names its caller so the log can enforce what that caller may see.
//!
//! The invariant this crate exists to defend: an event that never triggers
//! a promotion rule stays `private` forever, and the narrator-scope query
//! never returns any reference to it.
//!
//! # Modules
//!
//! - [`log`] -- The [`EventLog`]: recording, evidence, promotions, knower
//!   tracking.
//! - [`scope`] -- The [`EventScope`] visibility gates for narrator, police,
//!   and agents.

pub mod error;
pub mod log;
pub mod scope;

pub use error::EventError;
pub use log::{DEFAULT_KNOWER_THRESHOLD, EventLog, NewEvent, PromotionCause};
pub use scope::EventScope;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    //! Cross-module property: narrator containment.

    use std::collections::BTreeSet;

    use aicity_types::{AgentId, EventKind, Visibility};

    use super::*;

    #[test]
    fn unpromoted_private_events_never_reach_the_narrator() {
        let mut log = EventLog::new();
        let actor = AgentId::new();

        // Plant private events across several days with no promotions.
        let mut planted = Vec::new();
        for day in 1..=5 {
            log.begin_day(day);
            planted.push(log.record(NewEvent {
                kind: EventKind::Theft,
                actor,
                target: Some(AgentId::new()),
                asset: None,
                description: format!("quiet theft on day {day}"),
                witnesses: BTreeSet::new(),
                evidence: Vec::new(),
            }));
        }

        // They stay private, and the narrator never sees any of them.
        for id in &planted {
            assert_eq!(log.get(*id).unwrap().visibility, Visibility::Private);
        }
        for day in 1..=10 {
            assert!(log.query_day(&EventScope::Narrator, day).is_empty());
        }
        assert!(log.query(&EventScope::Narrator).is_empty());
    }
}
