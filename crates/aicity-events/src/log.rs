//! The city event log.
//!
//! Every observable act in the city produces a [`CityEvent`] appended here.
//! Events carry a visibility label that only ever moves forward along
//! `private -> witnessed -> rumor -> reported -> public`; the log is the
//! single enforcement point for that monotonicity and for the scoped
//! queries that gate what each consumer may see.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use aicity_types::{
    AgentId, AssetId, CaseId, CityEvent, EventId, EventKind, EvidenceRef, MessageId, Visibility,
};

use crate::error::EventError;
use crate::scope::EventScope;

/// Default number of independent knowers that pushes an event public.
pub const DEFAULT_KNOWER_THRESHOLD: usize = 5;

/// Why a promotion is being requested.
///
/// Each cause corresponds to one row of the promotion table. The log checks
/// that the cause can legally produce the requested move; illegal moves are
/// rejected without mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionCause {
    /// A non-actor alive agent was co-located at event time.
    Witnessed {
        /// The witnessing agent.
        witness: AgentId,
    },
    /// A knowing agent sent a message referencing the event.
    InboxMention {
        /// The referencing message.
        message: MessageId,
        /// Its recipient, who now knows.
        recipient: AgentId,
    },
    /// The victim or a witness filed a report.
    Reported {
        /// Who filed.
        reporter: AgentId,
        /// The case opened or attached.
        case: CaseId,
    },
    /// A judicial verdict was issued on a linked case.
    Verdict {
        /// The case the verdict closed.
        case: CaseId,
    },
    /// Enough independent agents hold a personal memory of the event.
    KnowerThreshold,
    /// An arrest exposed an association; word starts circulating.
    Exposure,
    /// An explicit publication (lifecycle events, court releases).
    Publication,
}

/// Parameters for recording a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// What happened.
    pub kind: EventKind,
    /// Who did it.
    pub actor: AgentId,
    /// Who it was done to, if anyone.
    pub target: Option<AgentId>,
    /// The asset involved, if any.
    pub asset: Option<AssetId>,
    /// Human-readable description.
    pub description: String,
    /// Agents who saw it happen, beyond the actor.
    pub witnesses: BTreeSet<AgentId>,
    /// Initial evidence references.
    pub evidence: Vec<EvidenceRef>,
}

/// The append-only city event log.
///
/// The scheduler is the sole writer; per-day sequence numbers make the
/// commit order total, and broadcast order follows it exactly.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: BTreeMap<EventId, CityEvent>,
    order: Vec<EventId>,
    current_day: u64,
    next_seq: u32,
    knower_threshold: usize,
    /// Events created or mutated since the last checkpoint drain.
    dirty: BTreeSet<EventId>,
}

impl EventLog {
    /// Create an empty log with the default knower threshold.
    pub const fn new() -> Self {
        Self::with_knower_threshold(DEFAULT_KNOWER_THRESHOLD)
    }

    /// Create an empty log with an explicit knower threshold.
    pub const fn with_knower_threshold(knower_threshold: usize) -> Self {
        Self {
            events: BTreeMap::new(),
            order: Vec::new(),
            current_day: 0,
            next_seq: 0,
            knower_threshold,
            dirty: BTreeSet::new(),
        }
    }

    /// Rebuild a log from persisted events (resume path).
    pub fn from_events(events: Vec<CityEvent>, knower_threshold: usize) -> Self {
        let mut log = Self::with_knower_threshold(knower_threshold);
        let mut ordered = events;
        ordered.sort_by_key(|e| (e.day, e.seq));
        for event in ordered {
            log.current_day = event.day;
            log.next_seq = event.seq.saturating_add(1);
            log.order.push(event.id);
            log.events.insert(event.id, event);
        }
        log
    }

    /// Open a new day. Resets the per-day sequence counter.
    ///
    /// Only the scheduler calls this, once per tick.
    pub const fn begin_day(&mut self, day: u64) {
        self.current_day = day;
        self.next_seq = 0;
    }

    /// Append a new event at the current day.
    ///
    /// Initial visibility is `Private`, except lifecycle events (death,
    /// birth) which enter the public record immediately. Knowers start as
    /// the actor, the target, and any witnesses.
    pub fn record(&mut self, new_event: NewEvent) -> EventId {
        let id = EventId::new();
        let mut knowers: BTreeSet<AgentId> = new_event.witnesses.clone();
        knowers.insert(new_event.actor);
        if let Some(target) = new_event.target {
            knowers.insert(target);
        }

        let visibility = if new_event.kind.is_lifecycle() {
            Visibility::Public
        } else if new_event.witnesses.is_empty() {
            Visibility::Private
        } else {
            Visibility::Witnessed
        };

        let event = CityEvent {
            id,
            day: self.current_day,
            seq: self.next_seq,
            kind: new_event.kind,
            actor: new_event.actor,
            target: new_event.target,
            asset: new_event.asset,
            description: new_event.description,
            visibility,
            witnesses: new_event.witnesses,
            knowers,
            evidence: new_event.evidence,
            case: None,
        };
        self.next_seq = self.next_seq.saturating_add(1);
        self.order.push(id);
        debug!(day = self.current_day, %id, kind = ?event.kind, ?visibility, "event recorded");
        self.events.insert(id, event);
        self.dirty.insert(id);
        id
    }

    // -- lookups ----------------------------------------------------------

    /// Fetch one event.
    pub fn get(&self, id: EventId) -> Result<&CityEvent, EventError> {
        self.events.get(&id).ok_or(EventError::UnknownEvent(id))
    }

    /// All events, in commit order.
    pub fn all(&self) -> impl DoubleEndedIterator<Item = &CityEvent> {
        self.order.iter().filter_map(|id| self.events.get(id))
    }

    /// Events committed on a given day, in commit order.
    pub fn events_for_day(&self, day: u64) -> Vec<&CityEvent> {
        self.all().filter(|e| e.day == day).collect()
    }

    // -- evidence & knowledge ---------------------------------------------

    /// Append an evidence reference. Returns the new evidence count.
    pub fn add_evidence(
        &mut self,
        id: EventId,
        evidence: EvidenceRef,
    ) -> Result<usize, EventError> {
        let event = self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))?;
        event.evidence.push(evidence);
        self.dirty.insert(id);
        Ok(event.evidence.len())
    }

    /// Record that an agent witnessed the event after the fact (a formerly
    /// absent witness hears it described on the spot, or co-location is
    /// detected during the promotion sweep).
    ///
    /// Promotes `private -> witnessed` and registers the agent as both
    /// witness and knower. Returns `true` if the witness was new.
    pub fn add_witness(&mut self, id: EventId, witness: AgentId) -> Result<bool, EventError> {
        let event = self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))?;
        if witness == event.actor {
            return Ok(false);
        }
        let added = event.witnesses.insert(witness);
        event.knowers.insert(witness);
        self.dirty.insert(id);
        if added && event.visibility < Visibility::Witnessed {
            event.visibility = Visibility::Witnessed;
            debug!(%id, %witness, "event promoted to witnessed");
        }
        self.check_knower_threshold(id)?;
        Ok(added)
    }

    /// Record that a message referencing the event reached a recipient.
    ///
    /// Stores the message on the evidence trail, marks the recipient as a
    /// knower, and promotes `witnessed -> rumor`. A mention of a still-
    /// private event spreads knowledge but cannot promote it: nobody else
    /// saw it happen.
    pub fn note_mention(
        &mut self,
        id: EventId,
        message: MessageId,
        recipient: AgentId,
    ) -> Result<(), EventError> {
        let event = self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))?;
        event.evidence.push(EvidenceRef::Message(message));
        event.knowers.insert(recipient);
        self.dirty.insert(id);
        if event.visibility == Visibility::Witnessed {
            event.visibility = Visibility::Rumor;
            debug!(%id, "event promoted to rumor");
        }
        self.check_knower_threshold(id)?;
        Ok(())
    }

    /// Promote an event to a target visibility.
    ///
    /// Forward jumps are legal (a witnessed theft may be reported without
    /// ever circulating as rumor). Promoting to the current state is a
    /// no-op. Backward moves are rejected.
    pub fn promote(
        &mut self,
        id: EventId,
        to: Visibility,
        cause: &PromotionCause,
    ) -> Result<(), EventError> {
        let event = self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))?;
        if to < event.visibility {
            return Err(EventError::VisibilityRegression {
                event: id,
                from: event.visibility,
                to,
            });
        }
        if to == event.visibility {
            return Ok(());
        }

        if let PromotionCause::Reported { reporter, case } = cause {
            event.case = Some(*case);
            event.knowers.insert(*reporter);
        }

        debug!(%id, from = ?event.visibility, ?to, ?cause, "event promoted");
        event.visibility = to;
        self.dirty.insert(id);
        Ok(())
    }

    /// The case an event is attached to, if any.
    pub fn case_of(&self, id: EventId) -> Result<Option<CaseId>, EventError> {
        Ok(self.get(id)?.case)
    }

    /// Promote to public once enough independent agents know.
    fn check_knower_threshold(&mut self, id: EventId) -> Result<(), EventError> {
        let threshold = self.knower_threshold;
        let event = self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))?;
        if event.visibility < Visibility::Public && event.knowers.len() >= threshold {
            debug!(%id, knowers = event.knowers.len(), "knower threshold reached, event public");
            event.visibility = Visibility::Public;
            self.dirty.insert(id);
        }
        Ok(())
    }

    /// Events created or mutated since the dirty set was last cleared.
    ///
    /// The persistence checkpoint reads this once per day so only touched
    /// events are written; the scheduler clears the set at day open.
    pub fn dirty_events(&self) -> Vec<CityEvent> {
        self.dirty
            .iter()
            .filter_map(|id| self.events.get(id).cloned())
            .collect()
    }

    /// Clear the dirty set. Only the scheduler calls this, at day open.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    // -- scoped queries ---------------------------------------------------

    /// Events visible in the given scope, in commit order.
    ///
    /// - **Narrator**: `public` only. No exception exists or may be added.
    /// - **Police**: `witnessed | reported | public` -- never `private`,
    ///   never `rumor`.
    /// - **Agent**: events the agent took part in (actor, target, witness)
    ///   plus everything `public`.
    pub fn query(&self, scope: &EventScope) -> Vec<&CityEvent> {
        self.all().filter(|e| scope.permits(e)).collect()
    }

    /// Scoped query restricted to one day.
    pub fn query_day(&self, scope: &EventScope, day: u64) -> Vec<&CityEvent> {
        self.all()
            .filter(|e| e.day == day && scope.permits(e))
            .collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn theft(actor: AgentId, target: AgentId) -> NewEvent {
        NewEvent {
            kind: EventKind::Theft,
            actor,
            target: Some(target),
            asset: None,
            description: String::from("tokens lifted from a market stall"),
            witnesses: BTreeSet::new(),
            evidence: Vec::new(),
        }
    }

    #[test]
    fn new_event_starts_private() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Private);
    }

    #[test]
    fn lifecycle_events_start_public() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(NewEvent {
            kind: EventKind::Death,
            actor: AgentId::new(),
            target: None,
            asset: None,
            description: String::from("died of starvation"),
            witnesses: BTreeSet::new(),
            evidence: Vec::new(),
        });
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Public);
    }

    #[test]
    fn witness_promotes_to_witnessed() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        let witness = AgentId::new();
        assert!(log.add_witness(id, witness).unwrap());
        let event = log.get(id).unwrap();
        assert_eq!(event.visibility, Visibility::Witnessed);
        assert!(event.witnesses.contains(&witness));
    }

    #[test]
    fn actor_cannot_witness_own_event() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let actor = AgentId::new();
        let id = log.record(theft(actor, AgentId::new()));
        assert!(!log.add_witness(id, actor).unwrap());
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Private);
    }

    #[test]
    fn mention_promotes_witnessed_to_rumor() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        let _ = log.add_witness(id, AgentId::new()).unwrap();
        log.note_mention(id, MessageId::new(), AgentId::new()).unwrap();
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Rumor);
    }

    #[test]
    fn mention_of_private_event_spreads_knowledge_without_promoting() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        log.note_mention(id, MessageId::new(), AgentId::new()).unwrap();
        let event = log.get(id).unwrap();
        assert_eq!(event.visibility, Visibility::Private);
        assert_eq!(event.knowers.len(), 3);
    }

    #[test]
    fn forward_jump_witnessed_to_reported_is_legal() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let victim = AgentId::new();
        let id = log.record(theft(AgentId::new(), victim));
        let _ = log.add_witness(id, AgentId::new()).unwrap();
        log.promote(
            id,
            Visibility::Reported,
            &PromotionCause::Reported {
                reporter: victim,
                case: CaseId::new(),
            },
        )
        .unwrap();
        let event = log.get(id).unwrap();
        assert_eq!(event.visibility, Visibility::Reported);
        assert!(event.case.is_some());
    }

    #[test]
    fn backward_move_rejected() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        log.promote(id, Visibility::Public, &PromotionCause::Publication)
            .unwrap();
        let err = log.promote(
            id,
            Visibility::Rumor,
            &PromotionCause::KnowerThreshold,
        );
        assert!(matches!(
            err,
            Err(EventError::VisibilityRegression { .. })
        ));
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Public);
    }

    #[test]
    fn promotion_to_current_state_is_noop() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        log.promote(id, Visibility::Public, &PromotionCause::Publication)
            .unwrap();
        log.promote(id, Visibility::Public, &PromotionCause::Publication)
            .unwrap();
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Public);
    }

    #[test]
    fn knower_threshold_promotes_to_public() {
        let mut log = EventLog::new();
        log.begin_day(1);
        // Actor + target are 2 knowers; three mentions reach the default 5.
        let id = log.record(theft(AgentId::new(), AgentId::new()));
        for _ in 0..3 {
            log.note_mention(id, MessageId::new(), AgentId::new()).unwrap();
        }
        assert_eq!(log.get(id).unwrap().visibility, Visibility::Public);
    }

    #[test]
    fn seq_resets_per_day_and_orders_commits() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let a = log.record(theft(AgentId::new(), AgentId::new()));
        let b = log.record(theft(AgentId::new(), AgentId::new()));
        log.begin_day(2);
        let c = log.record(theft(AgentId::new(), AgentId::new()));
        assert_eq!(log.get(a).unwrap().seq, 0);
        assert_eq!(log.get(b).unwrap().seq, 1);
        assert_eq!(log.get(c).unwrap().seq, 0);
        assert_eq!(log.events_for_day(1).len(), 2);
    }

    #[test]
    fn from_events_round_trips_order() {
        let mut log = EventLog::new();
        log.begin_day(1);
        let _ = log.record(theft(AgentId::new(), AgentId::new()));
        let _ = log.record(theft(AgentId::new(), AgentId::new()));
        let events: Vec<CityEvent> = log.all().cloned().collect();
        let rebuilt = EventLog::from_events(events, DEFAULT_KNOWER_THRESHOLD);
        let original: Vec<EventId> = log.all().map(|e| e.id).collect();
        let restored: Vec<EventId> = rebuilt.all().map(|e| e.id).collect();
        assert_eq!(original, restored);
    }
}
