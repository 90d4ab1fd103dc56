//! The police case engine.
//!
//! Cases move `open -> solved` on a guilty verdict, `open -> cold` when the
//! evidence goes stale for the cold-case window, and `cold -> open` when
//! new evidence is linked. The daily investigation packs police-scope
//! evidence into a prompt for the reasoning model and folds the parsed
//! note back into the case file.
//!
//! Bribe susceptibility conditions only the prompt's framing sentence.
//! It is never written to an event, a note, a broadcast, or an export.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::{debug, info};

use aicity_events::{EventLog, EventScope};
use aicity_ledger::Ledger;
use aicity_types::{
    AgentId, CaseId, CaseNote, CasePrompt, CaseStatus, EventId, EvidenceRef, PoliceCase,
    TrialVerdict, TxKind, VerdictNote,
};

use crate::config::PoliceConfig;
use crate::error::AgentError;

/// A queued request to arrest a suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrestRequest {
    /// The case behind the arrest.
    pub case: CaseId,
    /// The suspect to take in.
    pub suspect: AgentId,
    /// The day the request was queued.
    pub day: u64,
}

/// The board of all police cases.
#[derive(Debug, Clone)]
pub struct CaseBoard {
    cases: BTreeMap<CaseId, PoliceCase>,
    arrest_queue: Vec<ArrestRequest>,
    /// Cases a bribed officer is steering toward a cold close.
    biased_cold: BTreeSet<CaseId>,
    config: PoliceConfig,
}

impl CaseBoard {
    /// Create an empty board.
    pub const fn new(config: PoliceConfig) -> Self {
        Self {
            cases: BTreeMap::new(),
            arrest_queue: Vec::new(),
            biased_cold: BTreeSet::new(),
            config,
        }
    }

    /// Rebuild from persisted cases (resume path).
    pub fn from_cases(cases: Vec<PoliceCase>, config: PoliceConfig) -> Self {
        let mut board = Self::new(config);
        for case in cases {
            board.cases.insert(case.id, case);
        }
        board
    }

    /// The active configuration.
    pub const fn config(&self) -> &PoliceConfig {
        &self.config
    }

    // -- lifecycle --------------------------------------------------------

    /// Open a case for a reported event, or return the existing case
    /// already linked to it.
    pub fn open_or_attach(
        &mut self,
        day: u64,
        trigger_event: EventId,
        complainant: AgentId,
        suspects: BTreeSet<AgentId>,
    ) -> CaseId {
        if let Some(existing) = self.find_by_trigger(trigger_event) {
            if let Some(case) = self.cases.get_mut(&existing) {
                case.suspects.extend(suspects);
                case.day_last_evidence = day;
                if case.status == CaseStatus::Cold {
                    Self::reopen(case, day);
                }
            }
            return existing;
        }

        let id = CaseId::new();
        info!(day, %id, %trigger_event, "case opened");
        self.cases.insert(
            id,
            PoliceCase {
                id,
                day_opened: day,
                trigger_event,
                complainant,
                suspects,
                evidence: vec![EvidenceRef::Clue(String::from("initial report"))],
                status: CaseStatus::Open,
                notes: Vec::new(),
                day_last_evidence: day,
                day_closed: None,
                closing_report: None,
            },
        );
        id
    }

    /// Link new evidence to a case. Reopens a cold case.
    ///
    /// Returns `true` when this attachment reopened the case.
    pub fn attach_evidence(
        &mut self,
        day: u64,
        id: CaseId,
        evidence: EvidenceRef,
    ) -> Result<bool, AgentError> {
        let case = self.cases.get_mut(&id).ok_or(AgentError::UnknownCase(id))?;
        if case.status == CaseStatus::Solved {
            return Err(AgentError::CaseClosed(id));
        }
        case.evidence.push(evidence);
        case.day_last_evidence = day;
        if case.status == CaseStatus::Cold {
            Self::reopen(case, day);
            return Ok(true);
        }
        Ok(false)
    }

    fn reopen(case: &mut PoliceCase, day: u64) {
        info!(day, id = %case.id, "cold case reopened on new evidence");
        case.status = CaseStatus::Open;
        case.day_closed = None;
        case.closing_report = None;
    }

    /// Add a suspect to a case.
    pub fn add_suspect(&mut self, id: CaseId, suspect: AgentId) -> Result<(), AgentError> {
        let case = self.cases.get_mut(&id).ok_or(AgentError::UnknownCase(id))?;
        case.suspects.insert(suspect);
        Ok(())
    }

    /// Fold a parsed investigation note into the case file.
    ///
    /// Appends the note and, when the officer asks for an arrest with
    /// enough confidence, queues an arrest request against the leading
    /// resolved suspect.
    pub fn apply_note(
        &mut self,
        day: u64,
        id: CaseId,
        note: &VerdictNote,
        resolved_suspects: Vec<AgentId>,
    ) -> Result<Option<ArrestRequest>, AgentError> {
        let case = self.cases.get_mut(&id).ok_or(AgentError::UnknownCase(id))?;
        if case.status != CaseStatus::Open {
            return Err(AgentError::CaseClosed(id));
        }

        for suspect in &resolved_suspects {
            case.suspects.insert(*suspect);
        }
        case.notes.push(CaseNote {
            day,
            text: note.case_note_text.clone(),
            suspects: resolved_suspects.clone(),
            confidence: note.confidence,
        });

        if note.request_arrest && note.confidence >= self.config.arrest_confidence_threshold {
            if let Some(&suspect) = resolved_suspects.first() {
                let request = ArrestRequest {
                    case: id,
                    suspect,
                    day,
                };
                debug!(day, %id, %suspect, "arrest queued");
                self.arrest_queue.push(request);
                return Ok(Some(request));
            }
        }
        Ok(None)
    }

    /// Queue an arrest directly (patrol scan path).
    pub fn queue_arrest(&mut self, day: u64, id: CaseId, suspect: AgentId) {
        self.arrest_queue.push(ArrestRequest {
            case: id,
            suspect,
            day,
        });
    }

    /// Drain the pending arrest queue.
    pub fn take_arrests(&mut self) -> Vec<ArrestRequest> {
        core::mem::take(&mut self.arrest_queue)
    }

    /// Mark a case as bribed toward a cold close.
    pub fn bias_cold(&mut self, id: CaseId) {
        self.biased_cold.insert(id);
    }

    /// Whether a case is being steered cold.
    pub fn is_biased_cold(&self, id: CaseId) -> bool {
        self.biased_cold.contains(&id)
    }

    /// Open cases whose evidence has gone stale past the cold window.
    ///
    /// A bribed case uses half the window, which is how a paid-off officer
    /// lets a file slide to the bottom of the drawer.
    pub fn cold_candidates(&self, day: u64) -> Vec<CaseId> {
        self.cases
            .values()
            .filter(|case| {
                if case.status != CaseStatus::Open {
                    return false;
                }
                let window = if self.biased_cold.contains(&case.id) {
                    self.config.cold_case_days.div_euclid(2).max(1)
                } else {
                    self.config.cold_case_days
                };
                let stale_since = case.day_last_evidence.max(case.day_opened);
                day.saturating_sub(stale_since) >= window
            })
            .map(|case| case.id)
            .collect()
    }

    /// Close a case as cold with its closing narrative.
    pub fn close_cold(&mut self, day: u64, id: CaseId, report: String) -> Result<(), AgentError> {
        let case = self.cases.get_mut(&id).ok_or(AgentError::UnknownCase(id))?;
        if case.status != CaseStatus::Open {
            return Err(AgentError::CaseClosed(id));
        }
        info!(day, %id, "case gone cold");
        case.status = CaseStatus::Cold;
        case.day_closed = Some(day);
        case.closing_report = Some(report);
        Ok(())
    }

    /// Record a trial outcome.
    ///
    /// Guilty closes the case solved; not guilty leaves it open with the
    /// evidence re-weighed on later days.
    pub fn record_trial(
        &mut self,
        day: u64,
        id: CaseId,
        verdict: TrialVerdict,
        report: Option<String>,
    ) -> Result<(), AgentError> {
        let case = self.cases.get_mut(&id).ok_or(AgentError::UnknownCase(id))?;
        match verdict {
            TrialVerdict::Guilty => {
                info!(day, %id, "case solved by guilty verdict");
                case.status = CaseStatus::Solved;
                case.day_closed = Some(day);
                case.closing_report = report;
            }
            TrialVerdict::NotGuilty => {
                debug!(day, %id, "not guilty; case stays open");
            }
        }
        Ok(())
    }

    // -- queries ----------------------------------------------------------

    /// Fetch one case.
    pub fn get(&self, id: CaseId) -> Result<&PoliceCase, AgentError> {
        self.cases.get(&id).ok_or(AgentError::UnknownCase(id))
    }

    /// All cases.
    pub fn all(&self) -> impl Iterator<Item = &PoliceCase> {
        self.cases.values()
    }

    /// Open cases, oldest first.
    pub fn open_cases(&self) -> Vec<&PoliceCase> {
        let mut open: Vec<&PoliceCase> = self
            .cases
            .values()
            .filter(|c| c.status == CaseStatus::Open)
            .collect();
        open.sort_by_key(|c| c.day_opened);
        open
    }

    /// The case linked to a trigger event, if any.
    pub fn find_by_trigger(&self, event: EventId) -> Option<CaseId> {
        self.cases
            .values()
            .find(|c| c.trigger_event == event)
            .map(|c| c.id)
    }

    /// Cases touched on the given day (checkpoint delta).
    pub fn touched_on(&self, day: u64) -> Vec<&PoliceCase> {
        self.cases
            .values()
            .filter(|c| {
                c.day_opened == day
                    || c.day_last_evidence == day
                    || c.day_closed == Some(day)
                    || c.notes.last().is_some_and(|n| n.day == day)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Prompt assembly & corruption framing
// ---------------------------------------------------------------------------

/// Describe the investigating officer's disposition for the prompt.
///
/// The tone is the only place susceptibility surfaces, and it surfaces as
/// prose.
pub fn officer_framing(susceptibility: Decimal) -> &'static str {
    if susceptibility < Decimal::new(30, 2) {
        "You are a scrupulous officer; the book matters more than convenience."
    } else if susceptibility < Decimal::new(60, 2) {
        "You are a pragmatic officer; you close cases that can be closed."
    } else {
        "You are an officer who understands that some files age better unopened."
    }
}

/// Clamp-drift an officer's susceptibility by the configured delta.
pub fn drift_susceptibility(current: Decimal, delta: Decimal) -> Decimal {
    current
        .saturating_add(delta)
        .clamp(Decimal::ZERO, Decimal::ONE)
}

/// Assemble the daily investigation prompt for one case.
///
/// Uses the police event scope plus ledger records around the case window,
/// and nothing else: a private, unwitnessed act stays out of the file.
pub fn build_case_prompt(
    day: u64,
    case: &PoliceCase,
    events: &EventLog,
    ledger: &Ledger,
    names: &BTreeMap<AgentId, String>,
    framing: &'static str,
) -> CasePrompt {
    let trigger = events
        .get(case.trigger_event)
        .ok()
        .filter(|e| EventScope::Police.permits(e))
        .map_or_else(
            || String::from("a reported incident with no direct police observation"),
            |e| e.description.clone(),
        );

    let mut evidence_lines = Vec::new();
    for evidence in &case.evidence {
        match evidence {
            EvidenceRef::Clue(text) => evidence_lines.push(format!("clue: {text}")),
            EvidenceRef::Message(_) => {
                evidence_lines.push(String::from("a message was entered into evidence"));
            }
            EvidenceRef::Transaction(tx_id) => {
                let line = ledger
                    .transactions()
                    .iter()
                    .find(|t| t.id == *tx_id)
                    .map_or_else(
                        || String::from("a ledger record was entered into evidence"),
                        |t| format!("ledger: {} tokens moved on day {} ({})", t.amount, t.day, t.reason),
                    );
                evidence_lines.push(line);
            }
        }
    }

    let window_start = case.day_opened.saturating_sub(1);
    let ledger_lines: Vec<String> = ledger
        .transactions_in_window(window_start, day)
        .into_iter()
        .filter(|t| t.kind == TxKind::Transfer)
        .map(|t| format!("day {}: transfer of {} tokens ({})", t.day, t.amount, t.reason))
        .collect();

    let suspects: Vec<String> = case
        .suspects
        .iter()
        .filter_map(|id| names.get(id).cloned())
        .collect();

    let prior_notes: Vec<String> = case.notes.iter().map(|n| n.text.clone()).collect();

    CasePrompt {
        day,
        case_label: format!("case opened day {}", case.day_opened),
        trigger,
        prior_notes,
        evidence_lines,
        ledger_lines,
        suspects,
        officer_framing: String::from(framing),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn board() -> CaseBoard {
        CaseBoard::new(PoliceConfig::default())
    }

    fn open_case(board: &mut CaseBoard, day: u64) -> CaseId {
        board.open_or_attach(day, EventId::new(), AgentId::new(), BTreeSet::new())
    }

    fn note(confidence: Decimal, request_arrest: bool) -> VerdictNote {
        VerdictNote {
            confidence,
            suspect_rank: vec![String::from("Sable")],
            next_actions: String::from("canvass the market"),
            case_note_text: String::from("the trail points one way"),
            request_arrest,
        }
    }

    #[test]
    fn reporting_twice_attaches_to_the_same_case() {
        let mut board = board();
        let event = EventId::new();
        let first = board.open_or_attach(2, event, AgentId::new(), BTreeSet::new());
        let second = board.open_or_attach(3, event, AgentId::new(), BTreeSet::new());
        assert_eq!(first, second);
    }

    #[test]
    fn confident_arrest_request_queues() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        let suspect = AgentId::new();
        let queued = board
            .apply_note(3, id, &note(Decimal::new(90, 2), true), vec![suspect])
            .unwrap();
        assert!(queued.is_some());
        let arrests = board.take_arrests();
        assert_eq!(arrests.len(), 1);
        assert_eq!(arrests.first().unwrap().suspect, suspect);
        // Queue drains.
        assert!(board.take_arrests().is_empty());
    }

    #[test]
    fn low_confidence_request_does_not_queue() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        let queued = board
            .apply_note(3, id, &note(Decimal::new(40, 2), true), vec![AgentId::new()])
            .unwrap();
        assert!(queued.is_none());
        assert!(board.take_arrests().is_empty());
    }

    #[test]
    fn stale_case_goes_cold_at_exactly_k_days() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        assert!(board.cold_candidates(15).is_empty());
        let candidates = board.cold_candidates(16);
        assert_eq!(candidates, vec![id]);
        board
            .close_cold(16, id, String::from("the trail went quiet"))
            .unwrap();
        assert_eq!(board.get(id).unwrap().status, CaseStatus::Cold);
    }

    #[test]
    fn new_evidence_resets_the_cold_clock() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        let _ = board
            .attach_evidence(10, id, EvidenceRef::Clue(String::from("a dropped glove")))
            .unwrap();
        assert!(board.cold_candidates(16).is_empty());
        assert_eq!(board.cold_candidates(24), vec![id]);
    }

    #[test]
    fn cold_case_reopens_on_new_evidence() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        board.close_cold(16, id, String::from("shelved")).unwrap();
        let reopened = board
            .attach_evidence(25, id, EvidenceRef::Clue(String::from("a new witness account")))
            .unwrap();
        assert!(reopened);
        let case = board.get(id).unwrap();
        assert_eq!(case.status, CaseStatus::Open);
        assert!(case.day_closed.is_none());
        assert!(case.closing_report.is_none());
    }

    #[test]
    fn guilty_verdict_solves_the_case() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        board
            .record_trial(7, id, TrialVerdict::Guilty, Some(String::from("done")))
            .unwrap();
        let case = board.get(id).unwrap();
        assert_eq!(case.status, CaseStatus::Solved);
        assert_eq!(case.day_closed, Some(7));
        // Solved cases accept no further evidence.
        assert!(matches!(
            board.attach_evidence(8, id, EvidenceRef::Clue(String::from("late tip"))),
            Err(AgentError::CaseClosed(_))
        ));
    }

    #[test]
    fn not_guilty_keeps_the_case_open() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        board.record_trial(7, id, TrialVerdict::NotGuilty, None).unwrap();
        assert_eq!(board.get(id).unwrap().status, CaseStatus::Open);
    }

    #[test]
    fn bribed_cases_cool_in_half_the_window() {
        let mut board = board();
        let id = open_case(&mut board, 2);
        board.bias_cold(id);
        assert_eq!(board.cold_candidates(9), vec![id]);
    }

    #[test]
    fn framing_never_contains_numbers() {
        for raw in [0i64, 29, 30, 59, 60, 100] {
            let framing = officer_framing(Decimal::new(raw, 2));
            assert!(!framing.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn susceptibility_drift_clamps() {
        let delta = Decimal::new(5, 2);
        assert_eq!(
            drift_susceptibility(Decimal::new(98, 2), delta),
            Decimal::ONE
        );
        assert_eq!(
            drift_susceptibility(Decimal::new(2, 2), delta.saturating_mul(Decimal::NEGATIVE_ONE)),
            Decimal::ZERO
        );
    }
}
