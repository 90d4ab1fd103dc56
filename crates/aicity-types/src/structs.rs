//! Core entity structs for the AIcity simulation.
//!
//! Agents, ledger transactions, events with their evidence trails, police
//! cases, projects and assets, gangs, messages, bonds, and the small tile
//! records consumed by the visual client.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    AgentStatus, AssetStatus, AssetType, CaseStatus, CauseOfDeath, EventKind, GangStatus,
    LedgerParty, ProjectStatus, Role, TxKind, Visibility,
};
use crate::ids::{
    AgentId, AssetId, CaseId, EventId, GangId, LotId, MessageId, ProjectId, StoryId, TxId,
};

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// The durable record of one agent.
///
/// Balances are NOT stored here: the ledger is the single source of truth
/// for token holdings, and snapshot assembly reads balances from it at the
/// day boundary. Everything else about an agent lives on this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentRecord {
    /// Stable identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// The agent's role, fixed at creation (newborns graduate once).
    pub role: Role,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Age in simulated days.
    pub age_days: u64,
    /// Day the agent entered the simulation.
    pub day_born: u64,
    /// Mood scalar in [-1, +1].
    #[ts(as = "String")]
    pub mood: Decimal,
    /// Bribe susceptibility in [0, 1]. Police only.
    ///
    /// Never serialized: this field conditions the reasoning prompt's
    /// framing and is persisted through a dedicated column, but it must not
    /// appear in any broadcast, export, or debug dump sent to observers.
    #[serde(skip)]
    #[ts(skip)]
    pub bribe_susceptibility: Option<Decimal>,
    /// Comprehension score 0-100. Newborns only.
    pub comprehension: Option<u32>,
    /// The teacher assigned to this newborn.
    pub assigned_teacher: Option<AgentId>,
    /// Claimed home lot, if any.
    pub home_lot: Option<LotId>,
    /// Current tile position, if placed on the map.
    pub position: Option<TilePos>,
    /// Location zone for today (co-location granularity).
    pub zone: u32,
    /// Why the agent died, once dead.
    pub cause_of_death: Option<CauseOfDeath>,
    /// Day the current sentence ends, while imprisoned.
    pub imprisoned_until: Option<u64>,
}

impl AgentRecord {
    /// Whether the agent is alive (imprisoned counts as alive).
    pub const fn is_alive(&self) -> bool {
        !matches!(self.status, AgentStatus::Dead)
    }

    /// Whether the agent takes a decision turn today.
    pub const fn takes_turn(&self) -> bool {
        matches!(self.status, AgentStatus::Alive)
    }
}

/// A tile coordinate on the city map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TilePos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

// ---------------------------------------------------------------------------
// Ledger transaction
// ---------------------------------------------------------------------------

/// One append-only ledger record.
///
/// Transactions are never mutated or deleted; replaying them in id order
/// reconstructs every balance and the vault exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Transaction {
    /// Stable identity (UUID v7, so id order is insertion order).
    pub id: TxId,
    /// The day this transaction was committed.
    pub day: u64,
    /// Source of funds.
    pub from: LedgerParty,
    /// Destination of funds.
    pub to: LedgerParty,
    /// Amount moved to the destination. Always positive.
    pub amount: i64,
    /// Tax retained by the vault on an earn. Zero otherwise.
    pub tax_withheld: i64,
    /// Human-readable reason ("WAGES", "THEFT", "WELFARE", ...).
    pub reason: String,
    /// The transaction category.
    pub kind: TxKind,
}

// ---------------------------------------------------------------------------
// Events & evidence
// ---------------------------------------------------------------------------

/// A reference carried on an event's evidence trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EvidenceRef {
    /// An inbox message that mentioned the event.
    Message(MessageId),
    /// A ledger transaction near the event window.
    Transaction(TxId),
    /// A free-text clue (e.g. debris left by a saboteur).
    Clue(String),
}

/// One entry in the city event log.
///
/// `visibility` only ever moves forward; the event log enforces this.
/// `knowers` is the set of agents with a personal memory of the event
/// (actor, target, witnesses, and recipients of messages about it) used by
/// the independent-knower promotion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CityEvent {
    /// Stable identity.
    pub id: EventId,
    /// The day the event occurred.
    pub day: u64,
    /// Position within the day's commit order.
    pub seq: u32,
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
    /// Current visibility label.
    pub visibility: Visibility,
    /// Agents who saw it happen.
    pub witnesses: BTreeSet<AgentId>,
    /// Agents holding a personal memory of the event.
    pub knowers: BTreeSet<AgentId>,
    /// Open bag of evidence references.
    pub evidence: Vec<EvidenceRef>,
    /// The police case this event is attached to, if reported.
    pub case: Option<CaseId>,
}

// ---------------------------------------------------------------------------
// Police cases
// ---------------------------------------------------------------------------

/// One dated note appended by the daily investigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CaseNote {
    /// The day the note was written.
    pub day: u64,
    /// The investigating officer's note text.
    pub text: String,
    /// Suspects named in the note.
    pub suspects: Vec<AgentId>,
    /// The officer's confidence in the leading suspect, in [0, 1].
    #[ts(as = "String")]
    pub confidence: Decimal,
}

/// A police case tracking one reported crime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PoliceCase {
    /// Stable identity.
    pub id: CaseId,
    /// The day the case was opened.
    pub day_opened: u64,
    /// The event that triggered the report.
    pub trigger_event: EventId,
    /// Who filed the report.
    pub complainant: AgentId,
    /// Current suspect set.
    pub suspects: BTreeSet<AgentId>,
    /// Linked evidence references.
    pub evidence: Vec<EvidenceRef>,
    /// Lifecycle status.
    pub status: CaseStatus,
    /// Daily investigation notes, in day order.
    pub notes: Vec<CaseNote>,
    /// The last day any evidence reference was added.
    pub day_last_evidence: u64,
    /// The day the case was closed (solved or went cold), if closed.
    pub day_closed: Option<u64>,
    /// Closing narrative, written from police-scope evidence only.
    pub closing_report: Option<String>,
}

/// The outcome of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TrialVerdict {
    /// The defendant is guilty; fine and sentence follow.
    Guilty,
    /// The defendant walks; the case stays open and evidence is re-weighed.
    NotGuilty,
}

// ---------------------------------------------------------------------------
// Projects & assets
// ---------------------------------------------------------------------------

/// A multi-day collaborative build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Project {
    /// Stable identity.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// What the project produces when complete.
    pub project_type: AssetType,
    /// Who proposed it.
    pub proposer: AgentId,
    /// Builder-days required for completion.
    #[ts(as = "String")]
    pub goal_builder_days: Decimal,
    /// Days contributed per agent.
    #[ts(as = "BTreeMap<AgentId, String>")]
    pub contributors: BTreeMap<AgentId, Decimal>,
    /// Accumulated progress (0.5 increments permitted).
    #[ts(as = "String")]
    pub progress: Decimal,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// The day the project started.
    pub day_started: u64,
    /// The day the project completed, if it did.
    pub day_completed: Option<u64>,
    /// The last day anyone contributed.
    pub day_last_contribution: u64,
    /// Consecutive days without contribution (abandonment counter).
    pub idle_days: u32,
    /// Where the finished asset lands on the map, if it has a footprint.
    pub target_tile: Option<TilePos>,
}

/// A standing city asset produced by a completed project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Asset {
    /// Stable identity.
    pub id: AssetId,
    /// Display name.
    pub name: String,
    /// The asset type (fixes the daily benefit).
    pub asset_type: AssetType,
    /// Agents who contributed at least one full day.
    pub builders: Vec<AgentId>,
    /// The day the asset was completed.
    pub day_built: u64,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// The day the asset was destroyed, if it was.
    pub day_destroyed: Option<u64>,
    /// Map footprint, if any.
    pub tile: Option<TilePos>,
}

impl Asset {
    /// Whether the asset is currently applying its benefit.
    pub const fn is_standing(&self) -> bool {
        matches!(self.status, AssetStatus::Standing)
    }
}

// ---------------------------------------------------------------------------
// Gangs
// ---------------------------------------------------------------------------

/// A leader-anchored criminal association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Gang {
    /// Stable identity.
    pub id: GangId,
    /// Gang name.
    pub name: String,
    /// The leader (always in `members`).
    pub leader: AgentId,
    /// All members, leader included.
    pub members: BTreeSet<AgentId>,
    /// The day the gang formed.
    pub day_formed: u64,
    /// Lifecycle status.
    pub status: GangStatus,
    /// Crimes committed by members while the gang was active.
    pub total_crimes: u64,
    /// Whether the police know the gang exists.
    pub known_to_police: bool,
}

impl Gang {
    /// Whether the gang's earn multipliers currently apply.
    pub const fn is_active(&self) -> bool {
        matches!(self.status, GangStatus::Active)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MessageSender {
    /// A named agent.
    Agent(AgentId),
    /// The anonymous sender sentinel (blackmail notes, tips).
    Anon,
}

/// One inbox message with bounded retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CityMessage {
    /// Stable identity.
    pub id: MessageId,
    /// The day the message was sent.
    pub day: u64,
    /// The sender.
    pub from: MessageSender,
    /// The recipient.
    pub to: AgentId,
    /// Message text.
    pub body: String,
    /// Wall-clock send time.
    pub sent_at: DateTime<Utc>,
    /// Wall-clock read time, once fetched by the recipient.
    pub read_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Bonds
// ---------------------------------------------------------------------------

/// A symmetric pairwise bond for persistence and snapshots.
///
/// The in-memory bond table keys pairs canonically; this struct is the
/// flattened row shape. `bond(a, b) == bond(b, a)` by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bond {
    /// One endpoint (the smaller id under canonical ordering).
    pub a: AgentId,
    /// The other endpoint.
    pub b: AgentId,
    /// Bond strength in [-1, +1].
    #[ts(as = "String")]
    pub score: Decimal,
    /// The last day the bond changed.
    pub last_updated_day: u64,
}

// ---------------------------------------------------------------------------
// Homes, tiles, stories
// ---------------------------------------------------------------------------

/// A claimed residential lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HomeLot {
    /// Stable identity.
    pub id: LotId,
    /// The claiming agent.
    pub owner: AgentId,
    /// Map position.
    pub tile: TilePos,
    /// The day the lot was claimed.
    pub day_claimed: u64,
}

/// A placed world tile, consumed by the visual client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldTile {
    /// Map position.
    pub pos: TilePos,
    /// What kind of asset occupies the tile.
    pub kind: AssetType,
    /// The asset that placed this tile.
    pub asset: AssetId,
}

/// The cadence of a published narrative artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StoryKind {
    /// The daily newspaper.
    Daily,
    /// The weekly report.
    Weekly,
    /// The monthly chronicle.
    Monthly,
}

/// A published narrative artifact (newspaper, report, chronicle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Story {
    /// Stable identity.
    pub id: StoryId,
    /// The day the story was published.
    pub day: u64,
    /// The publication cadence.
    pub kind: StoryKind,
    /// The prose.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent() -> AgentRecord {
        AgentRecord {
            id: AgentId::new(),
            name: String::from("Vera"),
            role: Role::Police,
            status: AgentStatus::Alive,
            age_days: 12,
            day_born: 0,
            mood: Decimal::ZERO,
            bribe_susceptibility: Some(Decimal::new(35, 2)),
            comprehension: None,
            assigned_teacher: None,
            home_lot: None,
            position: None,
            zone: 0,
            cause_of_death: None,
            imprisoned_until: None,
        }
    }

    #[test]
    fn susceptibility_never_serializes() {
        let agent = sample_agent();
        let json = serde_json::to_string(&agent).unwrap_or_default();
        assert!(!json.contains("bribe_susceptibility"));
        assert!(!json.contains("0.35"));
    }

    #[test]
    fn imprisoned_is_alive_but_takes_no_turn() {
        let mut agent = sample_agent();
        agent.status = AgentStatus::Imprisoned;
        assert!(agent.is_alive());
        assert!(!agent.takes_turn());
    }

    #[test]
    fn dead_is_terminal_flagging() {
        let mut agent = sample_agent();
        agent.status = AgentStatus::Dead;
        agent.cause_of_death = Some(CauseOfDeath::Starvation);
        assert!(!agent.is_alive());
        assert!(!agent.takes_turn());
    }
}
