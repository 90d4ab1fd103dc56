//! Push payloads for the observer channel.
//!
//! Every state change an observer may see is expressed as an
//! [`ObserverMessage`]. Serialization uses a `type` tag plus a mandatory
//! `day` field on every variant, matching the dashboard contract.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentStatus, AssetType, EventKind, Role, TimePhase};
use crate::ids::{AgentId, AssetId, CaseId, EventId, GangId, LotId, ProjectId};
use crate::structs::{Asset, Gang, HomeLot, Project, TilePos, TrialVerdict, WorldTile};

/// A compact agent projection for snapshots and `agent_update` pushes.
///
/// Deliberately excludes bribe susceptibility and any other field the spec
/// marks as never externally observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentView {
    /// Stable identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Token balance at the last day boundary.
    pub tokens: i64,
    /// Age in days.
    pub age_days: u64,
    /// Mood scalar.
    #[ts(as = "String")]
    pub mood: Decimal,
    /// Claimed home lot, if any.
    pub home_lot: Option<LotId>,
    /// Tile position, if placed.
    pub position: Option<TilePos>,
}

/// The full city snapshot sent on connect and served by the snapshot
/// endpoint. Consistent with a single day boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CitySnapshot {
    /// The last committed day.
    pub day: u64,
    /// All living and imprisoned agents.
    pub agents: Vec<AgentView>,
    /// The graveyard: dead agents, read-only.
    pub graveyard: Vec<AgentView>,
    /// Standing, damaged, and destroyed assets.
    pub assets: Vec<Asset>,
    /// All projects.
    pub projects: Vec<Project>,
    /// All gangs the dashboard may render.
    pub gangs: Vec<Gang>,
    /// Claimed home lots.
    pub lots: Vec<HomeLot>,
    /// Placed world tiles.
    pub tiles: Vec<WorldTile>,
    /// Vault balance at the day boundary.
    pub vault_balance: i64,
    /// Tokens in agent hands.
    pub circulating: i64,
    /// Total token supply.
    pub total_supply: i64,
}

/// A message pushed to observers.
///
/// The serialized form is `{"type": "<kind>", "day": N, ...}`. Broadcast
/// order within a day matches commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ObserverMessage {
    /// Full snapshot, sent on connect and after re-sync.
    State {
        /// The last committed day.
        day: u64,
        /// The snapshot payload.
        snapshot: Box<CitySnapshot>,
    },
    /// One agent's projection changed.
    AgentUpdate {
        /// The day of the change.
        day: u64,
        /// The new projection.
        agent: AgentView,
    },
    /// The daily newspaper was published.
    Newspaper {
        /// Publication day.
        day: u64,
        /// The prose.
        text: String,
    },
    /// An agent died.
    Death {
        /// The day of death.
        day: u64,
        /// Who died.
        agent: AgentId,
        /// Display name.
        name: String,
        /// Cause, as prose.
        cause: String,
    },
    /// An agent was born.
    Birth {
        /// The day of birth.
        day: u64,
        /// The new agent.
        agent: AgentId,
        /// Display name.
        name: String,
    },
    /// A theft became publicly known.
    Theft {
        /// The day the theft surfaced.
        day: u64,
        /// The underlying event.
        event: EventId,
        /// The thief.
        actor: AgentId,
        /// The victim.
        target: AgentId,
        /// Tokens taken.
        amount: i64,
    },
    /// A suspect was arrested.
    Arrest {
        /// The day of arrest.
        day: u64,
        /// The case.
        case: CaseId,
        /// The arrested agent.
        suspect: AgentId,
    },
    /// The stochastic heart-attack event struck.
    HeartAttack {
        /// The day it struck.
        day: u64,
        /// The afflicted agent.
        agent: AgentId,
        /// Tokens lost.
        loss: i64,
        /// Whether it was fatal.
        fatal: bool,
    },
    /// The stochastic windfall event credited an agent.
    Windfall {
        /// The day it landed.
        day: u64,
        /// The lucky agent.
        agent: AgentId,
        /// Tokens gained.
        amount: i64,
    },
    /// A court verdict was issued.
    Verdict {
        /// The day of the verdict.
        day: u64,
        /// The case.
        case: CaseId,
        /// The defendant.
        defendant: AgentId,
        /// The outcome.
        outcome: TrialVerdict,
        /// Fine transferred to the vault, if guilty.
        fine: i64,
    },
    /// A message was delivered (metadata only; bodies stay private).
    Message {
        /// The day of delivery.
        day: u64,
        /// Recipient.
        to: AgentId,
        /// Whether the sender was anonymous.
        anonymous: bool,
    },
    /// A newborn graduated.
    Graduation {
        /// The day of graduation.
        day: u64,
        /// The graduate.
        agent: AgentId,
        /// The assigned role.
        new_role: Role,
    },
    /// The weekly report was published.
    WeeklyReport {
        /// Publication day.
        day: u64,
        /// The prose.
        text: String,
    },
    /// The monthly chronicle was published.
    MonthlyChronicle {
        /// Publication day.
        day: u64,
        /// The prose.
        text: String,
    },
    /// Two agents met after arranging it by message.
    Meeting {
        /// The day of the meeting.
        day: u64,
        /// One participant.
        a: AgentId,
        /// The other participant.
        b: AgentId,
        /// What came of it, as prose.
        outcome: String,
    },
    /// A gang formed, was exposed, or collapsed.
    GangEvent {
        /// The day of the change.
        day: u64,
        /// The gang.
        gang: GangId,
        /// What happened.
        kind: EventKind,
        /// Prose description.
        description: String,
    },
    /// An agent claimed a home lot.
    HomeClaimed {
        /// The day of the claim.
        day: u64,
        /// The claiming agent.
        agent: AgentId,
        /// The lot.
        lot: LotId,
        /// The lot's position.
        tile: TilePos,
    },
    /// A project completed into a standing asset.
    AssetBuilt {
        /// The day of completion.
        day: u64,
        /// The new asset.
        asset: AssetId,
        /// The asset type.
        asset_type: AssetType,
        /// Display name.
        name: String,
    },
    /// A tile was placed on the map.
    TilePlaced {
        /// The day of placement.
        day: u64,
        /// The placed tile.
        tile: WorldTile,
    },
    /// A tile was removed from the map.
    TileRemoved {
        /// The day of removal.
        day: u64,
        /// The vacated position.
        pos: TilePos,
    },
    /// Batch position update for the visual client.
    Positions {
        /// The day of the update.
        day: u64,
        /// (agent, position) pairs.
        positions: Vec<(AgentId, TilePos)>,
    },
    /// The phase of day advanced.
    TimePhase {
        /// The current day.
        day: u64,
        /// The new phase.
        phase: TimePhase,
    },
    /// An active project accumulated progress.
    ConstructionProgress {
        /// The day of the contribution.
        day: u64,
        /// The project.
        project: ProjectId,
        /// New progress as a decimal string.
        progress: String,
        /// The goal as a decimal string.
        goal: String,
    },
    /// A project reached its goal.
    ConstructionComplete {
        /// The day of completion.
        day: u64,
        /// The project.
        project: ProjectId,
        /// The resulting asset.
        asset: AssetId,
    },
}

impl ObserverMessage {
    /// The day this message belongs to.
    pub const fn day(&self) -> u64 {
        match self {
            Self::State { day, .. }
            | Self::AgentUpdate { day, .. }
            | Self::Newspaper { day, .. }
            | Self::Death { day, .. }
            | Self::Birth { day, .. }
            | Self::Theft { day, .. }
            | Self::Arrest { day, .. }
            | Self::HeartAttack { day, .. }
            | Self::Windfall { day, .. }
            | Self::Verdict { day, .. }
            | Self::Message { day, .. }
            | Self::Graduation { day, .. }
            | Self::WeeklyReport { day, .. }
            | Self::MonthlyChronicle { day, .. }
            | Self::Meeting { day, .. }
            | Self::GangEvent { day, .. }
            | Self::HomeClaimed { day, .. }
            | Self::AssetBuilt { day, .. }
            | Self::TilePlaced { day, .. }
            | Self::TileRemoved { day, .. }
            | Self::Positions { day, .. }
            | Self::TimePhase { day, .. }
            | Self::ConstructionProgress { day, .. }
            | Self::ConstructionComplete { day, .. } => *day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_type_and_day_fields() {
        let msg = ObserverMessage::Windfall {
            day: 7,
            agent: AgentId::new(),
            amount: 120,
        };
        let json = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("windfall"));
        assert_eq!(json.get("day").and_then(serde_json::Value::as_u64), Some(7));
    }

    #[test]
    fn day_accessor_matches_payload() {
        let msg = ObserverMessage::TimePhase {
            day: 3,
            phase: TimePhase::Night,
        };
        assert_eq!(msg.day(), 3);
    }
}
