//! Enumeration types for the AIcity simulation.
//!
//! Roles, statuses, event kinds, transaction kinds, and the visibility
//! ladder that gates information flow through the city.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The closed set of agent roles.
///
/// A role fixes the agent's action vocabulary, earn profile, and how the
/// behavior dispatcher interprets their decisions. Roles never change after
/// creation, with one exception: a `Newborn` graduates into a new role once
/// their comprehension crosses the graduation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Earns steadily; contributes to construction projects.
    Builder,
    /// High-variance earner; occasionally makes discoveries.
    Explorer,
    /// Earn scales with the number of wealthy agents; uses the market stall.
    Merchant,
    /// Patrols, investigates cases, and makes arrests.
    Police,
    /// Earn scales with the student population; raises newborn comprehension.
    Teacher,
    /// Earn scales with the number of critical agents; heals (mood boost).
    Healer,
    /// Earn scales with the city population; writes the daily newspaper.
    Messenger,
    /// Earns on active cases; defends suspects at trial.
    Lawyer,
    /// Steals from wealthy targets; logs private theft events.
    Thief,
    /// Studies under a teacher until graduation into a permanent role.
    Newborn,
    /// Recruits desperate agents into a gang and skims a leader bonus.
    GangLeader,
    /// Extorts agents over events they would rather keep quiet.
    Blackmailer,
    /// Destroys standing assets, leaving scattered evidence.
    Saboteur,
}

impl Role {
    /// Whether this role participates in criminal earn multipliers.
    pub const fn is_criminal(self) -> bool {
        matches!(
            self,
            Self::Thief | Self::GangLeader | Self::Blackmailer | Self::Saboteur
        )
    }

    /// Whether this role counts as a student for teacher earnings.
    pub const fn is_student(self) -> bool {
        matches!(self, Self::Newborn)
    }
}

// ---------------------------------------------------------------------------
// Agent status & death
// ---------------------------------------------------------------------------

/// The lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AgentStatus {
    /// Alive and taking daily turns.
    Alive,
    /// Serving a sentence; skips turns but still pays daily burn.
    Imprisoned,
    /// Dead. Terminal: the record persists in the graveyard, balance is zero.
    Dead,
}

/// Why an agent died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CauseOfDeath {
    /// Token balance reached zero.
    Starvation,
    /// The stochastic heart-attack event proved fatal.
    HeartAttack,
}

impl core::fmt::Display for CauseOfDeath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Starvation => write!(f, "starvation"),
            Self::HeartAttack => write!(f, "heart attack"),
        }
    }
}

// ---------------------------------------------------------------------------
// Visibility ladder
// ---------------------------------------------------------------------------

/// The five-state visibility label on an event.
///
/// Visibility only ever moves forward (derived `Ord` gives the promotion
/// order). It gates which consumer may observe the event: the narrator sees
/// only `Public`, the police see `Witnessed | Reported | Public`, and an
/// agent sees events they took part in plus everything `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Visibility {
    /// Known only to the actor.
    Private,
    /// At least one non-actor agent saw it happen.
    Witnessed,
    /// A witness mentioned it in a message; it circulates informally.
    Rumor,
    /// A victim or witness filed a report; a police case exists.
    Reported,
    /// On the public record: verdict issued, lifecycle event, or enough
    /// independent knowers.
    Public,
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The kind of a city event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// Tokens taken from another agent without consent.
    Theft,
    /// A suspect taken into custody.
    Arrest,
    /// A building deliberately set on fire.
    Arson,
    /// A physical attack on another agent.
    Assault,
    /// A payment intended to influence an officer.
    Bribe,
    /// Extortion over a secret the target wants kept.
    Blackmail,
    /// A healer restored another agent.
    Heal,
    /// An agent died.
    Death,
    /// An agent was created mid-simulation.
    Birth,
    /// A project finished and produced a standing asset.
    Build,
    /// An explorer found something of note.
    Discovery,
    /// A standing asset was destroyed.
    Sabotage,
    /// A crime was reported to the police.
    Report,
    /// A court verdict was issued.
    Verdict,
    /// Two agents met after arranging it by message.
    Meeting,
    /// A gang formed.
    GangFormed,
    /// A gang became known to the police.
    GangExposed,
    /// A gang collapsed after its leader's conviction.
    GangCollapsed,
    /// The stochastic heart-attack event struck an agent.
    HeartAttack,
    /// The stochastic windfall event credited an agent.
    Windfall,
    /// A newborn graduated into a permanent role.
    Graduation,
    /// An agent claimed a home lot.
    HomeClaimed,
    /// An imprisoned agent finished their sentence.
    Release,
}

impl EventKind {
    /// Lifecycle events enter the public record immediately.
    pub const fn is_lifecycle(self) -> bool {
        matches!(self, Self::Death | Self::Birth)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The category of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TxKind {
    /// Authorized creation of new supply.
    Mint,
    /// Destruction of supply (daily burn, heart-attack loss).
    Burn,
    /// Wages paid from the vault to an agent (tax withheld in place).
    Earn,
    /// An agent paying the city (flows back into the vault).
    Spend,
    /// A bilateral agent-to-agent transfer.
    Transfer,
    /// An explicit levy collected into the vault.
    Tax,
    /// A court-ordered payment from a criminal to the vault.
    Fine,
    /// A vault grant to an agent below the welfare floor.
    Welfare,
}

/// A counterparty on a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum LedgerParty {
    /// A specific agent's balance.
    Agent(crate::ids::AgentId),
    /// The city vault.
    Vault,
    /// The burn sink. Tokens sent here leave the supply entirely.
    Sink,
}

// ---------------------------------------------------------------------------
// Cases, projects, assets, gangs
// ---------------------------------------------------------------------------

/// The lifecycle status of a police case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CaseStatus {
    /// Under daily investigation.
    Open,
    /// Closed with a guilty verdict.
    Solved,
    /// Shelved after the cold-case window elapsed with no new evidence.
    Cold,
}

/// The lifecycle status of a joint project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ProjectStatus {
    /// Accepting contributions.
    Active,
    /// Goal reached; a standing asset exists.
    Completed,
    /// No contributions for the abandonment window.
    Abandoned,
}

/// The lifecycle status of a standing asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AssetStatus {
    /// Applying its daily benefit.
    Standing,
    /// Damaged; benefit suspended until repaired.
    Damaged,
    /// Destroyed; benefit stopped permanently.
    Destroyed,
}

/// The closed set of buildable asset types.
///
/// Each type fixes the project goal in builder-days and any required
/// collaborator roles (see the project catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AssetType {
    /// Market stall: daily income split across merchants.
    Market,
    /// Watchtower: raises police patrol effectiveness.
    Watchtower,
    /// Hospital: daily healer bonus; requires healer participation.
    Hospital,
    /// School: doubles newborn comprehension gain; teacher bonus.
    School,
    /// Road: explorer bonus; places road tiles.
    Road,
    /// Archive: messenger bonus; flags precise newspaper sourcing.
    Archive,
}

/// The lifecycle status of a gang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum GangStatus {
    /// Operating; earn multipliers apply.
    Active,
    /// Leader convicted; multipliers revoked.
    Broken,
    /// Wound down voluntarily.
    Disbanded,
}

// ---------------------------------------------------------------------------
// Actions & time
// ---------------------------------------------------------------------------

/// The closed action vocabulary across all roles.
///
/// Each role is allowed a subset (see `RoleCapabilities`); the decision
/// facade rejects out-of-vocabulary actions and substitutes the role
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Do the role's ordinary paid work.
    Work,
    /// Lie low and observe (criminal idle).
    Lurk,
    /// Steal from a chosen or auto-selected target.
    Steal,
    /// Walk a patrol route; may trigger arrest scans.
    Patrol,
    /// Heal a target agent.
    Heal,
    /// Hold class for student agents.
    Teach,
    /// Attend class (newborns).
    Study,
    /// Offer a trade to another agent.
    Trade,
    /// Range beyond the city edge (explorers).
    Explore,
    /// Carry messages and gather the day's news (messengers).
    Deliver,
    /// Take on case work or a courtroom defense (lawyers).
    Defend,
    /// Report a known crime to the police.
    Report,
    /// Send an inbox message.
    SendMessage,
    /// Put the day into an active project.
    ContributeProject,
    /// Propose a new project.
    StartProject,
    /// Claim a free home lot.
    ClaimHome,
    /// Court recruitable contacts (gang leaders).
    Recruit,
    /// Demand payment for silence (blackmailers).
    Blackmail,
    /// Destroy a standing asset (saboteurs).
    DestroyAsset,
    /// Offer an officer money to look away.
    OfferBribe,
    /// Do nothing today.
    Rest,
}

/// Coarse phase-of-day marker broadcast to visual clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TimePhase {
    /// The day opens; benefits are applied.
    Morning,
    /// Agents take their turns.
    Midday,
    /// Meetings and vault policy.
    Evening,
    /// Promotions, persistence, broadcast.
    Night,
}
