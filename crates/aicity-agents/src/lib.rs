//! Agent records, behavior dispatch, police cases, and gangs for the
//! AIcity simulation.
//!
//! This crate holds the state machines that make the city a society
//! rather than a ledger: the behavior dispatcher that turns parsed
//! decisions into mutations, the police case engine with its cold-case
//! clock and corruption weighting, and the gang system with its
//! desperation-driven recruitment and collapse-on-conviction rule.
//!
//! # Modules
//!
//! - [`factory`] -- Agent creation with role-appropriate hidden fields.
//! - [`config`] -- Behavior, police, and gang knobs with documented
//!   nominal defaults.
//! - [`behavior`] -- The [`behavior::execute_turn`] dispatcher and its
//!   [`behavior::TurnContext`].
//! - [`police`] -- The [`CaseBoard`] lifecycle engine and prompt assembly.
//! - [`gangs`] -- The [`GangRegistry`] with recruitment, multipliers,
//!   exposure, and collapse.

pub mod behavior;
pub mod config;
pub mod error;
pub mod factory;
pub mod gangs;
pub mod police;

pub use behavior::{TurnContext, TurnOutcome, execute_turn};
pub use config::{BehaviorConfig, GangConfig, PoliceConfig};
pub use error::AgentError;
pub use gangs::{GangRegistry, RecruitWeight, recruit_weight};
pub use police::{
    ArrestRequest, CaseBoard, build_case_prompt, drift_susceptibility, officer_framing,
};
