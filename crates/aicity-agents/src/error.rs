//! Error types for the agents crate.

use aicity_types::{AgentId, CaseId, GangId};

/// Errors that can occur in behavior dispatch, the case engine, or the
/// gang system.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent does not exist.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// The agent is dead and takes no further actions.
    #[error("agent {0} is dead")]
    AgentDead(AgentId),

    /// The case does not exist.
    #[error("unknown case {0}")]
    UnknownCase(CaseId),

    /// The case is closed and cannot take the requested update.
    #[error("case {0} is closed")]
    CaseClosed(CaseId),

    /// The gang does not exist.
    #[error("unknown gang {0}")]
    UnknownGang(GangId),

    /// A ledger operation failed underneath a behavior.
    #[error("ledger error: {0}")]
    Ledger(#[from] aicity_ledger::LedgerError),

    /// An event log operation failed underneath a behavior.
    #[error("event error: {0}")]
    Event(#[from] aicity_events::EventError),

    /// A project or asset operation failed underneath a behavior.
    #[error("city error: {0}")]
    City(#[from] aicity_city::CityError),
}
