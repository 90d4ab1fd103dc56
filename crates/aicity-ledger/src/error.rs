//! Error types for the token ledger.

use aicity_types::AgentId;

/// Errors that can occur during ledger operations.
///
/// Callers branch on these explicitly: `InsufficientFunds` and
/// `TransferBelowFloor` are ordinary outcomes a behavior recovers from,
/// while `Reconciliation` means the books are wrong and the current day
/// must not be checkpointed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The agent's balance cannot cover the debit.
    #[error("insufficient funds for {agent}: need {needed}, have {available}")]
    InsufficientFunds {
        /// The agent being debited.
        agent: AgentId,
        /// The amount requested.
        needed: i64,
        /// The balance on hand.
        available: i64,
    },

    /// A transfer clamped by the minimum balance floor came out to zero.
    #[error("transfer from {from} clamped to zero by the balance floor")]
    TransferBelowFloor {
        /// The source agent.
        from: AgentId,
    },

    /// The vault cannot fund the requested credit.
    #[error("vault has {available}, cannot fund {needed}")]
    VaultInsufficient {
        /// The amount requested.
        needed: i64,
        /// The vault balance.
        available: i64,
    },

    /// The agent has no account in this ledger.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// The agent is already registered.
    #[error("agent {0} already registered")]
    AlreadyRegistered(AgentId),

    /// The agent is dead; their account accepts no further activity.
    #[error("agent {0} is retired; no further ledger activity permitted")]
    AgentRetired(AgentId),

    /// A zero or negative amount was supplied.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    /// The mint authorization key did not match.
    #[error("mint rejected: authorization failure")]
    Unauthorized,

    /// Minting would exceed the per-period cap.
    #[error("mint of {requested} exceeds the remaining period allowance of {remaining}")]
    MintCapExceeded {
        /// The requested amount.
        requested: i64,
        /// What the current window still allows.
        remaining: i64,
    },

    /// An agent cannot be retired while still holding tokens.
    #[error("agent {agent} still holds {balance} tokens; retire requires a zero balance")]
    RetireWithBalance {
        /// The agent.
        agent: AgentId,
        /// Their remaining balance.
        balance: i64,
    },

    /// The books do not reconcile. Fatal: the tick must halt.
    #[error("ledger reconciliation failed: {0}")]
    Reconciliation(String),
}
