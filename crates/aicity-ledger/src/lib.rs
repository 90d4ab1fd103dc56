//! Token ledger and city vault for the AIcity simulation.
//!
//! Every token in the city is tracked through this ledger. Tokens enter the
//! supply only through authorized mints and leave it only through burns;
//! every other flow has the vault or another agent as its counterparty.
//! The conservation law is verified at the end of every day:
//!
//! ```text
//! sum(agent balances) + vault_balance == total_supply
//! ```
//!
//! # Modules
//!
//! - [`ledger`] -- The [`Ledger`] struct: balances, vault, and the
//!   append-only transaction log with all spec operations.
//! - [`replay`] -- Log replay and conservation verification.
//!
//! The ledger never panics; it returns [`LedgerError`] values. A
//! [`LedgerError::Reconciliation`] is fatal for the current day: the
//! scheduler halts the tick and refuses to checkpoint.
//!
//! # Usage
//!
//! ```
//! use aicity_ledger::{Ledger, LedgerPolicy};
//! use aicity_types::AgentId;
//!
//! let mut ledger = Ledger::genesis(100_000, "operator-key", LedgerPolicy::default());
//! let agent = AgentId::new();
//! ledger.register(0, agent, 1000)?;
//!
//! let outcome = ledger.earn(1, agent, 100, "WAGES")?;
//! assert_eq!(outcome.credited + outcome.tax, 100);
//! assert!(ledger.verify_conservation().is_ok());
//! # Ok::<(), aicity_ledger::LedgerError>(())
//! ```

pub mod error;
pub mod ledger;
pub mod replay;

pub use error::LedgerError;
pub use ledger::{BurnOutcome, EarnOutcome, Ledger, LedgerPolicy, MintAuthorization, Vault};
pub use replay::{ReplayState, replay};
