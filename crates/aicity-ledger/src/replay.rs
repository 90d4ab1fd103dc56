//! Transaction log replay and conservation verification.
//!
//! The transaction log alone is sufficient to reconstruct every balance
//! and the vault. [`replay`] performs that reconstruction; the ledger's
//! [`verify_conservation`] compares it against live state as
//! defense-in-depth against corruption. A mismatch is the simulation's
//! most critical integrity alert: the scheduler halts the day and refuses
//! to checkpoint.
//!
//! [`verify_conservation`]: crate::Ledger::verify_conservation

use std::collections::BTreeMap;

use aicity_types::{AgentId, LedgerParty, Transaction};

use crate::{Ledger, LedgerError};

/// The state reconstructed from a transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayState {
    /// Reconstructed agent balances.
    pub balances: BTreeMap<AgentId, i64>,
    /// Reconstructed vault balance.
    pub vault_balance: i64,
    /// Reconstructed total supply (mints minus burns).
    pub total_supply: i64,
}

/// Replay a transaction log from a zero state.
///
/// Flows crossing the supply boundary adjust `total_supply`: a transaction
/// sourced at [`LedgerParty::Sink`] creates tokens, one ending at the sink
/// destroys them. All other flows move tokens between agents and the vault.
///
/// # Errors
///
/// Returns [`LedgerError::Reconciliation`] if the log drives any balance
/// negative or overflows -- a well-formed log never does either.
pub fn replay(entries: &[Transaction]) -> Result<ReplayState, LedgerError> {
    let mut state = ReplayState {
        balances: BTreeMap::new(),
        vault_balance: 0,
        total_supply: 0,
    };

    for tx in entries {
        if tx.amount <= 0 {
            return Err(LedgerError::Reconciliation(format!(
                "transaction {} has non-positive amount {}",
                tx.id, tx.amount
            )));
        }

        match tx.from {
            LedgerParty::Agent(agent) => {
                let balance = state.balances.entry(agent).or_insert(0);
                let next = balance.checked_sub(tx.amount).ok_or_else(|| {
                    LedgerError::Reconciliation(format!("replay underflow at {}", tx.id))
                })?;
                if next < 0 {
                    return Err(LedgerError::Reconciliation(format!(
                        "replay drives {agent} negative at {}",
                        tx.id
                    )));
                }
                *balance = next;
            }
            LedgerParty::Vault => {
                state.vault_balance =
                    state.vault_balance.checked_sub(tx.amount).ok_or_else(|| {
                        LedgerError::Reconciliation(format!("replay vault underflow at {}", tx.id))
                    })?;
            }
            LedgerParty::Sink => {
                state.total_supply =
                    state.total_supply.checked_add(tx.amount).ok_or_else(|| {
                        LedgerError::Reconciliation(format!("replay supply overflow at {}", tx.id))
                    })?;
            }
        }

        match tx.to {
            LedgerParty::Agent(agent) => {
                let balance = state.balances.entry(agent).or_insert(0);
                *balance = balance.checked_add(tx.amount).ok_or_else(|| {
                    LedgerError::Reconciliation(format!("replay overflow at {}", tx.id))
                })?;
            }
            LedgerParty::Vault => {
                state.vault_balance =
                    state.vault_balance.checked_add(tx.amount).ok_or_else(|| {
                        LedgerError::Reconciliation(format!("replay vault overflow at {}", tx.id))
                    })?;
            }
            LedgerParty::Sink => {
                state.total_supply =
                    state.total_supply.checked_sub(tx.amount).ok_or_else(|| {
                        LedgerError::Reconciliation(format!("replay supply underflow at {}", tx.id))
                    })?;
            }
        }
    }

    Ok(state)
}

impl Ledger {
    /// Verify that live state matches a full replay of the log and that the
    /// conservation law holds.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Reconciliation`] describing the first
    /// discrepancy found. The caller must treat this as fatal for the
    /// current day.
    pub fn verify_conservation(&self) -> Result<(), LedgerError> {
        let replayed = replay(self.transactions())?;

        if replayed.vault_balance != self.vault().vault_balance {
            return Err(LedgerError::Reconciliation(format!(
                "vault mismatch: live {}, replayed {}",
                self.vault().vault_balance,
                replayed.vault_balance
            )));
        }
        if replayed.total_supply != self.vault().total_supply {
            return Err(LedgerError::Reconciliation(format!(
                "supply mismatch: live {}, replayed {}",
                self.vault().total_supply,
                replayed.total_supply
            )));
        }
        for (agent, balance) in self.balances() {
            let replayed_balance = replayed.balances.get(agent).copied().unwrap_or(0);
            if replayed_balance != *balance {
                return Err(LedgerError::Reconciliation(format!(
                    "balance mismatch for {agent}: live {balance}, replayed {replayed_balance}"
                )));
            }
        }

        let sum: i64 = self.balances().values().sum();
        let total = sum.checked_add(self.vault().vault_balance).ok_or_else(|| {
            LedgerError::Reconciliation(String::from("conservation sum overflow"))
        })?;
        if total != self.vault().total_supply {
            return Err(LedgerError::Reconciliation(format!(
                "conservation broken: balances + vault = {total}, supply = {}",
                self.vault().total_supply
            )));
        }

        Ok(())
    }
}
