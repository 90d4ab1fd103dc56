//! The token ledger: balances, the city vault, and the append-only
//! transaction log.
//!
//! # Design
//!
//! - **Append-only**: transactions are never modified or deleted.
//! - **Single counterparty rule**: every flow either has the vault on one
//!   side, moves tokens between two agents, or crosses the supply boundary
//!   (mint in, burn out). There are no unbacked credits.
//! - **Conservation**: at every instant,
//!   `sum(agent balances) + vault_balance == total_supply`.
//! - **Integer tokens**: all quantities are `i64`; fractional math (tax,
//!   caps) uses [`Decimal`] and floors back to whole tokens.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use aicity_types::{AgentId, LedgerParty, Transaction, TxId, TxKind};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Policy & authorization
// ---------------------------------------------------------------------------

/// Tunable ledger policy, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Fraction of gross earnings withheld into the vault.
    pub tax_rate: Decimal,
    /// No agent may hold more than this fraction of total supply.
    pub wealth_cap_fraction: Decimal,
    /// Transfers may not leave the source below this balance.
    pub transfer_floor: i64,
    /// Length of the rolling mint window, in days.
    pub mint_period_days: u64,
    /// Fraction of supply that may be minted per window.
    pub mint_period_cap_fraction: Decimal,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(10, 2),
            wealth_cap_fraction: Decimal::new(5, 2),
            transfer_floor: 50,
            mint_period_days: 30,
            mint_period_cap_fraction: Decimal::new(10, 2),
        }
    }
}

/// The capability token required by [`Ledger::mint`].
///
/// Held only by the designated operator; constructed from the operator key
/// in configuration. Carrying the key in a dedicated type keeps casual call
/// sites from minting by accident.
#[derive(Debug, Clone)]
pub struct MintAuthorization {
    key: String,
}

impl MintAuthorization {
    /// Wrap an operator key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

// ---------------------------------------------------------------------------
// Vault & outcomes
// ---------------------------------------------------------------------------

/// The city vault and supply counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vault {
    /// All tokens ever minted minus all tokens ever burned.
    pub total_supply: i64,
    /// Tokens held by the vault.
    pub vault_balance: i64,
}

impl Vault {
    /// Tokens currently in agent hands.
    pub const fn circulating(&self) -> i64 {
        self.total_supply.saturating_sub(self.vault_balance)
    }
}

/// What an earn actually did after tax and the wealth cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarnOutcome {
    /// Tokens credited to the agent.
    pub credited: i64,
    /// Tokens withheld as tax (they stay in the vault).
    pub tax: i64,
    /// Whether the wealth cap reduced the credit.
    pub capped: bool,
}

/// What a burn actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnOutcome {
    /// Tokens destroyed.
    pub burned: i64,
    /// Whether the balance reached zero -- the caller must process death.
    pub starved: bool,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The authoritative token ledger for one city.
///
/// Writers serialize behind the scheduler (single-writer by construction);
/// balance reads are snapshots of the current map.
#[derive(Debug, Clone)]
pub struct Ledger {
    policy: LedgerPolicy,
    mint_key: String,
    vault: Vault,
    balances: BTreeMap<AgentId, i64>,
    retired: BTreeSet<AgentId>,
    entries: Vec<Transaction>,
}

impl Ledger {
    /// Create a ledger whose vault holds the entire initial supply.
    ///
    /// Writes the genesis mint transaction at day 0.
    pub fn genesis(initial_supply: i64, mint_key: impl Into<String>, policy: LedgerPolicy) -> Self {
        let mut ledger = Self {
            policy,
            mint_key: mint_key.into(),
            vault: Vault {
                total_supply: initial_supply,
                vault_balance: initial_supply,
            },
            balances: BTreeMap::new(),
            retired: BTreeSet::new(),
            entries: Vec::new(),
        };
        ledger.push_tx(
            0,
            LedgerParty::Sink,
            LedgerParty::Vault,
            initial_supply,
            0,
            "GENESIS",
            TxKind::Mint,
        );
        ledger
    }

    /// Rebuild a ledger from persisted state (resume path).
    ///
    /// The caller supplies the full transaction log plus the policy and key;
    /// balances and the vault are reconstructed by replay so that resume
    /// cannot drift from the books.
    pub fn from_log(
        entries: Vec<Transaction>,
        mint_key: impl Into<String>,
        policy: LedgerPolicy,
        retired: BTreeSet<AgentId>,
    ) -> Result<Self, LedgerError> {
        let replayed = crate::replay::replay(&entries)?;
        Ok(Self {
            policy,
            mint_key: mint_key.into(),
            vault: Vault {
                total_supply: replayed.total_supply,
                vault_balance: replayed.vault_balance,
            },
            balances: replayed.balances,
            retired,
            entries,
        })
    }

    // -- queries ----------------------------------------------------------

    /// Current balance for an agent. Unknown agents hold zero.
    pub fn balance(&self, agent: AgentId) -> i64 {
        self.balances.get(&agent).copied().unwrap_or(0)
    }

    /// Snapshot of all balances.
    pub const fn balances(&self) -> &BTreeMap<AgentId, i64> {
        &self.balances
    }

    /// The vault and supply counters.
    pub const fn vault(&self) -> Vault {
        self.vault
    }

    /// The active policy.
    pub const fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// The full transaction log, in commit order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.entries
    }

    /// Transactions committed on a specific day.
    pub fn transactions_for_day(&self, day: u64) -> Vec<&Transaction> {
        self.entries.iter().filter(|t| t.day == day).collect()
    }

    /// Transactions committed in an inclusive day window.
    ///
    /// The police case engine uses this to pull ledger records around an
    /// event window.
    pub fn transactions_in_window(&self, from_day: u64, to_day: u64) -> Vec<&Transaction> {
        self.entries
            .iter()
            .filter(|t| t.day >= from_day && t.day <= to_day)
            .collect()
    }

    /// Whether the agent has an account.
    pub fn is_registered(&self, agent: AgentId) -> bool {
        self.balances.contains_key(&agent)
    }

    /// The absolute wealth cap implied by current supply.
    pub fn wealth_cap(&self) -> i64 {
        fraction_of(self.vault.total_supply, self.policy.wealth_cap_fraction)
    }

    // -- mutations --------------------------------------------------------

    /// Open an account with the fixed starting balance, paid from the vault.
    ///
    /// Registration credits are exempt from the wealth cap: the starting
    /// grant is a policy constant the cap could make unsatisfiable in a
    /// small economy.
    pub fn register(
        &mut self,
        day: u64,
        agent: AgentId,
        starting_balance: i64,
    ) -> Result<(), LedgerError> {
        positive(starting_balance)?;
        if self.balances.contains_key(&agent) {
            return Err(LedgerError::AlreadyRegistered(agent));
        }
        if self.retired.contains(&agent) {
            return Err(LedgerError::AgentRetired(agent));
        }
        self.debit_vault(starting_balance)?;
        self.balances.insert(agent, starting_balance);
        self.push_tx(
            day,
            LedgerParty::Vault,
            LedgerParty::Agent(agent),
            starting_balance,
            0,
            "REGISTRATION",
            TxKind::Mint,
        );
        Ok(())
    }

    /// Pay wages from the vault, withholding tax and enforcing the wealth
    /// cap.
    ///
    /// The tax fraction of `gross` never leaves the vault; the remainder is
    /// credited up to the cap (excess is discarded, not refunded) and up to
    /// what the vault can fund.
    pub fn earn(
        &mut self,
        day: u64,
        agent: AgentId,
        gross: i64,
        reason: &str,
    ) -> Result<EarnOutcome, LedgerError> {
        positive(gross)?;
        self.require_active(agent)?;

        let tax = fraction_of(gross, self.policy.tax_rate);
        let net = gross.saturating_sub(tax);

        let cap = self.wealth_cap();
        let headroom = cap.saturating_sub(self.balance(agent)).max(0);
        let capped = net > headroom;
        let fundable = self.vault.vault_balance.max(0);
        let credited = net.min(headroom).min(fundable);

        if capped {
            debug!(%agent, net, headroom, "earn clamped by wealth cap");
        }

        if credited > 0 {
            self.debit_vault(credited)?;
            self.credit_agent(agent, credited)?;
            self.push_tx(
                day,
                LedgerParty::Vault,
                LedgerParty::Agent(agent),
                credited,
                tax,
                reason,
                TxKind::Earn,
            );
        }

        Ok(EarnOutcome {
            credited,
            tax,
            capped,
        })
    }

    /// Debit an agent paying the city; tokens flow back into the vault.
    pub fn spend(
        &mut self,
        day: u64,
        agent: AgentId,
        amount: i64,
        reason: &str,
    ) -> Result<(), LedgerError> {
        positive(amount)?;
        self.require_active(agent)?;
        let available = self.balance(agent);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                agent,
                needed: amount,
                available,
            });
        }
        self.debit_agent(agent, amount)?;
        self.credit_vault(amount)?;
        self.push_tx(
            day,
            LedgerParty::Agent(agent),
            LedgerParty::Vault,
            amount,
            0,
            reason,
            TxKind::Spend,
        );
        Ok(())
    }

    /// Bilateral transfer, clamped so the source keeps the balance floor.
    ///
    /// Returns the amount actually moved. Fails with
    /// [`LedgerError::TransferBelowFloor`] when the clamp leaves nothing to
    /// move.
    pub fn transfer(
        &mut self,
        day: u64,
        from: AgentId,
        to: AgentId,
        amount: i64,
        reason: &str,
    ) -> Result<i64, LedgerError> {
        positive(amount)?;
        self.require_active(from)?;
        self.require_active(to)?;

        let spare = self
            .balance(from)
            .saturating_sub(self.policy.transfer_floor);
        let moved = amount.min(spare.max(0));
        if moved <= 0 {
            return Err(LedgerError::TransferBelowFloor { from });
        }

        self.debit_agent(from, moved)?;
        self.credit_agent(to, moved)?;
        self.push_tx(
            day,
            LedgerParty::Agent(from),
            LedgerParty::Agent(to),
            moved,
            0,
            reason,
            TxKind::Transfer,
        );
        Ok(moved)
    }

    /// Destroy tokens from an agent's balance (supply shrinks).
    ///
    /// Clamped to the available balance. Signals starvation when the
    /// balance lands on zero; the caller owns the death consequences.
    pub fn burn(
        &mut self,
        day: u64,
        agent: AgentId,
        amount: i64,
        reason: &str,
    ) -> Result<BurnOutcome, LedgerError> {
        positive(amount)?;
        self.require_active(agent)?;

        let available = self.balance(agent);
        if available == 0 {
            return Ok(BurnOutcome {
                burned: 0,
                starved: true,
            });
        }
        let burned = amount.min(available);
        self.debit_agent(agent, burned)?;
        self.vault.total_supply = self.vault.total_supply.saturating_sub(burned);
        self.push_tx(
            day,
            LedgerParty::Agent(agent),
            LedgerParty::Sink,
            burned,
            0,
            reason,
            TxKind::Burn,
        );
        Ok(BurnOutcome {
            burned,
            starved: self.balance(agent) == 0,
        })
    }

    /// The unconditional daily burn every alive agent pays.
    pub fn burn_daily(&mut self, day: u64, agent: AgentId, amount: i64) -> Result<BurnOutcome, LedgerError> {
        self.burn(day, agent, amount, "DAILY_BURN")
    }

    /// Court-ordered payment into the vault, clamped to the available
    /// balance. Returns the amount collected.
    pub fn fine(&mut self, day: u64, criminal: AgentId, amount: i64) -> Result<i64, LedgerError> {
        positive(amount)?;
        self.require_active(criminal)?;
        let collected = amount.min(self.balance(criminal));
        if collected > 0 {
            self.debit_agent(criminal, collected)?;
            self.credit_vault(collected)?;
            self.push_tx(
                day,
                LedgerParty::Agent(criminal),
                LedgerParty::Vault,
                collected,
                0,
                "FINE",
                TxKind::Fine,
            );
        }
        Ok(collected)
    }

    /// Vault grant to an agent below the welfare floor.
    pub fn welfare(
        &mut self,
        day: u64,
        agent: AgentId,
        amount: i64,
        reason: &str,
    ) -> Result<(), LedgerError> {
        positive(amount)?;
        self.require_active(agent)?;
        if self.vault.vault_balance < amount {
            return Err(LedgerError::VaultInsufficient {
                needed: amount,
                available: self.vault.vault_balance,
            });
        }
        self.debit_vault(amount)?;
        self.credit_agent(agent, amount)?;
        self.push_tx(
            day,
            LedgerParty::Vault,
            LedgerParty::Agent(agent),
            amount,
            0,
            reason,
            TxKind::Welfare,
        );
        Ok(())
    }

    /// An untaxed vault grant (windfalls, community bonuses).
    ///
    /// Honors the wealth cap and the vault balance; returns the amount
    /// actually credited, which may be zero.
    pub fn grant(
        &mut self,
        day: u64,
        agent: AgentId,
        amount: i64,
        reason: &str,
    ) -> Result<i64, LedgerError> {
        positive(amount)?;
        self.require_active(agent)?;
        let headroom = self.wealth_cap().saturating_sub(self.balance(agent)).max(0);
        let credited = amount.min(headroom).min(self.vault.vault_balance.max(0));
        if credited > 0 {
            self.debit_vault(credited)?;
            self.credit_agent(agent, credited)?;
            self.push_tx(
                day,
                LedgerParty::Vault,
                LedgerParty::Agent(agent),
                credited,
                0,
                reason,
                TxKind::Earn,
            );
        }
        Ok(credited)
    }

    /// Guarded supply expansion into the vault.
    ///
    /// Requires the operator's [`MintAuthorization`] and respects the
    /// rolling per-period cap (a fraction of current supply).
    pub fn mint(
        &mut self,
        day: u64,
        amount: i64,
        auth: &MintAuthorization,
    ) -> Result<(), LedgerError> {
        positive(amount)?;
        if auth.key != self.mint_key {
            warn!(day, amount, "mint rejected: bad authorization");
            return Err(LedgerError::Unauthorized);
        }

        let window_start = day.saturating_sub(self.policy.mint_period_days);
        let minted_recent: i64 = self
            .entries
            .iter()
            .filter(|t| {
                t.kind == TxKind::Mint && t.from == LedgerParty::Sink && t.day > window_start
            })
            .map(|t| t.amount)
            .sum();
        let cap = fraction_of(self.vault.total_supply, self.policy.mint_period_cap_fraction);
        let remaining = cap.saturating_sub(minted_recent);
        if amount > remaining {
            return Err(LedgerError::MintCapExceeded {
                requested: amount,
                remaining: remaining.max(0),
            });
        }

        self.vault.total_supply = self.vault.total_supply.saturating_add(amount);
        self.credit_vault(amount)?;
        self.push_tx(
            day,
            LedgerParty::Sink,
            LedgerParty::Vault,
            amount,
            0,
            "MINT",
            TxKind::Mint,
        );
        Ok(())
    }

    /// Close an account on death. The balance must already be zero.
    ///
    /// Retired accounts reject every further debit and credit, which is
    /// what makes `status = dead` terminal at the ledger level.
    pub fn retire(&mut self, agent: AgentId) -> Result<(), LedgerError> {
        let balance = self.balance(agent);
        if balance != 0 {
            return Err(LedgerError::RetireWithBalance { agent, balance });
        }
        self.retired.insert(agent);
        Ok(())
    }

    /// Agents whose accounts are closed.
    pub const fn retired(&self) -> &BTreeSet<AgentId> {
        &self.retired
    }

    // -- internals --------------------------------------------------------

    fn require_active(&self, agent: AgentId) -> Result<(), LedgerError> {
        if self.retired.contains(&agent) {
            return Err(LedgerError::AgentRetired(agent));
        }
        if !self.balances.contains_key(&agent) {
            return Err(LedgerError::UnknownAgent(agent));
        }
        Ok(())
    }

    fn credit_agent(&mut self, agent: AgentId, amount: i64) -> Result<(), LedgerError> {
        let entry = self.balances.entry(agent).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Reconciliation(String::from("balance overflow")))?;
        Ok(())
    }

    fn debit_agent(&mut self, agent: AgentId, amount: i64) -> Result<(), LedgerError> {
        let entry = self
            .balances
            .get_mut(&agent)
            .ok_or(LedgerError::UnknownAgent(agent))?;
        let next = entry
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Reconciliation(String::from("balance underflow")))?;
        if next < 0 {
            return Err(LedgerError::Reconciliation(format!(
                "debit would drive {agent} negative"
            )));
        }
        *entry = next;
        Ok(())
    }

    fn credit_vault(&mut self, amount: i64) -> Result<(), LedgerError> {
        self.vault.vault_balance = self
            .vault
            .vault_balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Reconciliation(String::from("vault overflow")))?;
        Ok(())
    }

    fn debit_vault(&mut self, amount: i64) -> Result<(), LedgerError> {
        if self.vault.vault_balance < amount {
            return Err(LedgerError::VaultInsufficient {
                needed: amount,
                available: self.vault.vault_balance,
            });
        }
        self.vault.vault_balance = self.vault.vault_balance.saturating_sub(amount);
        Ok(())
    }

    fn push_tx(
        &mut self,
        day: u64,
        from: LedgerParty,
        to: LedgerParty,
        amount: i64,
        tax_withheld: i64,
        reason: &str,
        kind: TxKind,
    ) {
        self.entries.push(Transaction {
            id: TxId::new(),
            day,
            from,
            to,
            amount,
            tax_withheld,
            reason: reason.to_owned(),
            kind,
        });
    }
}

/// Floor of `amount * fraction` in whole tokens.
fn fraction_of(amount: i64, fraction: Decimal) -> i64 {
    Decimal::from(amount)
        .saturating_mul(fraction)
        .floor()
        .to_i64()
        .unwrap_or(0)
}

/// Reject zero and negative amounts.
const fn positive(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    Ok(())
}
