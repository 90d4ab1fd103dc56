//! The relationship table: symmetric pairwise bonds.
//!
//! Bonds are scalars in [-1.0, 1.0] tracking affinity between agent pairs.
//! All arithmetic uses [`Decimal`] for precision. Scores are clamped to the
//! valid range on every update -- no silent drift beyond bounds. A slow
//! daily decay pulls every non-zero bond back toward zero.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use aicity_types::{AgentId, Bond};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum bond score (full trust).
const SCORE_MAX: Decimal = Decimal::ONE;

/// Minimum bond score (open hostility).
const SCORE_MIN: Decimal = Decimal::NEGATIVE_ONE;

/// Bond delta for a cooperative interaction (+0.10).
pub fn delta_cooperative() -> Decimal {
    Decimal::new(10, 2)
}

/// Bond delta for an antagonistic interaction (-0.15).
pub fn delta_antagonistic() -> Decimal {
    Decimal::new(-15, 2)
}

/// Bond delta for a shared project day (+0.05).
pub fn delta_shared_project() -> Decimal {
    Decimal::new(5, 2)
}

/// Daily decay magnitude pulling bonds toward zero (0.005).
fn daily_decay() -> Decimal {
    Decimal::new(5, 3)
}

// ---------------------------------------------------------------------------
// BondTable
// ---------------------------------------------------------------------------

/// The city-wide bond table.
///
/// Pairs are keyed canonically (smaller id first) so `bond(a, b)` and
/// `bond(b, a)` are the same cell by construction.
#[derive(Debug, Clone, Default)]
pub struct BondTable {
    bonds: BTreeMap<(AgentId, AgentId), BondCell>,
}

/// One stored bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BondCell {
    score: Decimal,
    last_updated_day: u64,
}

/// Canonical unordered pair key.
fn key(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Clamp a score into [-1, 1].
fn clamp(score: Decimal) -> Decimal {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

impl BondTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            bonds: BTreeMap::new(),
        }
    }

    /// Rebuild from persisted bond rows (resume path).
    pub fn from_bonds(bonds: &[Bond]) -> Self {
        let mut table = Self::new();
        for bond in bonds {
            table.bonds.insert(
                key(bond.a, bond.b),
                BondCell {
                    score: clamp(bond.score),
                    last_updated_day: bond.last_updated_day,
                },
            );
        }
        table
    }

    /// The bond between two agents. Unknown pairs are zero.
    pub fn get(&self, a: AgentId, b: AgentId) -> Decimal {
        self.bonds
            .get(&key(a, b))
            .map_or(Decimal::ZERO, |cell| cell.score)
    }

    /// Apply a signed delta to a pair's bond, clamped to [-1, 1].
    pub fn apply(&mut self, a: AgentId, b: AgentId, delta: Decimal, day: u64) {
        if a == b {
            return;
        }
        let cell = self.bonds.entry(key(a, b)).or_insert(BondCell {
            score: Decimal::ZERO,
            last_updated_day: day,
        });
        cell.score = clamp(cell.score.saturating_add(delta));
        cell.last_updated_day = day;
    }

    /// Decay every non-zero bond toward zero by the daily decay step.
    ///
    /// Bonds touched today are skipped -- a fresh interaction is not
    /// already fading. Bonds within one step of zero land exactly on zero
    /// rather than oscillating.
    pub fn decay_all(&mut self, day: u64) {
        let step = daily_decay();
        for cell in self.bonds.values_mut() {
            if cell.score.is_zero() || cell.last_updated_day == day {
                continue;
            }
            let magnitude = cell.score.abs();
            cell.score = if magnitude <= step {
                Decimal::ZERO
            } else if cell.score > Decimal::ZERO {
                cell.score.saturating_sub(step)
            } else {
                cell.score.saturating_add(step)
            };
            cell.last_updated_day = day;
        }
    }

    /// The `k` warmest bonds of an agent, strongest first.
    pub fn top_positive(&self, agent: AgentId, k: usize) -> Vec<(AgentId, Decimal)> {
        let mut scored = self.bonds_of(agent);
        scored.retain(|(_, score)| *score > Decimal::ZERO);
        scored.sort_by(|x, y| y.1.cmp(&x.1));
        scored.truncate(k);
        scored
    }

    /// The `k` coldest bonds of an agent, coldest first.
    pub fn top_negative(&self, agent: AgentId, k: usize) -> Vec<(AgentId, Decimal)> {
        let mut scored = self.bonds_of(agent);
        scored.retain(|(_, score)| *score < Decimal::ZERO);
        scored.sort_by(|x, y| x.1.cmp(&y.1));
        scored.truncate(k);
        scored
    }

    /// All bonds involving an agent.
    fn bonds_of(&self, agent: AgentId) -> Vec<(AgentId, Decimal)> {
        self.bonds
            .iter()
            .filter_map(|(&(a, b), cell)| {
                if a == agent {
                    Some((b, cell.score))
                } else if b == agent {
                    Some((a, cell.score))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Flatten to persistable rows.
    pub fn all(&self) -> Vec<Bond> {
        self.bonds
            .iter()
            .map(|(&(a, b), cell)| Bond {
                a,
                b,
                score: cell.score,
                last_updated_day: cell.last_updated_day,
            })
            .collect()
    }

    /// Bonds whose last update is the given day (checkpoint delta).
    pub fn updated_on(&self, day: u64) -> Vec<Bond> {
        self.bonds
            .iter()
            .filter(|(_, cell)| cell.last_updated_day == day)
            .map(|(&(a, b), cell)| Bond {
                a,
                b,
                score: cell.score,
                last_updated_day: cell.last_updated_day,
            })
            .collect()
    }

    /// A prose annotation for a bond score, used in decision contexts.
    pub fn annotate(score: Decimal) -> &'static str {
        if score >= Decimal::new(6, 1) {
            "a trusted friend"
        } else if score >= Decimal::new(2, 1) {
            "on good terms"
        } else if score > Decimal::new(-2, 1) {
            "an acquaintance"
        } else if score > Decimal::new(-6, 1) {
            "on bad terms"
        } else {
            "an open enemy"
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bonds_are_symmetric() {
        let mut table = BondTable::new();
        let a = AgentId::new();
        let b = AgentId::new();
        table.apply(a, b, delta_cooperative(), 1);
        assert_eq!(table.get(a, b), table.get(b, a));
        assert_eq!(table.get(a, b), Decimal::new(10, 2));
    }

    #[test]
    fn bonds_clamp_at_extremes() {
        let mut table = BondTable::new();
        let a = AgentId::new();
        let b = AgentId::new();
        for _ in 0..20 {
            table.apply(a, b, delta_antagonistic(), 1);
        }
        assert_eq!(table.get(a, b), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn self_bonds_ignored() {
        let mut table = BondTable::new();
        let a = AgentId::new();
        table.apply(a, a, delta_cooperative(), 1);
        assert_eq!(table.get(a, a), Decimal::ZERO);
        assert!(table.all().is_empty());
    }

    #[test]
    fn decay_pulls_toward_zero_and_settles() {
        let mut table = BondTable::new();
        let a = AgentId::new();
        let b = AgentId::new();
        table.apply(a, b, Decimal::new(1, 2), 1);
        table.decay_all(2);
        assert_eq!(table.get(a, b), Decimal::new(5, 3));
        table.decay_all(3);
        assert_eq!(table.get(a, b), Decimal::ZERO);
        // Settled: no oscillation below zero.
        table.decay_all(4);
        assert_eq!(table.get(a, b), Decimal::ZERO);
    }

    #[test]
    fn negative_bonds_decay_upward() {
        let mut table = BondTable::new();
        let a = AgentId::new();
        let b = AgentId::new();
        table.apply(a, b, Decimal::new(-10, 2), 1);
        table.decay_all(2);
        assert_eq!(table.get(a, b), Decimal::new(-95, 3));
    }

    #[test]
    fn top_k_splits_by_sign() {
        let mut table = BondTable::new();
        let me = AgentId::new();
        let friend = AgentId::new();
        let enemy = AgentId::new();
        table.apply(me, friend, Decimal::new(50, 2), 1);
        table.apply(me, enemy, Decimal::new(-70, 2), 1);

        let warm = table.top_positive(me, 3);
        assert_eq!(warm.len(), 1);
        assert_eq!(warm.first().map(|(id, _)| *id), Some(friend));

        let cold = table.top_negative(me, 3);
        assert_eq!(cold.len(), 1);
        assert_eq!(cold.first().map(|(id, _)| *id), Some(enemy));
    }

    #[test]
    fn round_trip_through_rows() {
        let mut table = BondTable::new();
        let a = AgentId::new();
        let b = AgentId::new();
        table.apply(a, b, delta_cooperative(), 3);
        let rebuilt = BondTable::from_bonds(&table.all());
        assert_eq!(rebuilt.get(a, b), table.get(a, b));
    }

    #[test]
    fn annotations_cover_the_range() {
        assert_eq!(BondTable::annotate(Decimal::ONE), "a trusted friend");
        assert_eq!(BondTable::annotate(Decimal::ZERO), "an acquaintance");
        assert_eq!(BondTable::annotate(Decimal::NEGATIVE_ONE), "an open enemy");
    }
}
