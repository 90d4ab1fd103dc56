//! The mood register: one affect scalar per agent.
//!
//! Mood lives in [-1.0, 1.0]. Triggers accumulate through the day into a
//! pending delta; the scheduler folds them in once during the mood-update
//! phase, clamping the result. Mood reaches the reasoning model only as
//! descriptive text, never as a number.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use aicity_types::AgentId;

/// Maximum mood.
const MOOD_MAX: Decimal = Decimal::ONE;

/// Minimum mood.
const MOOD_MIN: Decimal = Decimal::NEGATIVE_ONE;

/// A documented mood trigger.
///
/// Each variant carries its fixed delta; the table mirrors the simulation's
/// affect rules one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodTrigger {
    /// Victim of a theft (-0.20).
    TheftVictim,
    /// An asset was destroyed; applies to every alive non-actor (-0.30).
    AssetDestroyed,
    /// One day of inaction on a case you reported (-0.15).
    ColdCaseInaction,
    /// Received a welfare grant (+0.10).
    WelfareReceived,
    /// Healed by a healer (+0.15).
    Healed,
    /// Guilty verdict in a case you reported (+0.20).
    JusticeServed,
    /// Daily earnings above the strong-earnings threshold (+0.05).
    StrongEarnings,
    /// Balance below the survival floor (-0.10).
    DailyStress,
}

impl MoodTrigger {
    /// The fixed delta this trigger contributes.
    pub fn delta(self) -> Decimal {
        match self {
            Self::TheftVictim => Decimal::new(-20, 2),
            Self::AssetDestroyed => Decimal::new(-30, 2),
            Self::ColdCaseInaction => Decimal::new(-15, 2),
            Self::WelfareReceived => Decimal::new(10, 2),
            Self::Healed => Decimal::new(15, 2),
            Self::JusticeServed => Decimal::new(20, 2),
            Self::StrongEarnings => Decimal::new(5, 2),
            Self::DailyStress => Decimal::new(-10, 2),
        }
    }
}

/// Per-agent mood with daily accumulation.
#[derive(Debug, Clone, Default)]
pub struct MoodRegister {
    moods: BTreeMap<AgentId, Decimal>,
    pending: BTreeMap<AgentId, Decimal>,
}

impl MoodRegister {
    /// Create an empty register.
    pub const fn new() -> Self {
        Self {
            moods: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    /// Current mood. Unknown agents are neutral.
    pub fn get(&self, agent: AgentId) -> Decimal {
        self.moods.get(&agent).copied().unwrap_or(Decimal::ZERO)
    }

    /// Set a mood directly (factory and resume path).
    pub fn set(&mut self, agent: AgentId, mood: Decimal) {
        self.moods.insert(agent, mood.clamp(MOOD_MIN, MOOD_MAX));
    }

    /// Queue a trigger for the daily fold.
    pub fn queue(&mut self, agent: AgentId, trigger: MoodTrigger) {
        let pending = self.pending.entry(agent).or_insert(Decimal::ZERO);
        *pending = pending.saturating_add(trigger.delta());
    }

    /// Fold all pending deltas into moods, clamped, and clear the queue.
    ///
    /// Returns the agents whose mood changed, with their new values.
    pub fn apply_day(&mut self) -> Vec<(AgentId, Decimal)> {
        let mut changed = Vec::new();
        let pending = core::mem::take(&mut self.pending);
        for (agent, delta) in pending {
            if delta.is_zero() {
                continue;
            }
            let mood = self.moods.entry(agent).or_insert(Decimal::ZERO);
            let next = mood.saturating_add(delta).clamp(MOOD_MIN, MOOD_MAX);
            if next != *mood {
                *mood = next;
                changed.push((agent, next));
            }
        }
        changed
    }

    /// All moods (checkpoint path).
    pub const fn all(&self) -> &BTreeMap<AgentId, Decimal> {
        &self.moods
    }

    /// Drop an agent from the register (death).
    pub fn remove(&mut self, agent: AgentId) {
        self.moods.remove(&agent);
        self.pending.remove(&agent);
    }
}

/// Render a mood scalar as descriptive text for the decision facade.
pub fn mood_text(mood: Decimal) -> &'static str {
    if mood >= Decimal::new(6, 1) {
        "bright and hopeful"
    } else if mood >= Decimal::new(2, 1) {
        "in decent spirits"
    } else if mood > Decimal::new(-2, 1) {
        "getting by"
    } else if mood > Decimal::new(-6, 1) {
        "worn down and bitter"
    } else {
        "desperate, with nothing left to lose"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn triggers_accumulate_then_fold_once() {
        let mut register = MoodRegister::new();
        let agent = AgentId::new();
        register.queue(agent, MoodTrigger::TheftVictim);
        register.queue(agent, MoodTrigger::DailyStress);
        // Nothing applied until the fold.
        assert_eq!(register.get(agent), Decimal::ZERO);
        let changed = register.apply_day();
        assert_eq!(changed.len(), 1);
        assert_eq!(register.get(agent), Decimal::new(-30, 2));
        // Queue is cleared; a second fold is a no-op.
        assert!(register.apply_day().is_empty());
    }

    #[test]
    fn mood_clamps_at_extremes() {
        let mut register = MoodRegister::new();
        let agent = AgentId::new();
        for _ in 0..10 {
            register.queue(agent, MoodTrigger::AssetDestroyed);
        }
        let _ = register.apply_day();
        assert_eq!(register.get(agent), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn trigger_table_matches_documentation() {
        assert_eq!(MoodTrigger::TheftVictim.delta(), Decimal::new(-20, 2));
        assert_eq!(MoodTrigger::AssetDestroyed.delta(), Decimal::new(-30, 2));
        assert_eq!(MoodTrigger::ColdCaseInaction.delta(), Decimal::new(-15, 2));
        assert_eq!(MoodTrigger::WelfareReceived.delta(), Decimal::new(10, 2));
        assert_eq!(MoodTrigger::Healed.delta(), Decimal::new(15, 2));
        assert_eq!(MoodTrigger::JusticeServed.delta(), Decimal::new(20, 2));
        assert_eq!(MoodTrigger::StrongEarnings.delta(), Decimal::new(5, 2));
        assert_eq!(MoodTrigger::DailyStress.delta(), Decimal::new(-10, 2));
    }

    #[test]
    fn mood_text_never_exposes_numbers() {
        for raw in [-100i64, -71, -30, 0, 30, 71, 100] {
            let text = mood_text(Decimal::new(raw, 2));
            assert!(!text.chars().any(|c| c.is_ascii_digit()));
        }
    }
}
