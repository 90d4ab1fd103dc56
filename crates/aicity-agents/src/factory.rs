//! The agent factory.
//!
//! Creates agent records with role-appropriate hidden fields: police get a
//! randomly drawn bribe susceptibility, newborns start at zero
//! comprehension with no assigned teacher.

use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use aicity_types::{AgentId, AgentRecord, AgentStatus, Role};

/// Create a fresh agent record.
///
/// The caller registers the agent with the ledger and assigns a zone
/// afterwards; the factory only shapes the record.
///
/// Agent ids are drawn from the seeded rng stream rather than the clock:
/// iteration order over agent maps feeds back into behavior, so two runs
/// under the same seed must produce the same ids.
pub fn spawn(name: impl Into<String>, role: Role, day: u64, rng: &mut impl Rng) -> AgentRecord {
    let id = AgentId::from(Uuid::from_bytes(rng.random()));
    let bribe_susceptibility = if role == Role::Police {
        // Draw in [0.10, 0.90] at two decimal places.
        let raw: i64 = rng.random_range(10..=90);
        Some(Decimal::new(raw, 2))
    } else {
        None
    };
    let comprehension = if role == Role::Newborn { Some(0) } else { None };

    AgentRecord {
        id,
        name: name.into(),
        role,
        status: AgentStatus::Alive,
        age_days: 0,
        day_born: day,
        mood: Decimal::ZERO,
        bribe_susceptibility,
        comprehension,
        assigned_teacher: None,
        home_lot: None,
        position: None,
        zone: 0,
        cause_of_death: None,
        imprisoned_until: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn police_get_hidden_susceptibility() {
        let mut rng = SmallRng::seed_from_u64(7);
        let officer = spawn("Vera", Role::Police, 0, &mut rng);
        let susceptibility = officer.bribe_susceptibility.unwrap();
        assert!(susceptibility >= Decimal::new(10, 2));
        assert!(susceptibility <= Decimal::new(90, 2));
        assert!(officer.comprehension.is_none());
    }

    #[test]
    fn newborns_start_at_zero_comprehension() {
        let mut rng = SmallRng::seed_from_u64(7);
        let newborn = spawn("Pip", Role::Newborn, 3, &mut rng);
        assert_eq!(newborn.comprehension, Some(0));
        assert!(newborn.bribe_susceptibility.is_none());
        assert_eq!(newborn.day_born, 3);
    }

    #[test]
    fn civilians_carry_neither_hidden_field() {
        let mut rng = SmallRng::seed_from_u64(7);
        let builder = spawn("Ona", Role::Builder, 0, &mut rng);
        assert!(builder.bribe_susceptibility.is_none());
        assert!(builder.comprehension.is_none());
        assert_eq!(builder.status, AgentStatus::Alive);
    }
}
