//! The population spawner: seed agents for a fresh city.
//!
//! Names are drawn without replacement from a fixed pool, falling back to
//! numbered variants when the pool runs dry. Composition comes from the
//! `population` section of the configuration.

use tracing::info;

use aicity_core::City;
use aicity_core::config::PopulationConfig;
use aicity_types::Role;

use crate::error::EngineError;

/// The name pool for seed agents.
const NAMES: [&str; 24] = [
    "Ona", "Marta", "Vera", "Sable", "Ruta", "Mirel", "Quill", "Brone", "Asha", "Pale", "Rime",
    "Calder", "Iva", "Theo", "Nils", "Petra", "Juno", "Edda", "Sorrel", "Vance", "Lira", "Osmund",
    "Greta", "Hollis",
];

/// Spawn the genesis population into an empty city.
///
/// # Errors
///
/// Returns [`EngineError::Spawn`] if the vault cannot fund a starting
/// balance.
pub fn spawn_population(city: &mut City, population: &PopulationConfig) -> Result<u32, EngineError> {
    let mut name_index = 0;
    let mut total = 0;
    let plan: [(Role, u32); 13] = [
        (Role::Builder, population.builders),
        (Role::Explorer, population.explorers),
        (Role::Merchant, population.merchants),
        (Role::Police, population.police),
        (Role::Teacher, population.teachers),
        (Role::Healer, population.healers),
        (Role::Messenger, population.messengers),
        (Role::Lawyer, population.lawyers),
        (Role::Thief, population.thieves),
        (Role::Newborn, population.newborns),
        (Role::GangLeader, population.gang_leaders),
        (Role::Blackmailer, population.blackmailers),
        (Role::Saboteur, population.saboteurs),
    ];

    for (role, count) in plan {
        for _ in 0..count {
            let name = next_name(&mut name_index);
            city.spawn_agent(name, role)
                .map_err(|e| EngineError::Spawn(e.to_string()))?;
            total = u32::saturating_add(total, 1);
        }
    }

    info!(total, "population spawned");
    Ok(total)
}

/// Draw the next name, numbering past the pool's end.
fn next_name(index: &mut usize) -> String {
    let name = NAMES.get(*index).map_or_else(
        || {
            let overflow = index.saturating_sub(NAMES.len()).saturating_add(2);
            format!("Citizen{overflow}")
        },
        |n| String::from(*n),
    );
    *index = index.saturating_add(1);
    name
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aicity_core::SimulationConfig;

    use super::*;

    #[test]
    fn default_population_spawns_and_conserves() {
        let mut city = City::genesis(SimulationConfig::default());
        let total = spawn_population(&mut city, &PopulationConfig::default()).unwrap();
        assert_eq!(city.alive_agents().len(), usize::try_from(total).unwrap());
        assert!(city.ledger.verify_conservation().is_ok());
    }

    #[test]
    fn names_do_not_repeat_within_the_pool() {
        let mut city = City::genesis(SimulationConfig::default());
        let population = PopulationConfig {
            builders: 12,
            ..PopulationConfig::default()
        };
        let _ = spawn_population(&mut city, &population).unwrap();
        let mut names: Vec<&str> = city.agents.values().map(|a| a.name.as_str()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
