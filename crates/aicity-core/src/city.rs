//! The `City` aggregate: the single value owning all authoritative state.
//!
//! The scheduler owns the `City` and is its only writer during a tick;
//! every component takes an explicit reference. There are no process-wide
//! singletons, and entities reference each other by id only -- lookups go
//! through the owning store.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use aicity_agents::{CaseBoard, GangRegistry, factory};
use aicity_city::{AssetRegistry, CityMap, ProjectBoard};
use aicity_events::EventLog;
use aicity_ledger::Ledger;
use aicity_social::{BondTable, MessageBus, MoodRegister};
use aicity_types::{
    AgentId, AgentRecord, AgentStatus, AgentView, CauseOfDeath, CitySnapshot, Role, Story,
};

use crate::config::SimulationConfig;

/// The whole simulation state for one city.
#[derive(Debug, Clone)]
pub struct City {
    /// The current day counter. The scheduler is the sole writer.
    pub day: u64,
    /// The loaded configuration.
    pub config: SimulationConfig,
    /// All agent records, living and dead.
    pub agents: BTreeMap<AgentId, AgentRecord>,
    /// The token ledger.
    pub ledger: Ledger,
    /// The event log.
    pub events: EventLog,
    /// The bond table.
    pub bonds: BondTable,
    /// The mood register.
    pub moods: MoodRegister,
    /// The message bus.
    pub messages: MessageBus,
    /// The project board.
    pub projects: ProjectBoard,
    /// The asset registry.
    pub assets: AssetRegistry,
    /// The city map (lots, tiles, zones).
    pub map: CityMap,
    /// The gang registry.
    pub gangs: GangRegistry,
    /// The police case board.
    pub cases: CaseBoard,
    /// Published narrative artifacts.
    pub stories: Vec<Story>,
    /// The seeded RNG; persisted so resume stays deterministic.
    pub rng: StdRng,
}

impl City {
    /// Create a fresh city at day 0 from configuration.
    pub fn genesis(config: SimulationConfig) -> Self {
        let ledger = Ledger::genesis(
            config.city.initial_supply,
            config.city.mint_key.clone(),
            config.economy.ledger_policy(),
        );
        let rng = StdRng::seed_from_u64(config.city.seed);
        info!(name = config.city.name.as_str(), seed = config.city.seed, "city created");
        Self {
            day: 0,
            agents: BTreeMap::new(),
            ledger,
            events: EventLog::with_knower_threshold(config.social.knower_threshold),
            bonds: BondTable::new(),
            moods: MoodRegister::new(),
            messages: MessageBus::with_ttl(config.social.message_ttl_days),
            projects: ProjectBoard::new(),
            assets: AssetRegistry::new(),
            map: CityMap::with_zones(config.city.zone_count),
            gangs: GangRegistry::new(),
            cases: CaseBoard::new(config.police.clone()),
            stories: Vec::new(),
            rng,
            config,
        }
    }

    /// Spawn and register one agent.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the vault cannot fund the starting
    /// balance.
    pub fn spawn_agent(
        &mut self,
        name: impl Into<String>,
        role: Role,
    ) -> Result<AgentId, aicity_ledger::LedgerError> {
        let mut record = factory::spawn(name, role, self.day, &mut self.rng);
        record.zone = self.rng.random_range(0..self.map.zone_count());
        let id = record.id;
        self.ledger
            .register(self.day, id, self.config.economy.starting_tokens)?;
        self.agents.insert(id, record);
        Ok(id)
    }

    /// Alive agents (imprisoned included), in id order.
    pub fn alive_agents(&self) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| a.id)
            .collect()
    }

    /// The per-day turn order: descending balance, ties by id.
    pub fn turn_order(&self) -> Vec<AgentId> {
        let mut order: Vec<(i64, AgentId)> = self
            .agents
            .values()
            .filter(|a| a.takes_turn())
            .map(|a| (self.ledger.balance(a.id), a.id))
            .collect();
        order.sort_by(|x, y| y.0.cmp(&x.0).then(x.1.cmp(&y.1)));
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// Mark an agent dead, retire their ledger account, and clear mood.
    ///
    /// The caller must have driven the balance to zero already (death only
    /// happens by starvation-style burns).
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the balance is not zero.
    pub fn kill_agent(
        &mut self,
        agent: AgentId,
        cause: CauseOfDeath,
    ) -> Result<(), aicity_ledger::LedgerError> {
        self.ledger.retire(agent)?;
        self.moods.remove(agent);
        if let Some(record) = self.agents.get_mut(&agent) {
            record.status = AgentStatus::Dead;
            record.cause_of_death = Some(cause);
            info!(day = self.day, %agent, %cause, "agent died");
        }
        Ok(())
    }

    /// Roll fresh daily zones for every alive agent.
    pub fn assign_zones(&mut self) {
        let zone_count = self.map.zone_count();
        let alive = self.alive_agents();
        for agent in alive {
            let zone = self.rng.random_range(0..zone_count);
            if let Some(record) = self.agents.get_mut(&agent) {
                record.zone = zone;
            }
        }
    }

    /// The compact projection of one agent for observers.
    pub fn agent_view(&self, agent: &AgentRecord) -> AgentView {
        AgentView {
            id: agent.id,
            name: agent.name.clone(),
            role: agent.role,
            status: agent.status,
            tokens: self.ledger.balance(agent.id),
            age_days: agent.age_days,
            mood: self.moods.get(agent.id),
            home_lot: agent.home_lot,
            position: agent.position,
        }
    }

    /// A full snapshot consistent with the last committed day.
    pub fn snapshot(&self) -> CitySnapshot {
        let (living, dead): (Vec<&AgentRecord>, Vec<&AgentRecord>) = self
            .agents
            .values()
            .partition(|a| a.is_alive());
        CitySnapshot {
            day: self.day,
            agents: living.into_iter().map(|a| self.agent_view(a)).collect(),
            graveyard: dead.into_iter().map(|a| self.agent_view(a)).collect(),
            assets: self.assets.all().cloned().collect(),
            projects: self.projects.all().cloned().collect(),
            gangs: self.gangs.all().cloned().collect(),
            lots: self.map.lots().cloned().collect(),
            tiles: self.map.tiles().cloned().collect(),
            vault_balance: self.ledger.vault().vault_balance,
            circulating: self.ledger.vault().circulating(),
            total_supply: self.ledger.vault().total_supply,
        }
    }

    /// Yesterday's newspaper, if one was published.
    pub fn newspaper_for(&self, day: u64) -> Option<&Story> {
        self.stories
            .iter()
            .rev()
            .find(|s| s.day == day && s.kind == aicity_types::StoryKind::Daily)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_city() -> City {
        City::genesis(SimulationConfig::default())
    }

    #[test]
    fn genesis_conserves_supply() {
        let city = small_city();
        assert!(city.ledger.verify_conservation().is_ok());
        assert_eq!(
            city.ledger.vault().vault_balance,
            city.config.city.initial_supply
        );
    }

    #[test]
    fn spawned_agents_get_starting_balance() {
        let mut city = small_city();
        let id = city.spawn_agent("Ona", Role::Builder).unwrap();
        assert_eq!(city.ledger.balance(id), 1000);
        assert!(city.alive_agents().contains(&id));
        assert!(city.ledger.verify_conservation().is_ok());
    }

    #[test]
    fn turn_order_is_wealth_descending() {
        let mut city = small_city();
        let poor = city.spawn_agent("Pale", Role::Builder).unwrap();
        let rich = city.spawn_agent("Rime", Role::Merchant).unwrap();
        let _ = city.ledger.earn(0, rich, 500, "WAGES").unwrap();
        let order = city.turn_order();
        assert_eq!(order.first(), Some(&rich));
        assert_eq!(order.last(), Some(&poor));
    }

    #[test]
    fn killed_agents_leave_the_turn_order_but_stay_in_the_graveyard() {
        let mut city = small_city();
        let id = city.spawn_agent("Ona", Role::Builder).unwrap();
        let _ = city.ledger.burn(0, id, 1000, "DAILY_BURN").unwrap();
        city.kill_agent(id, CauseOfDeath::Starvation).unwrap();
        assert!(city.turn_order().is_empty());
        let snapshot = city.snapshot();
        assert_eq!(snapshot.graveyard.len(), 1);
        assert!(snapshot.agents.is_empty());
    }

    #[test]
    fn same_seed_spawns_identical_zones() {
        let mut a = small_city();
        let mut b = small_city();
        let id_a = a.spawn_agent("Ona", Role::Builder).unwrap();
        let id_b = b.spawn_agent("Ona", Role::Builder).unwrap();
        assert_eq!(
            a.agents.get(&id_a).unwrap().zone,
            b.agents.get(&id_b).unwrap().zone
        );
    }
}
