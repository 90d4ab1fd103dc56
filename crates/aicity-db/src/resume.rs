//! Resume: rebuild a [`City`] from persisted state.
//!
//! Loading state at day D reproduces an engine behaviorally identical to
//! one that simulated from day 0 -- modulo reasoning-model content and
//! RNG draws. The seed is persisted; the resumed RNG stream is derived
//! from `seed ^ day` so a resumed run is itself deterministic even though
//! it does not continue the exact pre-checkpoint stream.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use sqlx::{PgPool, Row};
use tracing::info;

use aicity_city::{AssetRegistry, CityMap, DEFAULT_ABANDON_DAYS, ProjectBoard};
use aicity_core::{City, SimulationConfig};
use aicity_events::EventLog;
use aicity_ledger::Ledger;
use aicity_social::{BondTable, MessageBus, MoodRegister};
use aicity_types::{
    AgentId, AgentRecord, AgentStatus, Bond, CityEvent, CityMessage, Gang, HomeLot, PoliceCase,
    Project, Story, Transaction, WorldTile,
};

use aicity_agents::{CaseBoard, GangRegistry};

use crate::error::DbError;

/// Load the full simulation state at the last committed day.
///
/// # Errors
///
/// Returns [`DbError::Corrupt`] when records fail to deserialize or the
/// transaction log does not reconcile, and [`DbError::Postgres`] on query
/// failure.
pub async fn load_city(pool: &PgPool, config: SimulationConfig) -> Result<City, DbError> {
    let day = load_meta_u64(pool, "day").await?.unwrap_or(0);
    let seed = load_meta_u64(pool, "seed")
        .await?
        .unwrap_or(config.city.seed);

    let (agents, moods, retired) = load_agents(pool).await?;
    let transactions = load_records::<Transaction>(pool, "SELECT record FROM transactions ORDER BY id").await?;
    let events = load_records::<CityEvent>(pool, "SELECT record FROM event_log ORDER BY day, seq").await?;
    let cases = load_records::<PoliceCase>(pool, "SELECT record FROM police_cases").await?;
    let gangs = load_records::<Gang>(pool, "SELECT record FROM gangs").await?;
    let projects = load_records::<Project>(pool, "SELECT record FROM shared_projects").await?;
    let assets = load_records::<aicity_types::Asset>(pool, "SELECT record FROM city_assets").await?;
    let messages = load_records::<CityMessage>(pool, "SELECT record FROM messages ORDER BY day").await?;
    let bonds = load_records::<Bond>(pool, "SELECT record FROM relationships").await?;
    let stories = load_records::<Story>(pool, "SELECT record FROM stories ORDER BY day").await?;
    let lots = load_records::<HomeLot>(pool, "SELECT record FROM home_lots").await?;
    let tiles = load_records::<WorldTile>(pool, "SELECT record FROM world_tiles").await?;

    let ledger = Ledger::from_log(
        transactions,
        config.city.mint_key.clone(),
        config.economy.ledger_policy(),
        retired,
    )
    .map_err(|e| DbError::Corrupt(format!("transaction log does not reconcile: {e}")))?;

    let mut mood_register = MoodRegister::new();
    for (agent, mood) in moods {
        mood_register.set(agent, mood);
    }

    let city = City {
        day,
        agents,
        ledger,
        events: EventLog::from_events(events, config.social.knower_threshold),
        bonds: BondTable::from_bonds(&bonds),
        moods: mood_register,
        messages: MessageBus::from_messages(messages, config.social.message_ttl_days),
        projects: ProjectBoard::from_projects(projects, DEFAULT_ABANDON_DAYS),
        assets: AssetRegistry::from_assets(assets),
        map: CityMap::from_parts(lots, tiles, config.city.zone_count),
        gangs: GangRegistry::from_gangs(gangs),
        cases: CaseBoard::from_cases(cases, config.police.clone()),
        stories,
        rng: StdRng::seed_from_u64(seed ^ day),
        config,
    };

    city.ledger
        .verify_conservation()
        .map_err(|e| DbError::Corrupt(format!("conservation broken after load: {e}")))?;

    info!(day, agents = city.agents.len(), "city resumed");
    Ok(city)
}

/// Load agents plus their mood and hidden-susceptibility columns.
#[allow(clippy::type_complexity)]
async fn load_agents(
    pool: &PgPool,
) -> Result<
    (
        BTreeMap<AgentId, AgentRecord>,
        Vec<(AgentId, rust_decimal::Decimal)>,
        BTreeSet<AgentId>,
    ),
    DbError,
> {
    let rows = sqlx::query("SELECT record, mood, bribe_susceptibility FROM agents")
        .fetch_all(pool)
        .await?;

    let mut agents = BTreeMap::new();
    let mut moods = Vec::new();
    let mut retired = BTreeSet::new();

    for row in rows {
        let record: serde_json::Value = row.try_get("record")?;
        let mut agent: AgentRecord = serde_json::from_value(record)
            .map_err(|e| DbError::Corrupt(format!("bad agent record: {e}")))?;
        let mood: rust_decimal::Decimal = row.try_get("mood")?;
        let susceptibility: Option<rust_decimal::Decimal> =
            row.try_get("bribe_susceptibility")?;

        // The serialized record deliberately omits the hidden column and
        // may carry a stale mood; both are restored here.
        agent.bribe_susceptibility = susceptibility;
        agent.mood = mood;

        if agent.status == AgentStatus::Dead {
            retired.insert(agent.id);
        } else {
            moods.push((agent.id, mood));
        }
        agents.insert(agent.id, agent);
    }

    Ok((agents, moods, retired))
}

/// Load and deserialize every `record` column returned by a query.
async fn load_records<T: serde::de::DeserializeOwned>(
    pool: &PgPool,
    query: &str,
) -> Result<Vec<T>, DbError> {
    let rows = sqlx::query(query).fetch_all(pool).await?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let value: serde_json::Value = row.try_get("record")?;
        let record = serde_json::from_value(value)
            .map_err(|e| DbError::Corrupt(format!("bad record: {e}")))?;
        records.push(record);
    }
    Ok(records)
}

/// Read one integer meta value.
async fn load_meta_u64(pool: &PgPool, key: &str) -> Result<Option<u64>, DbError> {
    let row = sqlx::query("SELECT value FROM meta WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else { return Ok(None) };
    let value: serde_json::Value = row.try_get("value")?;
    value
        .as_u64()
        .map(Some)
        .ok_or_else(|| DbError::Corrupt(format!("meta {key} is not an integer")))
}
