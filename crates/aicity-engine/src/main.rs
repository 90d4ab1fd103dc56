//! Simulation engine binary for AIcity.
//!
//! Wires together the day scheduler, reasoning client, persistence, and
//! observer API, then runs the simulation loop until a termination
//! condition is met.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `aicity-config.yaml`
//! 3. Connect `PostgreSQL` and ensure the schema
//! 4. Resume the city from storage, or spawn a genesis population
//! 5. Start the Observer API server
//! 6. Build the reasoning service (HTTP, or scripted offline fallback)
//! 7. Run the simulation loop with the checkpoint-then-broadcast pipeline
//! 8. Log the result

mod commit;
mod error;
mod spawner;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aicity_core::reasoner::ScriptedReasoner;
use aicity_core::scheduler::CancelFlag;
use aicity_core::{City, ReasoningService, SimulationConfig, run_simulation};
use aicity_observer::AppState;
use aicity_runner::HttpReasoner;
use aicity_social::InMemoryStore;

use crate::commit::CommitPipeline;
use crate::error::EngineError;
use crate::spawner::spawn_population;

/// Default configuration path, overridable by the first CLI argument.
const DEFAULT_CONFIG_PATH: &str = "aicity-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself
/// fails.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("aicity-engine starting");
    run().await?;
    Ok(())
}

async fn run() -> Result<(), EngineError> {
    // 2. Configuration.
    let config_path = std::env::args().nth(1).unwrap_or_else(|| String::from(DEFAULT_CONFIG_PATH));
    let config = if Path::new(&config_path).exists() {
        SimulationConfig::from_file(Path::new(&config_path))?
    } else {
        warn!(path = config_path.as_str(), "config file missing, using defaults");
        SimulationConfig::default()
    };
    info!(
        city = config.city.name.as_str(),
        seed = config.city.seed,
        max_days = config.run.max_days,
        "configuration loaded"
    );

    // 3. Storage.
    let pool = aicity_db::connect(&config.infrastructure.postgres_url, 8).await?;
    aicity_db::ensure_schema(&pool).await?;

    // 4. Resume or genesis.
    let mut city = match aicity_db::load_city(&pool, config.clone()).await {
        Ok(city) if !city.agents.is_empty() => {
            info!(day = city.day, "resumed from storage");
            city
        }
        Ok(_) | Err(_) => {
            let mut city = City::genesis(config.clone());
            let _ = spawn_population(&mut city, &config.population)?;
            info!("fresh city created");
            city
        }
    };

    // 5. Observer API.
    let observers = Arc::new(AppState::new());
    let bind = config.infrastructure.observer_bind.clone();
    let server_state = Arc::clone(&observers);
    tokio::spawn(async move {
        if let Err(error) = aicity_observer::serve(&bind, server_state).await {
            warn!(%error, "observer server stopped");
        }
    });

    // 6. Reasoning service. Without an API key the engine runs offline on
    // role-default behavior, which keeps local development usable.
    let mut http_reasoner = None;
    let mut scripted = ScriptedReasoner::new();
    if config.reasoning.api_key.is_empty() {
        warn!("no reasoning API key; running offline on role defaults");
    } else {
        http_reasoner = Some(HttpReasoner::from_config(&config.reasoning)?);
    }
    let reasoner: &mut dyn ReasoningService = match http_reasoner.as_mut() {
        Some(reasoner) => reasoner,
        None => &mut scripted,
    };

    // 7. The loop, with Ctrl-C wired to clean cancellation.
    let cancel = CancelFlag::new();
    let ctrlc_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling at the next suspension point");
            ctrlc_cancel.cancel();
        }
    });

    let mut memory = InMemoryStore::new();
    let mut pipeline = CommitPipeline::new(pool, observers, Handle::current());
    let result = run_simulation(
        &mut city,
        reasoner,
        &mut memory,
        &mut pipeline,
        &cancel,
        config.run.max_days,
        Duration::from_millis(config.run.day_interval_ms),
    )
    .await?;

    // 8. The result.
    info!(
        end_reason = ?result.end_reason,
        days = result.days_committed,
        final_day = city.day,
        alive = city.alive_agents().len(),
        "simulation ended"
    );
    Ok(())
}
