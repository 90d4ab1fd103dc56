//! Simulation loop runner with atomic-day semantics.
//!
//! The runner wraps the single-day [`run_day`] and adds the control plane:
//! bounded runs, pacing, cancellation, and the rollback contract. Before
//! each tick the city is cloned; if the tick fails, is cancelled, or the
//! caller's checkpoint rejects the day, the clone is restored -- from the
//! outside, either a day fully committed or it never happened.
//!
//! [`run_day`]: crate::scheduler::run_day

use std::time::Duration;

use tracing::{info, warn};

use aicity_social::MemoryStore;

use crate::city::City;
use crate::reasoner::ReasoningService;
use crate::scheduler::{CancelFlag, DaySummary, TickError, run_day};

/// Errors that end a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A day tick failed irrecoverably.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// The caller's end-of-day callback (checkpoint, broadcast) failed
    /// after exhausting its own retries.
    #[error("day callback failed: {0}")]
    Callback(String),
}

/// Why the simulation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The configured day limit was reached.
    MaxDaysReached,
    /// The city has no living agents left.
    Extinction,
    /// Cancellation was requested.
    Cancelled,
}

/// Result of a simulation run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: EndReason,
    /// Days successfully committed.
    pub days_committed: u64,
}

/// Called after each day's in-memory commit, before the next day begins.
///
/// Implementations persist the checkpoint and fan out the broadcast -- in
/// that order. Returning an error rejects the day: the runner restores
/// the pre-tick city and stops, leaving storage at the last good day.
pub trait DayCallback {
    /// Commit one day to the outside world.
    ///
    /// # Errors
    ///
    /// Return `Err` only after exhausting internal retries; the day is
    /// then rolled back and the run stops.
    fn on_day(&mut self, summary: &DaySummary, city: &City) -> Result<(), String>;
}

/// A no-op callback for tests and dry runs.
pub struct NoOpCallback;

impl DayCallback for NoOpCallback {
    fn on_day(&mut self, _summary: &DaySummary, _city: &City) -> Result<(), String> {
        Ok(())
    }
}

/// Run the simulation for up to `max_days`, pacing by `day_interval`.
///
/// # Errors
///
/// Returns [`RunError`] if a tick or the commit callback fails; the city
/// is left at the last committed day in either case.
pub async fn run_simulation(
    city: &mut City,
    reasoner: &mut dyn ReasoningService,
    memory: &mut dyn MemoryStore,
    callback: &mut dyn DayCallback,
    cancel: &CancelFlag,
    max_days: u64,
    day_interval: Duration,
) -> Result<RunResult, RunError> {
    let mut days_committed = 0;
    info!(max_days, "simulation starting");

    loop {
        if cancel.is_cancelled() {
            return Ok(RunResult {
                end_reason: EndReason::Cancelled,
                days_committed,
            });
        }
        if days_committed >= max_days {
            return Ok(RunResult {
                end_reason: EndReason::MaxDaysReached,
                days_committed,
            });
        }
        if city.alive_agents().is_empty() && days_committed > 0 {
            return Ok(RunResult {
                end_reason: EndReason::Extinction,
                days_committed,
            });
        }

        // Atomic-day contract: clone before, restore on any failure.
        let checkpoint = city.clone();
        let summary = match run_day(city, reasoner, memory, cancel) {
            Ok(summary) => summary,
            Err(TickError::Cancelled) => {
                *city = checkpoint;
                info!(day = city.day, "day cancelled, state restored");
                return Ok(RunResult {
                    end_reason: EndReason::Cancelled,
                    days_committed,
                });
            }
            Err(error) => {
                *city = checkpoint;
                warn!(day = city.day, %error, "day failed, state restored");
                return Err(error.into());
            }
        };

        if let Err(reason) = callback.on_day(&summary, city) {
            *city = checkpoint;
            warn!(day = city.day, reason = reason.as_str(), "day rejected by callback, state restored");
            return Err(RunError::Callback(reason));
        }
        days_committed = days_committed.saturating_add(1);

        if !day_interval.is_zero() {
            tokio::time::sleep(day_interval).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aicity_social::InMemoryStore;
    use aicity_types::Role;

    use crate::config::SimulationConfig;
    use crate::reasoner::ScriptedReasoner;

    use super::*;

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.stochastic.heart_attack_probability = 0.0;
        config.stochastic.windfall_probability = 0.0;
        config.stochastic.birth_probability = 0.0;
        config
    }

    struct RejectingCallback;

    impl DayCallback for RejectingCallback {
        fn on_day(&mut self, _summary: &DaySummary, _city: &City) -> Result<(), String> {
            Err(String::from("storage unavailable"))
        }
    }

    #[tokio::test]
    async fn bounded_run_commits_the_requested_days() {
        let mut city = City::genesis(quiet_config());
        let _ = city.spawn_agent("Ona", Role::Builder).unwrap();
        let mut reasoner = ScriptedReasoner::new();
        let mut memory = InMemoryStore::new();
        let result = run_simulation(
            &mut city,
            &mut reasoner,
            &mut memory,
            &mut NoOpCallback,
            &CancelFlag::new(),
            3,
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(result.end_reason, EndReason::MaxDaysReached);
        assert_eq!(result.days_committed, 3);
        assert_eq!(city.day, 3);
    }

    #[tokio::test]
    async fn rejected_checkpoint_rolls_the_day_back() {
        let mut city = City::genesis(quiet_config());
        let _ = city.spawn_agent("Ona", Role::Builder).unwrap();
        let mut reasoner = ScriptedReasoner::new();
        let mut memory = InMemoryStore::new();
        let result = run_simulation(
            &mut city,
            &mut reasoner,
            &mut memory,
            &mut RejectingCallback,
            &CancelFlag::new(),
            3,
            Duration::ZERO,
        )
        .await;
        assert!(matches!(result, Err(RunError::Callback(_))));
        // Nothing committed: the city still sits at day 0.
        assert_eq!(city.day, 0);
        assert!(city.events.events_for_day(1).is_empty());
    }

    #[tokio::test]
    async fn cancellation_before_start_commits_nothing() {
        let mut city = City::genesis(quiet_config());
        let _ = city.spawn_agent("Ona", Role::Builder).unwrap();
        let mut reasoner = ScriptedReasoner::new();
        let mut memory = InMemoryStore::new();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = run_simulation(
            &mut city,
            &mut reasoner,
            &mut memory,
            &mut NoOpCallback,
            &cancel,
            3,
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(result.end_reason, EndReason::Cancelled);
        assert_eq!(result.days_committed, 0);
        assert_eq!(city.day, 0);
    }
}
