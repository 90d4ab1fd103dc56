//! The end-of-day commit callback: checkpoint, then broadcast.
//!
//! The order is the whole contract: a day is broadcast only after the
//! checkpoint acknowledges, so observers can see a gap but never a day
//! that storage does not have.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::runtime::Handle;

use aicity_core::{City, DayCallback, DaySummary};
use aicity_observer::AppState;

/// Commits each day to `PostgreSQL` and fans it out to observers.
pub struct CommitPipeline {
    pool: PgPool,
    observers: Arc<AppState>,
    handle: Handle,
}

impl CommitPipeline {
    /// Build the pipeline on the current runtime.
    pub fn new(pool: PgPool, observers: Arc<AppState>, handle: Handle) -> Self {
        Self {
            pool,
            observers,
            handle,
        }
    }
}

impl DayCallback for CommitPipeline {
    fn on_day(&mut self, summary: &DaySummary, city: &City) -> Result<(), String> {
        tokio::task::block_in_place(|| {
            self.handle.block_on(async {
                // Durable first. persist_day already retries with backoff;
                // an error here rejects the day.
                aicity_db::persist_day(&self.pool, city, summary)
                    .await
                    .map_err(|e| e.to_string())?;

                // Then the push channel, in commit order.
                self.observers
                    .publish_day(summary.messages.clone(), city.snapshot())
                    .await;
                Ok(())
            })
        })
    }
}
