//! End-of-day persistence checkpoint.
//!
//! [`persist_day`] flushes one day's delta -- agents, new transactions,
//! touched events, touched cases, gangs, projects, assets, new messages,
//! touched bonds, stories, lots, tiles, and the day counter -- inside a
//! single database transaction. Either the whole day lands or none of it
//! does.
//!
//! Transient failures retry with bounded backoff; when retries are
//! exhausted the error propagates, the runner restores the pre-tick city,
//! and nothing is broadcast.

use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use aicity_core::{City, DaySummary};

use crate::error::DbError;

/// Checkpoint retry attempts before the day is abandoned.
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; doubles each retry.
const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Persist one committed day. Retries transient failures with bounded
/// backoff.
///
/// # Errors
///
/// Returns [`DbError::RetriesExhausted`] once every attempt has failed;
/// the caller must treat the day as uncommitted.
pub async fn persist_day(
    pool: &PgPool,
    city: &City,
    summary: &DaySummary,
) -> Result<(), DbError> {
    let mut last_error = String::new();
    for attempt in 0..MAX_ATTEMPTS {
        match try_persist(pool, city, summary).await {
            Ok(()) => {
                debug!(day = summary.day, attempt, "day checkpoint committed");
                return Ok(());
            }
            Err(DbError::Serialization(error)) => {
                // Not transient; retrying cannot help.
                return Err(DbError::Serialization(error));
            }
            Err(error) => {
                warn!(day = summary.day, attempt, %error, "checkpoint attempt failed");
                last_error = error.to_string();
                let backoff = BASE_BACKOFF.saturating_mul(2_u32.saturating_pow(attempt));
                tokio::time::sleep(backoff).await;
            }
        }
    }
    Err(DbError::RetriesExhausted(last_error))
}

/// One checkpoint attempt: everything in a single transaction.
async fn try_persist(
    pool: &PgPool,
    city: &City,
    summary: &DaySummary,
) -> Result<(), DbError> {
    let day = summary.day;
    let mut tx = pool.begin().await?;

    persist_agents(&mut tx, city).await?;
    persist_transactions(&mut tx, city, day).await?;
    persist_events(&mut tx, city).await?;
    persist_cases(&mut tx, city, day).await?;
    persist_gangs(&mut tx, city).await?;
    persist_projects(&mut tx, city, day).await?;
    persist_assets(&mut tx, city, day).await?;
    persist_messages(&mut tx, city, day).await?;
    persist_bonds(&mut tx, city, day).await?;
    persist_stories(&mut tx, summary).await?;
    persist_map(&mut tx, city).await?;
    persist_meta(&mut tx, city).await?;

    tx.commit().await?;
    Ok(())
}

async fn persist_agents(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
) -> Result<(), DbError> {
    for agent in city.agents.values() {
        let record = serde_json::to_value(agent)?;
        sqlx::query(
            r"INSERT INTO agents (id, name, role, status, balance, mood, bribe_susceptibility, record)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                status = EXCLUDED.status,
                balance = EXCLUDED.balance,
                mood = EXCLUDED.mood,
                bribe_susceptibility = EXCLUDED.bribe_susceptibility,
                record = EXCLUDED.record",
        )
        .bind(agent.id.into_inner())
        .bind(&agent.name)
        .bind(format!("{:?}", agent.role))
        .bind(format!("{:?}", agent.status))
        .bind(city.ledger.balance(agent.id))
        .bind(city.moods.get(agent.id))
        .bind(agent.bribe_susceptibility)
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_transactions(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
    day: u64,
) -> Result<(), DbError> {
    for transaction in city.ledger.transactions_for_day(day) {
        let record = serde_json::to_value(transaction)?;
        sqlx::query(
            r"INSERT INTO transactions (id, day, kind, amount, record)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(transaction.id.into_inner())
        .bind(to_db_day(transaction.day))
        .bind(format!("{:?}", transaction.kind))
        .bind(transaction.amount)
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_events(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
) -> Result<(), DbError> {
    for event in city.events.dirty_events() {
        let record = serde_json::to_value(&event)?;
        sqlx::query(
            r"INSERT INTO event_log (id, day, seq, kind, visibility, record)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (id) DO UPDATE SET
                visibility = EXCLUDED.visibility,
                record = EXCLUDED.record",
        )
        .bind(event.id.into_inner())
        .bind(to_db_day(event.day))
        .bind(i32::try_from(event.seq).unwrap_or(i32::MAX))
        .bind(format!("{:?}", event.kind))
        .bind(format!("{:?}", event.visibility))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_cases(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
    day: u64,
) -> Result<(), DbError> {
    for case in city.cases.touched_on(day) {
        let record = serde_json::to_value(case)?;
        sqlx::query(
            r"INSERT INTO police_cases (id, status, day_opened, record)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                record = EXCLUDED.record",
        )
        .bind(case.id.into_inner())
        .bind(format!("{:?}", case.status))
        .bind(to_db_day(case.day_opened))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_gangs(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
) -> Result<(), DbError> {
    for gang in city.gangs.all() {
        let record = serde_json::to_value(gang)?;
        sqlx::query(
            r"INSERT INTO gangs (id, status, record)
              VALUES ($1, $2, $3)
              ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                record = EXCLUDED.record",
        )
        .bind(gang.id.into_inner())
        .bind(format!("{:?}", gang.status))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_projects(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
    day: u64,
) -> Result<(), DbError> {
    for project in city.projects.updated_on(day) {
        let record = serde_json::to_value(project)?;
        sqlx::query(
            r"INSERT INTO shared_projects (id, status, record)
              VALUES ($1, $2, $3)
              ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                record = EXCLUDED.record",
        )
        .bind(project.id.into_inner())
        .bind(format!("{:?}", project.status))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_assets(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
    day: u64,
) -> Result<(), DbError> {
    for asset in city.assets.changed_on(day) {
        let record = serde_json::to_value(asset)?;
        sqlx::query(
            r"INSERT INTO city_assets (id, status, record)
              VALUES ($1, $2, $3)
              ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                record = EXCLUDED.record",
        )
        .bind(asset.id.into_inner())
        .bind(format!("{:?}", asset.status))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_messages(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
    day: u64,
) -> Result<(), DbError> {
    for message in city.messages.sent_on(day) {
        let record = serde_json::to_value(message)?;
        sqlx::query(
            r"INSERT INTO messages (id, day, record)
              VALUES ($1, $2, $3)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(message.id.into_inner())
        .bind(to_db_day(message.day))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_bonds(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
    day: u64,
) -> Result<(), DbError> {
    for bond in city.bonds.updated_on(day) {
        let record = serde_json::to_value(&bond)?;
        sqlx::query(
            r"INSERT INTO relationships (a, b, record)
              VALUES ($1, $2, $3)
              ON CONFLICT (a, b) DO UPDATE SET record = EXCLUDED.record",
        )
        .bind(bond.a.into_inner())
        .bind(bond.b.into_inner())
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_stories(
    tx: &mut Transaction<'_, Postgres>,
    summary: &DaySummary,
) -> Result<(), DbError> {
    for story in &summary.stories {
        let record = serde_json::to_value(story)?;
        sqlx::query(
            r"INSERT INTO stories (id, day, kind, record)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(story.id.into_inner())
        .bind(to_db_day(story.day))
        .bind(format!("{:?}", story.kind))
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_map(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
) -> Result<(), DbError> {
    for lot in city.map.lots() {
        let record = serde_json::to_value(lot)?;
        sqlx::query(
            r"INSERT INTO home_lots (id, record)
              VALUES ($1, $2)
              ON CONFLICT (id) DO UPDATE SET record = EXCLUDED.record",
        )
        .bind(lot.id.into_inner())
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    // Tiles can disappear (sabotage); the table mirrors the live map.
    sqlx::query("DELETE FROM world_tiles").execute(&mut **tx).await?;
    for tile in city.map.tiles() {
        let record = serde_json::to_value(tile)?;
        sqlx::query(
            r"INSERT INTO world_tiles (x, y, record) VALUES ($1, $2, $3)",
        )
        .bind(tile.pos.x)
        .bind(tile.pos.y)
        .bind(&record)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn persist_meta(
    tx: &mut Transaction<'_, Postgres>,
    city: &City,
) -> Result<(), DbError> {
    let entries = [
        ("day", serde_json::to_value(city.day)?),
        ("seed", serde_json::to_value(city.config.city.seed)?),
        (
            "total_supply",
            serde_json::to_value(city.ledger.vault().total_supply)?,
        ),
        (
            "vault_balance",
            serde_json::to_value(city.ledger.vault().vault_balance)?,
        ),
    ];
    for (key, value) in entries {
        sqlx::query(
            r"INSERT INTO meta (key, value)
              VALUES ($1, $2)
              ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(&value)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Day counters are `u64` in memory and `BIGINT` in the store.
fn to_db_day(day: u64) -> i64 {
    i64::try_from(day).unwrap_or(i64::MAX)
}
