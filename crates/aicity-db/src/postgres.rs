//! Connection pool creation and schema bootstrap.
//!
//! The schema favors a few indexed key columns plus a `record` JSONB
//! holding the full serialized entity: checkpoint and resume move whole
//! records, and only the columns the dashboard or the doctor queries
//! filter on are broken out. The event log's `visibility` column carries
//! a CHECK constraint mirroring the in-memory ladder.
//!
//! Bribe susceptibility is stored in its own column on `agents` because
//! the serialized record deliberately omits it; nothing that exports
//! `record` can leak it.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::DbError;

/// Statements that bring an empty database up to the current schema.
const SCHEMA: [&str; 15] = [
    r"CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS agents (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        status TEXT NOT NULL,
        balance BIGINT NOT NULL,
        mood NUMERIC NOT NULL,
        bribe_susceptibility NUMERIC,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS transactions (
        id UUID PRIMARY KEY,
        day BIGINT NOT NULL,
        kind TEXT NOT NULL,
        amount BIGINT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS transactions_day_idx ON transactions (day)",
    r"CREATE TABLE IF NOT EXISTS event_log (
        id UUID PRIMARY KEY,
        day BIGINT NOT NULL,
        seq INT NOT NULL,
        kind TEXT NOT NULL,
        visibility TEXT NOT NULL CHECK (
            visibility IN ('Private', 'Witnessed', 'Rumor', 'Reported', 'Public')
        ),
        record JSONB NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS event_log_day_idx ON event_log (day, seq)",
    r"CREATE TABLE IF NOT EXISTS police_cases (
        id UUID PRIMARY KEY,
        status TEXT NOT NULL,
        day_opened BIGINT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS gangs (
        id UUID PRIMARY KEY,
        status TEXT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS shared_projects (
        id UUID PRIMARY KEY,
        status TEXT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS city_assets (
        id UUID PRIMARY KEY,
        status TEXT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        day BIGINT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS relationships (
        a UUID NOT NULL,
        b UUID NOT NULL,
        record JSONB NOT NULL,
        PRIMARY KEY (a, b)
    )",
    r"CREATE TABLE IF NOT EXISTS stories (
        id UUID PRIMARY KEY,
        day BIGINT NOT NULL,
        kind TEXT NOT NULL,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS home_lots (
        id UUID PRIMARY KEY,
        record JSONB NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS world_tiles (
        x INT NOT NULL,
        y INT NOT NULL,
        record JSONB NOT NULL,
        PRIMARY KEY (x, y)
    )",
];

/// Connect a pool to the given `PostgreSQL` URL.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the connection fails.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

/// Create all tables and indexes if they do not exist.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if any DDL statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DbError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("database schema ensured");
    Ok(())
}
