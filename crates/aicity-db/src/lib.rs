//! `PostgreSQL` persistence for the AIcity simulation.
//!
//! The store is durable-first: the scheduler commits a day in memory,
//! [`persist_day`] flushes the day's delta inside a single database
//! transaction, and only then does the observer broadcast go out. Reads
//! during a run come from the in-memory hot copy; the database exists for
//! durability and resume.
//!
//! # Modules
//!
//! - [`postgres`] -- Pool creation and schema bootstrap.
//! - [`checkpoint`] -- [`persist_day`] with bounded-backoff retry.
//! - [`resume`] -- [`load_city`], the full-state loader.

pub mod checkpoint;
pub mod error;
pub mod postgres;
pub mod resume;

pub use checkpoint::persist_day;
pub use error::DbError;
pub use postgres::{connect, ensure_schema};
pub use resume::load_city;
