//! Observer API server for the AIcity simulation.
//!
//! Observers watch the city over a push channel: connect to `/ws/days`,
//! receive a `state` snapshot, then every committed day's messages in
//! commit order. The feed never blocks the tick -- a slow observer is
//! dropped from the live stream and re-syncs from `/snapshot`.
//!
//! # Modules
//!
//! - [`state`] -- [`AppState`]: broadcast channel plus latest snapshot.
//! - [`ws`] -- The `WebSocket` feed handler.
//! - [`router`] -- Route table (`/healthz`, `/snapshot`, `/ws/days`).
//! - [`server`] -- Bind-and-serve entry point.

pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerError, serve};
pub use state::{AppState, BROADCAST_CAPACITY};
