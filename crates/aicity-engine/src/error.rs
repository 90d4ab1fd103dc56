//! Error types for the engine binary.

/// Errors that can occur wiring up and running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration failed to load.
    #[error("config error: {0}")]
    Config(#[from] aicity_core::ConfigError),

    /// The database layer failed during startup.
    #[error("database error: {0}")]
    Db(#[from] aicity_db::DbError),

    /// The reasoning client failed to initialize.
    #[error("reasoner error: {0}")]
    Reasoner(#[from] aicity_runner::RunnerError),

    /// Spawning the genesis population failed.
    #[error("spawn error: {0}")]
    Spawn(String),

    /// The simulation loop failed.
    #[error("run error: {0}")]
    Run(#[from] aicity_core::RunError),
}
