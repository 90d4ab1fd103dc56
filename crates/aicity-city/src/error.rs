//! Error types for projects, assets, and the city map.

use aicity_types::{AgentId, AssetId, ProjectId, TilePos};

/// Errors that can occur in the project and asset layer.
#[derive(Debug, thiserror::Error)]
pub enum CityError {
    /// The project does not exist.
    #[error("unknown project {0}")]
    UnknownProject(ProjectId),

    /// The project is not accepting contributions.
    #[error("project {0} is not active")]
    ProjectNotActive(ProjectId),

    /// The asset does not exist.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// The asset is not standing.
    #[error("asset {0} is not standing")]
    AssetNotStanding(AssetId),

    /// The map position is already occupied.
    #[error("tile {0:?} is already occupied")]
    TileOccupied(TilePos),

    /// The agent already holds a home lot.
    #[error("agent {0} already claimed a lot")]
    LotAlreadyClaimed(AgentId),
}
