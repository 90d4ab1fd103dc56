//! The project catalog: static build requirements per asset type.
//!
//! Each [`AssetType`] fixes a goal in builder-days, the roles that must
//! participate for a full-progress day, and the benefit the finished asset
//! applies. The catalog is the single place these numbers live.

use rust_decimal::Decimal;

use aicity_types::{AssetType, Role};

/// Static build requirements and benefit profile for one asset type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBlueprint {
    /// The asset type this blueprint describes.
    pub asset_type: AssetType,
    /// Builder-days required for completion.
    pub goal_builder_days: Decimal,
    /// Minimum builders per day for full progress.
    pub builders_required: u32,
    /// A role that must participate for full progress, if any.
    pub required_role: Option<Role>,
    /// Whether the finished asset occupies a map tile.
    pub has_tile_footprint: bool,
}

/// Return the canonical blueprint for a given [`AssetType`].
pub fn blueprint(asset_type: AssetType) -> ProjectBlueprint {
    match asset_type {
        AssetType::Market => ProjectBlueprint {
            asset_type,
            goal_builder_days: Decimal::from(3),
            builders_required: 1,
            required_role: None,
            has_tile_footprint: true,
        },
        AssetType::Watchtower => ProjectBlueprint {
            asset_type,
            goal_builder_days: Decimal::from(4),
            builders_required: 2,
            required_role: None,
            has_tile_footprint: true,
        },
        AssetType::Hospital => ProjectBlueprint {
            asset_type,
            goal_builder_days: Decimal::from(5),
            builders_required: 1,
            required_role: Some(Role::Healer),
            has_tile_footprint: true,
        },
        AssetType::School => ProjectBlueprint {
            asset_type,
            goal_builder_days: Decimal::from(4),
            builders_required: 2,
            required_role: None,
            has_tile_footprint: true,
        },
        AssetType::Road => ProjectBlueprint {
            asset_type,
            goal_builder_days: Decimal::from(2),
            builders_required: 1,
            required_role: None,
            has_tile_footprint: true,
        },
        AssetType::Archive => ProjectBlueprint {
            asset_type,
            goal_builder_days: Decimal::from(3),
            builders_required: 1,
            required_role: Some(Role::Messenger),
            has_tile_footprint: true,
        },
    }
}

/// Daily benefit in tokens for one beneficiary role, per standing asset.
///
/// The merchant figure is the whole pot split across merchants; everything
/// else is per eligible agent.
pub const fn daily_benefit(asset_type: AssetType) -> i64 {
    match asset_type {
        AssetType::Market => 50,
        AssetType::Watchtower => 30,
        AssetType::Hospital => 40,
        AssetType::School => 30,
        AssetType::Road => 25,
        AssetType::Archive => 20,
    }
}

/// The role each asset's daily benefit is scoped to.
pub const fn benefit_role(asset_type: AssetType) -> Role {
    match asset_type {
        AssetType::Market => Role::Merchant,
        AssetType::Watchtower => Role::Police,
        AssetType::Hospital => Role::Healer,
        AssetType::School => Role::Teacher,
        AssetType::Road => Role::Explorer,
        AssetType::Archive => Role::Messenger,
    }
}
