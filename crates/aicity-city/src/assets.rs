//! The asset registry: standing assets and their daily benefits.
//!
//! A completed project mints an asset here. Standing assets apply
//! role-scoped token benefits before per-agent turns each day; destroyed
//! assets stop applying benefits the moment they fall.

use std::collections::BTreeMap;

use tracing::info;

use aicity_types::{AgentId, Asset, AssetId, AssetStatus, AssetType, Role, TilePos};

use crate::catalog;
use crate::error::CityError;

/// One computed benefit credit, to be paid through the ledger as an earn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenefitCredit {
    /// The beneficiary.
    pub agent: AgentId,
    /// Tokens to credit.
    pub amount: i64,
    /// The asset type paying out.
    pub source: AssetType,
}

/// The registry of all city assets.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: BTreeMap<AssetId, Asset>,
}

impl AssetRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            assets: BTreeMap::new(),
        }
    }

    /// Rebuild from persisted assets (resume path).
    pub fn from_assets(assets: Vec<Asset>) -> Self {
        let mut registry = Self::new();
        for asset in assets {
            registry.assets.insert(asset.id, asset);
        }
        registry
    }

    /// Mint a standing asset from a completed project.
    pub fn register(
        &mut self,
        day: u64,
        name: impl Into<String>,
        asset_type: AssetType,
        builders: Vec<AgentId>,
        tile: Option<TilePos>,
    ) -> AssetId {
        let id = AssetId::new();
        let name = name.into();
        info!(day, %id, ?asset_type, name = name.as_str(), "asset standing");
        self.assets.insert(
            id,
            Asset {
                id,
                name,
                asset_type,
                builders,
                day_built: day,
                status: AssetStatus::Standing,
                day_destroyed: None,
                tile,
            },
        );
        id
    }

    /// Destroy a standing asset. Its benefit stops immediately.
    pub fn destroy(&mut self, day: u64, id: AssetId) -> Result<&Asset, CityError> {
        let asset = self.assets.get_mut(&id).ok_or(CityError::UnknownAsset(id))?;
        if asset.status != AssetStatus::Standing {
            return Err(CityError::AssetNotStanding(id));
        }
        asset.status = AssetStatus::Destroyed;
        asset.day_destroyed = Some(day);
        info!(day, %id, "asset destroyed");
        Ok(asset)
    }

    /// Fetch one asset.
    pub fn get(&self, id: AssetId) -> Result<&Asset, CityError> {
        self.assets.get(&id).ok_or(CityError::UnknownAsset(id))
    }

    /// Find a standing asset by display name (decision targeting).
    pub fn standing_by_name(&self, name: &str) -> Option<&Asset> {
        self.standing().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// All assets.
    pub fn all(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Standing assets only.
    pub fn standing(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values().filter(|a| a.is_standing())
    }

    /// Whether any standing asset of the type exists.
    pub fn has_standing(&self, asset_type: AssetType) -> bool {
        self.standing().any(|a| a.asset_type == asset_type)
    }

    /// Whether the narrator gets precise sourcing (standing archive).
    pub fn archive_precision(&self) -> bool {
        self.has_standing(AssetType::Archive)
    }

    /// Assets changed on the given day (checkpoint delta).
    pub fn changed_on(&self, day: u64) -> Vec<&Asset> {
        self.assets
            .values()
            .filter(|a| a.day_built == day || a.day_destroyed == Some(day))
            .collect()
    }

    /// Compute the day's benefit credits for the given population.
    ///
    /// `agents` is the alive population with roles. Per standing asset:
    /// role-scoped amounts go to every agent of the benefit role, except
    /// the market pot, which is split evenly across merchants (integer
    /// division; the remainder stays unpaid).
    pub fn daily_benefits(&self, agents: &[(AgentId, Role)]) -> Vec<BenefitCredit> {
        let mut credits = Vec::new();
        for asset in self.standing() {
            let role = catalog::benefit_role(asset.asset_type);
            let eligible: Vec<AgentId> = agents
                .iter()
                .filter(|(_, r)| *r == role)
                .map(|(id, _)| *id)
                .collect();
            if eligible.is_empty() {
                continue;
            }
            let pot = catalog::daily_benefit(asset.asset_type);
            match asset.asset_type {
                AssetType::Market => {
                    let count = i64::try_from(eligible.len()).unwrap_or(i64::MAX);
                    let share = pot.checked_div(count).unwrap_or(0);
                    if share == 0 {
                        continue;
                    }
                    for agent in eligible {
                        credits.push(BenefitCredit {
                            agent,
                            amount: share,
                            source: asset.asset_type,
                        });
                    }
                }
                _ => {
                    for agent in eligible {
                        credits.push(BenefitCredit {
                            agent,
                            amount: pot,
                            source: asset.asset_type,
                        });
                    }
                }
            }
        }
        credits
    }
}
