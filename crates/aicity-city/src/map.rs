//! The city map: home lots, world tiles, and location zones.
//!
//! Zones are the co-location granularity: two agents in the same zone on
//! the same day can witness each other's acts and hold arranged meetings.
//! Tiles exist for the external visual client; the simulation itself only
//! cares about occupancy.

use std::collections::BTreeMap;

use tracing::debug;

use aicity_types::{AgentId, AssetId, AssetType, HomeLot, LotId, TilePos, WorldTile};

use crate::error::CityError;

/// Default number of location zones.
pub const DEFAULT_ZONE_COUNT: u32 = 6;

/// Width of the residential grid used for lot allocation.
const LOT_GRID_WIDTH: i32 = 8;

/// The city map.
#[derive(Debug, Clone)]
pub struct CityMap {
    lots: BTreeMap<LotId, HomeLot>,
    owners: BTreeMap<AgentId, LotId>,
    tiles: BTreeMap<TilePos, WorldTile>,
    zone_count: u32,
    next_lot_index: i32,
}

impl CityMap {
    /// Create an empty map with the default zone count.
    pub const fn new() -> Self {
        Self::with_zones(DEFAULT_ZONE_COUNT)
    }

    /// Create an empty map with an explicit zone count.
    pub const fn with_zones(zone_count: u32) -> Self {
        Self {
            lots: BTreeMap::new(),
            owners: BTreeMap::new(),
            tiles: BTreeMap::new(),
            zone_count: if zone_count == 0 { 1 } else { zone_count },
            next_lot_index: 0,
        }
    }

    /// Rebuild from persisted lots and tiles (resume path).
    pub fn from_parts(lots: Vec<HomeLot>, tiles: Vec<WorldTile>, zone_count: u32) -> Self {
        let mut map = Self::with_zones(zone_count);
        for lot in lots {
            map.next_lot_index = map
                .next_lot_index
                .max(lot.tile.y.saturating_mul(LOT_GRID_WIDTH).saturating_add(lot.tile.x).saturating_add(1));
            map.owners.insert(lot.owner, lot.id);
            map.lots.insert(lot.id, lot);
        }
        for tile in tiles {
            map.tiles.insert(tile.pos, tile);
        }
        map
    }

    /// The configured zone count.
    pub const fn zone_count(&self) -> u32 {
        self.zone_count
    }

    // -- lots -------------------------------------------------------------

    /// Claim the next free lot for an agent.
    ///
    /// Lots fill a fixed residential grid row by row; an agent may hold at
    /// most one.
    pub fn claim_lot(&mut self, day: u64, agent: AgentId) -> Result<HomeLot, CityError> {
        if self.owners.contains_key(&agent) {
            return Err(CityError::LotAlreadyClaimed(agent));
        }
        let index = self.next_lot_index;
        self.next_lot_index = self.next_lot_index.saturating_add(1);
        let tile = TilePos {
            x: index.rem_euclid(LOT_GRID_WIDTH),
            y: index.div_euclid(LOT_GRID_WIDTH),
        };
        let lot = HomeLot {
            id: LotId::new(),
            owner: agent,
            tile,
            day_claimed: day,
        };
        debug!(day, %agent, ?tile, "home lot claimed");
        self.owners.insert(agent, lot.id);
        self.lots.insert(lot.id, lot.clone());
        Ok(lot)
    }

    /// The lot an agent holds, if any.
    pub fn lot_of(&self, agent: AgentId) -> Option<&HomeLot> {
        self.owners.get(&agent).and_then(|id| self.lots.get(id))
    }

    /// All claimed lots.
    pub fn lots(&self) -> impl Iterator<Item = &HomeLot> {
        self.lots.values()
    }

    // -- tiles ------------------------------------------------------------

    /// Place an asset tile.
    ///
    /// Asset tiles live on a separate band of the map from residential
    /// lots, so only asset-vs-asset collisions are possible.
    pub fn place_tile(
        &mut self,
        pos: TilePos,
        kind: AssetType,
        asset: AssetId,
    ) -> Result<WorldTile, CityError> {
        if self.tiles.contains_key(&pos) {
            return Err(CityError::TileOccupied(pos));
        }
        let tile = WorldTile { pos, kind, asset };
        self.tiles.insert(pos, tile.clone());
        Ok(tile)
    }

    /// Remove the tile an asset occupies, if any. Returns the vacated
    /// position.
    pub fn remove_tile_of(&mut self, asset: AssetId) -> Option<TilePos> {
        let pos = self
            .tiles
            .values()
            .find(|t| t.asset == asset)
            .map(|t| t.pos)?;
        self.tiles.remove(&pos);
        Some(pos)
    }

    /// A free position for a new asset tile, on the asset band.
    pub fn free_asset_position(&self) -> TilePos {
        let mut index: i32 = 0;
        loop {
            let pos = TilePos {
                x: index.rem_euclid(LOT_GRID_WIDTH),
                y: index.div_euclid(LOT_GRID_WIDTH).saturating_add(100),
            };
            if !self.tiles.contains_key(&pos) {
                return pos;
            }
            index = index.saturating_add(1);
        }
    }

    /// All placed tiles.
    pub fn tiles(&self) -> impl Iterator<Item = &WorldTile> {
        self.tiles.values()
    }
}

impl Default for CityMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lots_fill_the_grid_in_order() {
        let mut map = CityMap::new();
        let first = map.claim_lot(1, AgentId::new()).unwrap();
        let second = map.claim_lot(1, AgentId::new()).unwrap();
        assert_eq!(first.tile, TilePos { x: 0, y: 0 });
        assert_eq!(second.tile, TilePos { x: 1, y: 0 });
    }

    #[test]
    fn one_lot_per_agent() {
        let mut map = CityMap::new();
        let agent = AgentId::new();
        let _ = map.claim_lot(1, agent).unwrap();
        assert!(matches!(
            map.claim_lot(2, agent),
            Err(CityError::LotAlreadyClaimed(_))
        ));
    }

    #[test]
    fn tile_collisions_rejected() {
        let mut map = CityMap::new();
        let pos = TilePos { x: 0, y: 100 };
        let _ = map
            .place_tile(pos, AssetType::Market, AssetId::new())
            .unwrap();
        assert!(matches!(
            map.place_tile(pos, AssetType::Road, AssetId::new()),
            Err(CityError::TileOccupied(_))
        ));
    }

    #[test]
    fn removing_a_tile_frees_the_position() {
        let mut map = CityMap::new();
        let asset = AssetId::new();
        let pos = map.free_asset_position();
        let _ = map.place_tile(pos, AssetType::Market, asset).unwrap();
        assert_eq!(map.remove_tile_of(asset), Some(pos));
        assert!(map.place_tile(pos, AssetType::Road, AssetId::new()).is_ok());
    }

    #[test]
    fn round_trip_preserves_lots_and_tiles() {
        let mut map = CityMap::new();
        let agent = AgentId::new();
        let lot = map.claim_lot(1, agent).unwrap();
        let asset = AssetId::new();
        let pos = map.free_asset_position();
        let _ = map.place_tile(pos, AssetType::School, asset).unwrap();

        let rebuilt = CityMap::from_parts(
            map.lots().cloned().collect(),
            map.tiles().cloned().collect(),
            map.zone_count(),
        );
        assert_eq!(rebuilt.lot_of(agent).map(|l| l.id), Some(lot.id));
        assert_eq!(rebuilt.tiles().count(), 1);
        // The next claim does not collide with the restored lot.
        let next = rebuilt.clone().claim_lot(2, AgentId::new()).unwrap();
        assert_ne!(next.tile, lot.tile);
    }
}
