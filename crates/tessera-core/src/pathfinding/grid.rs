//! The read-only surface the pathfinder searches over

use glam::IVec2;
use tessera_tiles::{CostModel, FurnitureDef, OccupantSample, TerrainDef, TileFlags};

use crate::world::{OccupantRef, TilePos};

/// A grid of tiles the pathfinder can query
pub trait PathGrid {
    /// Inclusive min/max tile x/y covered by the grid
    fn bounds(&self) -> (IVec2, IVec2);

    fn contains(&self, pos: TilePos) -> bool;

    /// Cost-relevant content of a tile, None when it is not available
    fn sample(&self, pos: TilePos) -> Option<TileSample<'_>>;
}

/// Terrain, furniture and occupant covering one tile
#[derive(Clone, Copy, Debug)]
pub struct TileSample<'a> {
    pub terrain: &'a TerrainDef,
    /// None when the tile has no furniture
    pub furniture: Option<&'a FurnitureDef>,
    pub occupant: Option<(OccupantRef, OccupantSample)>,
}

impl TileSample<'_> {
    fn occupant_sample(&self) -> Option<&OccupantSample> {
        self.occupant.as_ref().map(|(_, sample)| sample)
    }

    pub fn move_cost(&self) -> i32 {
        CostModel::move_cost(self.terrain, self.furniture, self.occupant_sample())
    }

    pub fn bash_rating(&self, strength: i32) -> i32 {
        CostModel::bash_rating(strength, self.terrain, self.furniture, self.occupant_sample())
    }

    /// Roofed by terrain or furniture
    pub fn is_indoors(&self) -> bool {
        self.terrain.has_flag(TileFlags::INDOORS)
            || self.furniture.is_some_and(|f| f.has_flag(TileFlags::INDOORS))
    }

    /// Closed occupant door covering the tile
    pub fn occupant_door(&self) -> Option<(OccupantRef, OccupantSample)> {
        self.occupant.filter(|(_, sample)| sample.is_closed_door())
    }

    /// Occupant part that blocks movement here
    pub fn occupant_obstacle(&self) -> Option<(OccupantRef, OccupantSample)> {
        self.occupant.filter(|(_, sample)| sample.is_obstacle())
    }
}
