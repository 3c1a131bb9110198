//! Movement and bash cost model
//!
//! Pure functions shared by real-time movement and the pathfinder, so both
//! always agree on what a tile costs.

use crate::occupant::OccupantSample;
use crate::registry::TileRegistry;
use crate::terrain::{FurnitureDef, FurnitureId, TerrainDef, TerrainId};

/// Stateless cost calculations
pub struct CostModel;

impl CostModel {
    /// Cost of crossing an occupant walkway
    pub const AISLE_COST: i32 = 2;
    /// Cost of crossing any other non-obstacle occupant part
    pub const OCCUPANT_FLOOR_COST: i32 = 8;
    /// Bash rating reported for occupant obstacles regardless of strength
    pub const OCCUPANT_BASH_RATING: i32 = 2;
    /// Rating for guaranteed one-hit success
    pub const MAX_BASH_RATING: i32 = 10;

    /// Move cost of a tile. 0 means impassable.
    ///
    /// `furniture` is None for tiles without furniture.
    pub fn move_cost(
        terrain: &TerrainDef,
        furniture: Option<&FurnitureDef>,
        occupant: Option<&OccupantSample>,
    ) -> i32 {
        if terrain.move_cost == 0 {
            return 0;
        }
        if let Some(furn) = furniture
            && furn.move_cost < 0
        {
            return 0;
        }

        if let Some(part) = occupant {
            if part.is_obstacle() {
                return 0;
            }
            return if part.is_aisle() {
                Self::AISLE_COST
            } else {
                Self::OCCUPANT_FLOOR_COST
            };
        }

        match furniture {
            Some(furn) => (terrain.move_cost + furn.move_cost).max(0),
            None => terrain.move_cost.max(0),
        }
    }

    /// Bash rating in [-1, 10] for the given strength.
    ///
    /// -1: nothing bashable here; 0: strength below the minimum threshold;
    /// 10: guaranteed success; otherwise linear between the thresholds and
    /// never below 1 once the minimum is met.
    pub fn bash_rating(
        strength: i32,
        terrain: &TerrainDef,
        furniture: Option<&FurnitureDef>,
        occupant: Option<&OccupantSample>,
    ) -> i32 {
        if let Some(part) = occupant
            && part.is_obstacle()
        {
            return Self::OCCUPANT_BASH_RATING;
        }

        // Furniture is bashed before the terrain underneath it
        let bash = furniture
            .and_then(|f| f.bash.as_ref())
            .or(terrain.bash.as_ref());
        let Some(bash) = bash else {
            return -1;
        };

        if strength < bash.str_min {
            return 0;
        }
        if strength >= bash.str_max {
            return Self::MAX_BASH_RATING;
        }

        let rating = (Self::MAX_BASH_RATING * (strength - bash.str_min)) / (bash.str_max - bash.str_min);
        rating.max(1)
    }

    /// `move_cost` looked up by id
    pub fn move_cost_of(
        registry: &TileRegistry,
        terrain: TerrainId,
        furniture: FurnitureId,
        occupant: Option<&OccupantSample>,
    ) -> i32 {
        let furn = (!furniture.is_null()).then(|| registry.furniture(furniture));
        Self::move_cost(registry.terrain(terrain), furn, occupant)
    }

    /// `bash_rating` looked up by id
    pub fn bash_rating_of(
        registry: &TileRegistry,
        strength: i32,
        terrain: TerrainId,
        furniture: FurnitureId,
        occupant: Option<&OccupantSample>,
    ) -> i32 {
        let furn = (!furniture.is_null()).then(|| registry.furniture(furniture));
        Self::bash_rating(strength, registry.terrain(terrain), furn, occupant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupant::PartFlags;
    use crate::terrain::TileFlags;

    fn ter(cost: i32) -> TerrainDef {
        TerrainDef::new("t_test", '.', cost, TileFlags::empty())
    }

    fn furn(cost: i32) -> FurnitureDef {
        FurnitureDef::new("f_test", '#', cost, TileFlags::empty())
    }

    #[test]
    fn test_move_cost_table() {
        let obstacle = OccupantSample::new(PartFlags::OBSTACLE, 10);
        let aisle = OccupantSample::new(PartFlags::AISLE, 10);
        let seat = OccupantSample::new(PartFlags::empty(), 10);
        let open_door = OccupantSample::new(
            PartFlags::OBSTACLE | PartFlags::OPENABLE | PartFlags::OPEN,
            10,
        );

        // (terrain cost, furniture cost, occupant, expected)
        let cases: Vec<(i32, Option<i32>, Option<OccupantSample>, i32)> = vec![
            (2, None, None, 2),
            (0, None, None, 0),
            (0, Some(2), None, 0),
            (2, Some(2), None, 4),
            (2, Some(-1), None, 0),
            (2, Some(-5), None, 0),
            (3, Some(0), None, 3),
            (2, None, Some(obstacle), 0),
            (2, Some(2), Some(obstacle), 0),
            (2, None, Some(aisle), CostModel::AISLE_COST),
            (2, None, Some(seat), CostModel::OCCUPANT_FLOOR_COST),
            (2, None, Some(open_door), CostModel::OCCUPANT_FLOOR_COST),
            // Impassable terrain stays impassable even under a walkway
            (0, None, Some(aisle), 0),
            // Impassable furniture wins over an aisle
            (2, Some(-1), Some(aisle), 0),
            (-3, None, None, 0),
        ];

        for (t, f, occ, expected) in cases {
            let terrain = ter(t);
            let furniture = f.map(furn);
            let cost = CostModel::move_cost(&terrain, furniture.as_ref(), occ.as_ref());
            assert_eq!(
                cost, expected,
                "terrain={t} furniture={f:?} occupant={occ:?}"
            );
        }
    }

    #[test]
    fn test_bash_rating_not_bashable() {
        assert_eq!(CostModel::bash_rating(100, &ter(0), None, None), -1);
    }

    #[test]
    fn test_bash_rating_interpolation() {
        let wall = ter(0).with_bash(10, 30, "t_rubble");

        assert_eq!(CostModel::bash_rating(5, &wall, None, None), 0);
        assert_eq!(CostModel::bash_rating(30, &wall, None, None), 10);
        assert_eq!(CostModel::bash_rating(50, &wall, None, None), 10);
        assert_eq!(CostModel::bash_rating(20, &wall, None, None), 5);
        // Just above the minimum floors at 1 instead of rounding to 0
        assert_eq!(CostModel::bash_rating(10, &wall, None, None), 1);
        assert_eq!(CostModel::bash_rating(11, &wall, None, None), 1);
    }

    #[test]
    fn test_bash_rating_prefers_furniture() {
        let wall = ter(2).with_bash(100, 200, "t_rubble");
        let table = furn(2).with_bash(0, 10);

        assert_eq!(CostModel::bash_rating(10, &wall, Some(&table), None), 10);
        // Unbashable furniture falls back to terrain rating
        let plain = furn(2);
        assert_eq!(CostModel::bash_rating(10, &wall, Some(&plain), None), 0);
    }

    #[test]
    fn test_bash_rating_occupant_obstacle() {
        let obstacle = OccupantSample::new(PartFlags::OBSTACLE, 10);
        assert_eq!(
            CostModel::bash_rating(1, &ter(2), None, Some(&obstacle)),
            CostModel::OCCUPANT_BASH_RATING
        );
    }

    #[test]
    fn test_cost_by_id() {
        let registry = TileRegistry::builtin();
        let grass = registry.terrain_id("t_grass").unwrap();
        let table = registry.furniture_id("f_table").unwrap();
        let bookcase = registry.furniture_id("f_bookcase").unwrap();

        assert_eq!(CostModel::move_cost_of(&registry, grass, FurnitureId::NULL, None), 2);
        assert_eq!(CostModel::move_cost_of(&registry, grass, table, None), 4);
        assert_eq!(CostModel::move_cost_of(&registry, grass, bookcase, None), 0);
        assert_eq!(CostModel::bash_rating_of(&registry, 40, grass, bookcase, None), 10);
    }
}
