//! Map - the chunk window, its derived caches and the pathfinder behind one API
//!
//! Every query takes `&mut self` so a stale cache can be rebuilt on the spot.
//! For many reads in a row, take a [`CachedView`] with [`Map::snapshot`].

use std::sync::Arc;

use glam::IVec3;
use rand::Rng;
use tessera_tiles::{CostModel, FieldKind, FurnitureId, OccupantSample, TerrainId, TileFlags, TileRegistry};

use super::buffer::{ChunkBuffer, MemoryBuffer};
use super::caches::{CacheStats, CachedView, DerivedCaches, SOLID};
use super::chunk::{TileMut, TileRef};
use super::chunk_store::ChunkStore;
use super::coords::{ChunkPos, TilePos};
use super::generation::{ChunkGenerator, NoiseGenerator};
use super::line::line_to;
use super::occupants::{Occupant, OccupantId, OccupantPart, OccupantRef, OccupantRegistry};
use super::region::{RegionIndex, RegionMap};
use crate::config::MapConfig;
use crate::error::MapError;
use crate::pathfinding::{Path, Pathfinder};

/// Result of one bash attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BashOutcome {
    /// Nothing on the tile can be bashed
    NotBashable,
    /// The obstacle held
    Held,
    /// Furniture was smashed and removed
    FurnitureDestroyed,
    /// Terrain was smashed into its bash result
    TerrainDestroyed,
    /// An occupant part is in the way; damaging it is up to the caller
    Occupant(OccupantRef),
}

/// Paged map with cached per-tile queries and pathfinding
pub struct Map {
    config: MapConfig,
    store: ChunkStore,
    caches: DerivedCaches,
    pathfinder: Pathfinder,
}

impl Map {
    pub fn new(
        config: MapConfig,
        tiles: Arc<TileRegistry>,
        buffer: Box<dyn ChunkBuffer>,
        regions: Box<dyn RegionIndex>,
        generator: Box<dyn ChunkGenerator>,
    ) -> Result<Self, MapError> {
        config.validate()?;
        let store = ChunkStore::new(config.window.clone(), tiles, buffer, regions, generator)?;
        let pathfinder = Pathfinder::new(config.pathfinding.clone());
        Ok(Self {
            config,
            store,
            caches: DerivedCaches::new(),
            pathfinder,
        })
    }

    /// Builtin tiles, an in-memory buffer and noise-driven regions
    pub fn with_defaults(config: MapConfig) -> Result<Self, MapError> {
        let generation = config.generation.clone();
        log::info!(
            "Creating map: {}x{} chunks, z {}..={}, seed {}",
            config.window.width,
            config.window.height,
            config.window.z_min,
            config.window.z_max,
            generation.seed
        );
        Self::new(
            config,
            Arc::new(TileRegistry::builtin()),
            Box::new(MemoryBuffer::new()),
            Box::new(RegionMap::new(generation.seed, generation.region_frequency)),
            Box::new(NoiseGenerator::new(generation.seed, generation.detail_frequency)),
        )
    }

    /// Page in the window with `origin` as its top-left chunk
    pub fn load(&mut self, origin: ChunkPos) -> Result<(), MapError> {
        self.store.load_window(origin)
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileRegistry {
        self.store.tiles()
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn occupants(&self) -> &OccupantRegistry {
        self.store.occupants()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }

    // --- Tile queries ---

    pub fn tile_at(&self, pos: TilePos) -> Result<TileRef<'_>, MapError> {
        self.store.tile_at(pos)
    }

    /// Move cost of a tile, 0 when impassable
    pub fn move_cost(&mut self, pos: TilePos) -> Result<i32, MapError> {
        let occupant = self.occupant_sample(pos)?;
        let tile = self.store.tile_at(pos)?;
        Ok(CostModel::move_cost_of(
            self.store.tiles(),
            tile.terrain,
            tile.furniture,
            occupant.as_ref(),
        ))
    }

    /// Bash rating in [-1, 10] for `strength` against a tile
    pub fn bash_rating(&mut self, strength: i32, pos: TilePos) -> Result<i32, MapError> {
        let occupant = self.occupant_sample(pos)?;
        let tile = self.store.tile_at(pos)?;
        Ok(CostModel::bash_rating_of(
            self.store.tiles(),
            strength,
            tile.terrain,
            tile.furniture,
            occupant.as_ref(),
        ))
    }

    fn occupant_sample(&mut self, pos: TilePos) -> Result<Option<OccupantSample>, MapError> {
        Ok(self
            .caches
            .occupant_at(&self.store, pos)?
            .map(|(_, sample)| sample))
    }

    pub fn transparency(&mut self, pos: TilePos) -> Result<f32, MapError> {
        self.caches.transparency(&self.store, pos)
    }

    pub fn is_transparent(&mut self, pos: TilePos) -> Result<bool, MapError> {
        Ok(self.transparency(pos)? > SOLID)
    }

    pub fn is_outdoor(&mut self, pos: TilePos) -> Result<bool, MapError> {
        self.caches.is_outdoor(&self.store, pos)
    }

    pub fn occupant_at(&mut self, pos: TilePos) -> Result<Option<OccupantRef>, MapError> {
        Ok(self
            .caches
            .occupant_at(&self.store, pos)?
            .map(|(occ_ref, _)| occ_ref))
    }

    // --- Mutation ---

    /// Arbitrary tile edit; invalidates the content-derived caches
    pub fn mutate<R>(&mut self, pos: TilePos, edit: impl FnOnce(&mut TileMut<'_>) -> R) -> Result<R, MapError> {
        self.store.mutate(pos, edit)
    }

    pub fn set_terrain(&mut self, pos: TilePos, id: TerrainId) -> Result<(), MapError> {
        if id.index() >= self.store.tiles().terrain_count() {
            return Err(MapError::UnknownTerrain(id));
        }
        self.store.mutate(pos, |tile| tile.set_terrain(id))
    }

    pub fn set_furniture(&mut self, pos: TilePos, id: FurnitureId) -> Result<(), MapError> {
        if id.index() >= self.store.tiles().furniture_count() {
            return Err(MapError::UnknownFurniture(id));
        }
        self.store.mutate(pos, |tile| tile.set_furniture(id))
    }

    /// Add or thicken a field; returns true when a new field was created
    pub fn add_field(&mut self, pos: TilePos, kind: FieldKind, density: u8) -> Result<bool, MapError> {
        self.store.mutate(pos, |tile| tile.fields_mut().add(kind, density))
    }

    pub fn remove_field(&mut self, pos: TilePos, kind: FieldKind) -> Result<bool, MapError> {
        self.store.mutate(pos, |tile| tile.fields_mut().remove(kind))
    }

    /// Open a terrain door. `inside` says whether the actor stands indoors,
    /// required for doors that only open from the inside.
    pub fn open_door(&mut self, pos: TilePos, inside: bool) -> Result<bool, MapError> {
        let terrain = self.store.tile_at(pos)?.terrain;
        let tiles = self.store.tiles();
        let def = tiles.terrain(terrain);
        let Some(open) = tiles.open_door(terrain) else {
            return Ok(false);
        };
        if def.has_flag(TileFlags::OPENCLOSE_INSIDE) && !inside {
            return Ok(false);
        }
        self.store.mutate(pos, |tile| tile.set_terrain(open))?;
        log::debug!("Door at {} opened", pos);
        Ok(true)
    }

    pub fn close_door(&mut self, pos: TilePos, inside: bool) -> Result<bool, MapError> {
        let terrain = self.store.tile_at(pos)?.terrain;
        let tiles = self.store.tiles();
        let def = tiles.terrain(terrain);
        let Some(closed) = tiles.close_door(terrain) else {
            return Ok(false);
        };
        if def.has_flag(TileFlags::OPENCLOSE_INSIDE) && !inside {
            return Ok(false);
        }
        self.store.mutate(pos, |tile| tile.set_terrain(closed))?;
        log::debug!("Door at {} closed", pos);
        Ok(true)
    }

    /// One bash attempt: succeeds with probability `rating / 10`. Furniture
    /// is smashed before the terrain it stands on.
    pub fn bash(&mut self, pos: TilePos, strength: i32, rng: &mut impl Rng) -> Result<BashOutcome, MapError> {
        if let Some((occ_ref, sample)) = self.caches.occupant_at(&self.store, pos)?
            && sample.is_obstacle()
        {
            return Ok(BashOutcome::Occupant(occ_ref));
        }

        let rating = self.bash_rating(strength, pos)?;
        if rating < 0 {
            return Ok(BashOutcome::NotBashable);
        }
        if rating == 0 || rng.gen_range(0..CostModel::MAX_BASH_RATING) >= rating {
            return Ok(BashOutcome::Held);
        }

        let tile = self.store.tile_at(pos)?;
        let tiles = self.store.tiles();
        let furniture_bashable =
            !tile.furniture.is_null() && tiles.furniture(tile.furniture).bash.is_some();
        if furniture_bashable {
            self.store
                .mutate(pos, |tile| tile.set_furniture(FurnitureId::NULL))?;
            log::debug!("Furniture at {} smashed (strength {})", pos, strength);
            return Ok(BashOutcome::FurnitureDestroyed);
        }

        let result = tiles.bash_result(tile.terrain).unwrap_or(TerrainId::NULL);
        self.store.mutate(pos, |tile| tile.set_terrain(result))?;
        log::debug!("Terrain at {} smashed (strength {})", pos, strength);
        Ok(BashOutcome::TerrainDestroyed)
    }

    // --- Occupants ---

    /// Register an occupant; its anchor must lie inside the window
    pub fn register_occupant(&mut self, occupant: Occupant) -> Result<OccupantId, MapError> {
        let id = self.store.register_occupant(occupant)?;
        log::debug!("Occupant {} registered", id.0);
        Ok(id)
    }

    /// Fails with `OutOfWindow` instead of moving the anchor off the window
    pub fn move_occupant(&mut self, id: OccupantId, delta: IVec3) -> Result<(), MapError> {
        self.store.move_occupant(id, delta)
    }

    pub fn update_occupant_part(
        &mut self,
        id: OccupantId,
        part: usize,
        edit: impl FnOnce(&mut OccupantPart),
    ) -> Result<(), MapError> {
        self.store.occupants_mut().update_part(id, part, edit)
    }

    pub fn remove_occupant(&mut self, id: OccupantId) -> Result<Occupant, MapError> {
        self.store
            .occupants_mut()
            .remove(id)
            .ok_or(MapError::UnknownOccupant(id))
    }

    // --- Windowing ---

    pub fn shift(&mut self, dx: i32, dy: i32) -> Result<(), MapError> {
        self.store.shift(dx, dy)
    }

    pub fn vertical_shift(&mut self, z: i32) -> Result<(), MapError> {
        self.store.vertical_shift(z)
    }

    pub fn load_chunk(&mut self, pos: ChunkPos) -> Result<(), MapError> {
        self.store.load_chunk(pos)
    }

    pub fn save_chunk(&mut self, pos: ChunkPos) -> Result<(), MapError> {
        self.store.save_chunk(pos)
    }

    pub fn save_all(&mut self) -> Result<usize, MapError> {
        self.store.save_all()
    }

    pub fn turn(&self) -> u64 {
        self.store.turn()
    }

    pub fn advance_turns(&mut self, turns: u64) {
        self.store.advance_turns(turns);
    }

    // --- Pathing and sight ---

    /// Refresh every cache and borrow a consistent read-only view
    pub fn snapshot(&mut self) -> CachedView<'_> {
        self.caches.view(&self.store)
    }

    pub fn find_path(&mut self, start: TilePos, goal: TilePos, radius: i32, bash: i32) -> Path {
        let view = self.caches.view(&self.store);
        self.pathfinder.find_path(&view, start, goal, radius, bash)
    }

    pub fn sees(&mut self, from: TilePos, to: TilePos, range: i32) -> bool {
        self.snapshot().sees(from, to, range)
    }

    pub fn clear_path(&mut self, from: TilePos, to: TilePos, range: i32, cost_min: i32, cost_max: i32) -> bool {
        self.snapshot().clear_path(from, to, range, cost_min, cost_max)
    }

    pub fn line_to(&self, from: TilePos, to: TilePos) -> Vec<TilePos> {
        line_to(from, to)
    }
}
