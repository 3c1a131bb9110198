//! Derived caches - outdoor, transparency and occupancy over the focus layer
//!
//! Each cache is a flat array covering the window's tile extent, stamped with
//! the versions it was built from:
//! - outdoor and transparency: store content version + occupant version
//! - occupancy: store window version + occupant version
//!
//! A stale cache is rebuilt in one full pass on its next read. Queries for a
//! resident layer other than the focus layer are computed directly.

use glam::IVec2;
use tessera_tiles::{CostModel, FurnitureDef, OccupantSample, PartFlags, TerrainDef, TileFlags};

use super::chunk::TileRef;
use super::chunk_store::ChunkStore;
use super::coords::{TilePos, WindowPos};
use super::line::line_variants;
use super::occupants::OccupantRef;
use crate::error::MapError;
use crate::pathfinding::{PathGrid, TileSample};

/// Transparency of a tile light passes through unhindered
pub const CLEAR: f32 = 1.0;
/// Transparency of an opaque tile
pub const SOLID: f32 = 0.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stamp {
    data: u64,
    occupants: u64,
}

/// One cache layer over the window
#[derive(Debug)]
struct Layer<T> {
    stamp: Option<Stamp>,
    origin: IVec2,
    extent: IVec2,
    cells: Vec<T>,
}

impl<T: Copy> Layer<T> {
    fn new() -> Self {
        Self {
            stamp: None,
            origin: IVec2::ZERO,
            extent: IVec2::ZERO,
            cells: Vec::new(),
        }
    }

    fn is_fresh(&self, stamp: Stamp) -> bool {
        self.stamp == Some(stamp)
    }

    fn index(&self, pos: IVec2) -> Option<usize> {
        let rel = pos - self.origin;
        if rel.x < 0 || rel.y < 0 || rel.x >= self.extent.x || rel.y >= self.extent.y {
            return None;
        }
        Some((rel.y * self.extent.x + rel.x) as usize)
    }

    fn get(&self, pos: IVec2) -> Option<T> {
        self.index(pos).map(|idx| self.cells[idx])
    }

    fn publish(&mut self, stamp: Stamp, origin: IVec2, extent: IVec2, cells: Vec<T>) {
        self.stamp = Some(stamp);
        self.origin = origin;
        self.extent = extent;
        self.cells = cells;
    }
}

/// Number of full rebuilds per cache
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub outdoor: u64,
    pub transparency: u64,
    pub occupancy: u64,
}

/// Outdoor, transparency and occupancy caches for one window
#[derive(Debug)]
pub struct DerivedCaches {
    outdoor: Layer<bool>,
    transparency: Layer<f32>,
    occupied: Layer<bool>,
    stats: CacheStats,
}

impl Default for DerivedCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl DerivedCaches {
    pub fn new() -> Self {
        Self {
            outdoor: Layer::new(),
            transparency: Layer::new(),
            occupied: Layer::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn content_stamp(store: &ChunkStore) -> Stamp {
        Stamp {
            data: store.content_version(),
            occupants: store.occupants().version(),
        }
    }

    fn window_stamp(store: &ChunkStore) -> Stamp {
        Stamp {
            data: store.window_version(),
            occupants: store.occupants().version(),
        }
    }

    /// Whether every cache matches the store's current versions
    pub fn is_fresh(&self, store: &ChunkStore) -> bool {
        let content = Self::content_stamp(store);
        self.outdoor.is_fresh(content)
            && self.transparency.is_fresh(content)
            && self.occupied.is_fresh(Self::window_stamp(store))
    }

    /// Rebuild whatever is stale. Outdoor goes first, then transparency,
    /// then occupancy.
    pub fn refresh_all(&mut self, store: &ChunkStore) {
        self.ensure_outdoor(store);
        self.ensure_transparency(store);
        self.ensure_occupancy(store);
    }

    fn ensure_outdoor(&mut self, store: &ChunkStore) {
        let stamp = Self::content_stamp(store);
        if self.outdoor.is_fresh(stamp) {
            return;
        }
        let (origin, extent, z) = frame(store);
        let width = extent.x as usize;
        let mut cells = vec![false; (extent.x * extent.y) as usize];

        if z >= 0 {
            let mut indoor = vec![false; cells.len()];
            for y in 0..extent.y {
                for x in 0..extent.x {
                    let pos = TilePos::new(origin.x + x, origin.y + y, z);
                    indoor[y as usize * width + x as usize] = tile_is_indoors(store, pos);
                }
            }
            // Any indoor tile removes outdoor status from its Moore neighborhood
            for y in 0..extent.y {
                for x in 0..extent.x {
                    let near_indoor = (-1..=1).any(|dy| {
                        (-1..=1).any(|dx| {
                            let (nx, ny) = (x + dx, y + dy);
                            nx >= 0
                                && ny >= 0
                                && nx < extent.x
                                && ny < extent.y
                                && indoor[ny as usize * width + nx as usize]
                        })
                    });
                    let pos = TilePos::new(origin.x + x, origin.y + y, z);
                    cells[y as usize * width + x as usize] =
                        !near_indoor && !occupant_is_inside(store, pos);
                }
            }
        }

        self.outdoor.publish(stamp, origin, extent, cells);
        self.stats.outdoor += 1;
        log::trace!("[CACHE] Outdoor cache rebuilt for z={}", z);
    }

    fn ensure_transparency(&mut self, store: &ChunkStore) {
        let stamp = Self::content_stamp(store);
        if self.transparency.is_fresh(stamp) {
            return;
        }
        let (origin, extent, z) = frame(store);
        let mut cells = Vec::with_capacity((extent.x * extent.y) as usize);
        for y in 0..extent.y {
            for x in 0..extent.x {
                cells.push(compute_transparency(
                    store,
                    TilePos::new(origin.x + x, origin.y + y, z),
                ));
            }
        }
        self.transparency.publish(stamp, origin, extent, cells);
        self.stats.transparency += 1;
        log::trace!("[CACHE] Transparency cache rebuilt for z={}", z);
    }

    fn ensure_occupancy(&mut self, store: &ChunkStore) {
        let stamp = Self::window_stamp(store);
        if self.occupied.is_fresh(stamp) {
            return;
        }
        let (origin, extent, z) = frame(store);
        let mut layer = Layer::new();
        layer.origin = origin;
        layer.extent = extent;
        layer.cells = vec![false; (extent.x * extent.y) as usize];

        let mut covered = 0;
        for (pos, _) in store.occupants().index_iter() {
            if pos.z() != z {
                continue;
            }
            if let Some(idx) = layer.index(pos.xy()) {
                layer.cells[idx] = true;
                covered += 1;
            }
        }
        self.occupied.publish(stamp, origin, extent, layer.cells);
        self.stats.occupancy += 1;
        log::trace!("[CACHE] Occupancy cache rebuilt for z={}: {} tiles", z, covered);
    }

    /// Outdoor classification; rebuilds the cache if stale
    pub fn is_outdoor(&mut self, store: &ChunkStore, pos: TilePos) -> Result<bool, MapError> {
        check_in_window(store, pos)?;
        self.ensure_outdoor(store);
        Ok(self.read_outdoor(store, pos))
    }

    /// Light transmission in [SOLID, CLEAR]; rebuilds the cache if stale
    pub fn transparency(&mut self, store: &ChunkStore, pos: TilePos) -> Result<f32, MapError> {
        check_in_window(store, pos)?;
        self.ensure_transparency(store);
        Ok(self.read_transparency(store, pos))
    }

    /// Occupant part covering a tile; rebuilds the cache if stale
    pub fn occupant_at(
        &mut self,
        store: &ChunkStore,
        pos: TilePos,
    ) -> Result<Option<(OccupantRef, OccupantSample)>, MapError> {
        check_in_window(store, pos)?;
        self.ensure_occupancy(store);
        Ok(self.read_occupant(store, pos))
    }

    fn read_outdoor(&self, store: &ChunkStore, pos: TilePos) -> bool {
        if pos.z() != store.focus_z() {
            return compute_outdoor(store, pos);
        }
        self.outdoor
            .get(pos.xy())
            .unwrap_or_else(|| compute_outdoor(store, pos))
    }

    fn read_transparency(&self, store: &ChunkStore, pos: TilePos) -> f32 {
        if pos.z() != store.focus_z() {
            return compute_transparency(store, pos);
        }
        self.transparency
            .get(pos.xy())
            .unwrap_or_else(|| compute_transparency(store, pos))
    }

    fn read_occupant(&self, store: &ChunkStore, pos: TilePos) -> Option<(OccupantRef, OccupantSample)> {
        if pos.z() != store.focus_z() {
            return store.occupants().sample_at(pos);
        }
        if !self.occupied.get(pos.xy()).unwrap_or(false) {
            return None;
        }
        let hit = store.occupants().sample_at(pos);
        if hit.is_none() {
            log::error!(
                "[CACHE] ConsistencyFault: {} is flagged occupied but the occupant index has no entry",
                pos
            );
        }
        hit
    }

    /// Refresh whatever is stale and borrow a read-only view over the result
    pub fn view<'a>(&'a mut self, store: &'a ChunkStore) -> CachedView<'a> {
        self.refresh_all(store);
        CachedView { store, caches: self }
    }
}

/// Window origin, extent and layer the caches are built for
fn frame(store: &ChunkStore) -> (IVec2, IVec2, i32) {
    (store.origin_tile().xy(), store.tile_extent(), store.focus_z())
}

fn check_in_window(store: &ChunkStore, pos: TilePos) -> Result<(), MapError> {
    if store.contains(pos) {
        Ok(())
    } else {
        Err(MapError::OutOfWindow(pos))
    }
}

fn furniture_def<'a>(store: &'a ChunkStore, tile: &TileRef<'_>) -> Option<&'a FurnitureDef> {
    (!tile.furniture.is_null()).then(|| store.tiles().furniture(tile.furniture))
}

fn tile_is_indoors(store: &ChunkStore, pos: TilePos) -> bool {
    let Ok(tile) = store.tile_at(pos) else {
        return false;
    };
    store.tiles().terrain(tile.terrain).has_flag(TileFlags::INDOORS)
        || furniture_def(store, &tile).is_some_and(|f| f.has_flag(TileFlags::INDOORS))
}

fn occupant_is_inside(store: &ChunkStore, pos: TilePos) -> bool {
    store
        .occupants()
        .sample_at(pos)
        .is_some_and(|(_, sample)| sample.flags.contains(PartFlags::INSIDE))
}

/// Outdoor classification of a single tile, without caching
pub fn compute_outdoor(store: &ChunkStore, pos: TilePos) -> bool {
    if pos.z() < 0 {
        return false;
    }
    let near_indoor =
        (-1..=1).any(|dy| (-1..=1).any(|dx| tile_is_indoors(store, pos.offset(dx, dy))));
    !near_indoor && !occupant_is_inside(store, pos)
}

/// Light transmission of a single tile, without caching.
/// Unloaded and failed tiles are opaque.
pub fn compute_transparency(store: &ChunkStore, pos: TilePos) -> f32 {
    if let Some((_, sample)) = store.occupants().sample_at(pos)
        && sample.blocks_light()
    {
        return SOLID;
    }
    let Ok(tile) = store.tile_at(pos) else {
        return SOLID;
    };
    if !store.tiles().terrain(tile.terrain).has_flag(TileFlags::TRANSPARENT) {
        return SOLID;
    }
    if furniture_def(store, &tile).is_some_and(|f| !f.has_flag(TileFlags::TRANSPARENT)) {
        return SOLID;
    }
    CLEAR * tile.field_transparency()
}

/// Consistent read-only view over a store and its fresh caches
#[derive(Clone, Copy)]
pub struct CachedView<'a> {
    store: &'a ChunkStore,
    caches: &'a DerivedCaches,
}

impl<'a> CachedView<'a> {
    pub fn store(&self) -> &'a ChunkStore {
        self.store
    }

    pub fn focus_z(&self) -> i32 {
        self.store.focus_z()
    }

    pub fn tile_at(&self, pos: TilePos) -> Result<TileRef<'a>, MapError> {
        self.store.tile_at(pos)
    }

    pub fn is_outdoor(&self, pos: TilePos) -> Result<bool, MapError> {
        check_in_window(self.store, pos)?;
        Ok(self.caches.read_outdoor(self.store, pos))
    }

    pub fn transparency(&self, pos: TilePos) -> Result<f32, MapError> {
        check_in_window(self.store, pos)?;
        Ok(self.caches.read_transparency(self.store, pos))
    }

    /// Whether any light passes through the tile
    pub fn is_transparent(&self, pos: TilePos) -> Result<bool, MapError> {
        Ok(self.transparency(pos)? > SOLID)
    }

    pub fn occupant_at(&self, pos: TilePos) -> Result<Option<(OccupantRef, OccupantSample)>, MapError> {
        check_in_window(self.store, pos)?;
        Ok(self.caches.read_occupant(self.store, pos))
    }

    /// Everything the cost model reads for a tile
    pub fn tile_sample(&self, pos: TilePos) -> Result<TileSample<'a>, MapError> {
        let tile = self.store.tile_at(pos)?;
        let occupant = self.caches.read_occupant(self.store, pos);
        let terrain: &'a TerrainDef = self.store.tiles().terrain(tile.terrain);
        Ok(TileSample {
            terrain,
            furniture: furniture_def(self.store, &tile),
            occupant,
        })
    }

    pub fn move_cost(&self, pos: TilePos) -> Result<i32, MapError> {
        Ok(self.tile_sample(pos)?.move_cost())
    }

    pub fn bash_rating(&self, strength: i32, pos: TilePos) -> Result<i32, MapError> {
        let sample = self.tile_sample(pos)?;
        Ok(CostModel::bash_rating(
            strength,
            sample.terrain,
            sample.furniture,
            sample.occupant.as_ref().map(|(_, s)| s),
        ))
    }

    /// Line of sight: on at least one Bresenham line from `from` to `to`,
    /// every tile between lets light through. `range` of -1 is unbounded.
    pub fn sees(&self, from: TilePos, to: TilePos, range: i32) -> bool {
        self.any_line(from, to, range, |pos| self.is_transparent(pos).unwrap_or(false))
    }

    /// On at least one line, every tile between `from` and `to` has a move
    /// cost in `cost_min..=cost_max`
    pub fn clear_path(&self, from: TilePos, to: TilePos, range: i32, cost_min: i32, cost_max: i32) -> bool {
        self.any_line(from, to, range, |pos| {
            self.move_cost(pos)
                .is_ok_and(|cost| cost >= cost_min && cost <= cost_max)
        })
    }

    fn any_line(&self, from: TilePos, to: TilePos, range: i32, passes: impl Fn(TilePos) -> bool) -> bool {
        if from.z() != to.z() || (range >= 0 && from.rl_dist(to) > range) {
            return false;
        }
        line_variants(from, to).any(|line| {
            let between = line.len().saturating_sub(1);
            line[..between].iter().all(|&pos| passes(pos))
        })
    }
}

impl PathGrid for CachedView<'_> {
    fn bounds(&self) -> (IVec2, IVec2) {
        let min = self.store.origin_tile().xy();
        let max = self.store.tile_pos(WindowPos(self.store.tile_extent() - IVec2::ONE)).xy();
        (min, max)
    }

    fn contains(&self, pos: TilePos) -> bool {
        self.store.contains(pos)
    }

    fn sample(&self, pos: TilePos) -> Option<TileSample<'_>> {
        self.tile_sample(pos).ok()
    }
}
