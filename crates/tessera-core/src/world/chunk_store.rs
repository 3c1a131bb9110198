//! ChunkStore - fixed-capacity window of chunk slots with paging and shifting
//!
//! Slots form a ring buffer: chunk `(cx, cy, z)` always lives in slot
//! `(cx mod W, cy mod H, z - z_min)`. Shifting by one chunk therefore only
//! flushes the column/row leaving the window and pages in the one entering;
//! every other slot keeps its chunk untouched.
//!
//! All z-levels in `z_min..=z_max` are resident at once. `vertical_shift`
//! only moves the focus layer the derived caches are built for.

use std::sync::Arc;

use glam::{IVec2, IVec3};
use tessera_tiles::TileRegistry;

use super::buffer::ChunkBuffer;
use super::chunk::{Chunk, TileMut, TileRef};
use super::coords::{CHUNK_SIZE, ChunkPos, TilePos, WindowPos};
use super::generation::{ChunkGenerator, generate_uniform};
use super::occupants::{Occupant, OccupantId, OccupantRegistry};
use super::region::RegionIndex;
use crate::config::WindowConfig;
use crate::error::MapError;

/// State of one window slot
#[derive(Debug)]
pub enum Slot {
    /// Never populated
    Empty,
    Loaded(Box<Chunk>),
    /// Buffer and generator both failed for this chunk
    Failed(ChunkPos),
}

/// The paged window plus everything needed to fill it
pub struct ChunkStore {
    window: WindowConfig,
    tiles: Arc<TileRegistry>,
    buffer: Box<dyn ChunkBuffer>,
    regions: Box<dyn RegionIndex>,
    generator: Box<dyn ChunkGenerator>,
    occupants: OccupantRegistry,
    slots: Vec<Slot>,
    /// Chunk x/y of the window's top-left slot
    origin: IVec2,
    focus_z: i32,
    /// Bumped on any change to tile content or window placement
    content_version: u64,
    /// Bumped when the set of resident chunks or the focus layer changes
    window_version: u64,
    turn: u64,
}

impl ChunkStore {
    pub fn new(
        window: WindowConfig,
        tiles: Arc<TileRegistry>,
        buffer: Box<dyn ChunkBuffer>,
        regions: Box<dyn RegionIndex>,
        generator: Box<dyn ChunkGenerator>,
    ) -> Result<Self, MapError> {
        window.validate()?;
        let slots = (0..window.slot_count()).map(|_| Slot::Empty).collect();
        let focus_z = 0.clamp(window.z_min, window.z_max);
        Ok(Self {
            window,
            tiles,
            buffer,
            regions,
            generator,
            occupants: OccupantRegistry::new(),
            slots,
            origin: IVec2::ZERO,
            focus_z,
            content_version: 0,
            window_version: 0,
            turn: 0,
        })
    }

    pub fn window(&self) -> &WindowConfig {
        &self.window
    }

    pub fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    pub fn occupants(&self) -> &OccupantRegistry {
        &self.occupants
    }

    /// Occupant mutations bump the registry version, which the caches track
    pub fn occupants_mut(&mut self) -> &mut OccupantRegistry {
        &mut self.occupants
    }

    /// Register an occupant anchored inside the window
    pub fn register_occupant(&mut self, occupant: Occupant) -> Result<OccupantId, MapError> {
        if !self.contains(occupant.origin) {
            return Err(MapError::OutOfWindow(occupant.origin));
        }
        Ok(self.occupants.register(occupant))
    }

    /// Translate an occupant. Its anchor must stay inside the window so it is
    /// flushed with a resident chunk.
    pub fn move_occupant(&mut self, id: OccupantId, delta: IVec3) -> Result<(), MapError> {
        let origin = self
            .occupants
            .get(id)
            .map(|o| TilePos(o.origin.0 + delta))
            .ok_or(MapError::UnknownOccupant(id))?;
        if !self.contains(origin) {
            return Err(MapError::OutOfWindow(origin));
        }
        self.occupants.move_by(id, delta)
    }

    /// Top-left chunk of the window on the focus layer
    pub fn origin(&self) -> ChunkPos {
        ChunkPos::new(self.origin.x, self.origin.y, self.focus_z)
    }

    pub fn focus_z(&self) -> i32 {
        self.focus_z
    }

    pub fn content_version(&self) -> u64 {
        self.content_version
    }

    pub fn window_version(&self) -> u64 {
        self.window_version
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Advance the clock; chunks paged in later catch up on the skipped turns
    pub fn advance_turns(&mut self, turns: u64) {
        self.turn += turns;
    }

    /// Window extent in tiles on one layer
    pub fn tile_extent(&self) -> IVec2 {
        IVec2::new(self.window.width * CHUNK_SIZE, self.window.height * CHUNK_SIZE)
    }

    /// Absolute top-left tile of the window on the focus layer
    pub fn origin_tile(&self) -> TilePos {
        self.origin().origin_tile()
    }

    /// Whether a chunk lies inside the window (any resident layer)
    pub fn contains_chunk(&self, pos: ChunkPos) -> bool {
        let rel = IVec2::new(pos.x(), pos.y()) - self.origin;
        rel.x >= 0
            && rel.y >= 0
            && rel.x < self.window.width
            && rel.y < self.window.height
            && pos.z() >= self.window.z_min
            && pos.z() <= self.window.z_max
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.contains_chunk(pos.chunk())
    }

    /// Window-local position of a tile on the focus layer
    pub fn window_pos(&self, pos: TilePos) -> Option<WindowPos> {
        if pos.z() != self.focus_z || !self.contains(pos) {
            return None;
        }
        Some(WindowPos(pos.xy() - self.origin_tile().xy()))
    }

    /// Absolute tile for a window-local position on the focus layer
    pub fn tile_pos(&self, wp: WindowPos) -> TilePos {
        let base = self.origin_tile();
        base.offset(wp.0.x, wp.0.y)
    }

    /// Every chunk position currently covered by the window
    pub fn window_chunks(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        let (w, h) = (self.window.width, self.window.height);
        let origin = self.origin;
        (self.window.z_min..=self.window.z_max).flat_map(move |z| {
            (0..h).flat_map(move |dy| {
                (0..w).map(move |dx| ChunkPos::new(origin.x + dx, origin.y + dy, z))
            })
        })
    }

    fn slot_index(&self, pos: ChunkPos) -> usize {
        let sx = pos.x().rem_euclid(self.window.width);
        let sy = pos.y().rem_euclid(self.window.height);
        let sz = pos.z() - self.window.z_min;
        ((sz * self.window.height + sy) * self.window.width + sx) as usize
    }

    /// Resident chunk, checking it is the one the slot should hold
    pub fn chunk(&self, pos: ChunkPos) -> Result<&Chunk, MapError> {
        if !self.contains_chunk(pos) {
            return Err(MapError::OutOfWindow(pos.origin_tile()));
        }
        match &self.slots[self.slot_index(pos)] {
            Slot::Loaded(chunk) if chunk.pos == pos => Ok(chunk.as_ref()),
            Slot::Failed(failed) if *failed == pos => Err(MapError::SlotFailed(pos)),
            _ => Err(MapError::OutOfWindow(pos.origin_tile())),
        }
    }

    fn chunk_mut(&mut self, pos: ChunkPos) -> Result<&mut Chunk, MapError> {
        if !self.contains_chunk(pos) {
            return Err(MapError::OutOfWindow(pos.origin_tile()));
        }
        let idx = self.slot_index(pos);
        match &mut self.slots[idx] {
            Slot::Loaded(chunk) if chunk.pos == pos => Ok(chunk.as_mut()),
            Slot::Failed(failed) if *failed == pos => Err(MapError::SlotFailed(pos)),
            _ => Err(MapError::OutOfWindow(pos.origin_tile())),
        }
    }

    /// Read one tile. Fails with `OutOfWindow` outside the paged area.
    pub fn tile_at(&self, pos: TilePos) -> Result<TileRef<'_>, MapError> {
        match self.chunk(pos.chunk()) {
            Ok(chunk) => Ok(chunk.tile(pos.local())),
            Err(MapError::OutOfWindow(_)) => Err(MapError::OutOfWindow(pos)),
            Err(e) => Err(e),
        }
    }

    /// Edit one tile. Always invalidates content-derived caches.
    pub fn mutate<R>(
        &mut self,
        pos: TilePos,
        edit: impl FnOnce(&mut TileMut<'_>) -> R,
    ) -> Result<R, MapError> {
        let chunk = match self.chunk_mut(pos.chunk()) {
            Ok(chunk) => chunk,
            Err(MapError::OutOfWindow(_)) => return Err(MapError::OutOfWindow(pos)),
            Err(e) => return Err(e),
        };
        let result = {
            let mut tile = chunk.tile_mut(pos.local());
            edit(&mut tile)
        };
        self.content_version += 1;
        Ok(result)
    }

    /// Page in the whole window around `origin` (top-left chunk; its z
    /// becomes the focus layer). Resident chunks are flushed first.
    ///
    /// Every slot is attempted; the first failure is returned after the rest
    /// of the window has been loaded.
    pub fn load_window(&mut self, origin: ChunkPos) -> Result<(), MapError> {
        self.check_z(origin.z())?;
        self.flush_all()?;

        self.origin = IVec2::new(origin.x(), origin.y());
        self.focus_z = origin.z();

        let positions: Vec<ChunkPos> = self.window_chunks().collect();
        let mut first_error = None;
        for pos in positions {
            if let Err(e) = self.load_chunk(pos) {
                first_error.get_or_insert(e);
            }
        }
        self.bump_window();
        log::debug!(
            "[LOAD] Window loaded at {} ({}x{} chunks, z {}..={})",
            self.origin(),
            self.window.width,
            self.window.height,
            self.window.z_min,
            self.window.z_max
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Slide the window by at most one chunk per axis. Chunks leaving the
    /// window are flushed to the buffer, chunks entering are paged in.
    pub fn shift(&mut self, dx: i32, dy: i32) -> Result<(), MapError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        if dx.abs() > 1 || dy.abs() > 1 {
            return Err(MapError::ShiftTooLarge { dx, dy });
        }

        let old: Vec<ChunkPos> = self.window_chunks().collect();
        let new_origin = self.origin + IVec2::new(dx, dy);
        let (w, h) = (self.window.width, self.window.height);
        let inside_new = |pos: &ChunkPos| {
            let rel = IVec2::new(pos.x(), pos.y()) - new_origin;
            rel.x >= 0 && rel.y >= 0 && rel.x < w && rel.y < h
        };

        let leaving: Vec<ChunkPos> = old.iter().copied().filter(|p| !inside_new(p)).collect();
        // A failed write leaves the window where it was
        self.flush_slots(&leaving)?;

        self.origin = new_origin;
        let entering: Vec<ChunkPos> = self
            .window_chunks()
            .filter(|p| !old.contains(p))
            .collect();

        let mut first_error = None;
        for pos in &entering {
            if let Err(e) = self.load_chunk(*pos) {
                first_error.get_or_insert(e);
            }
        }

        // Geometry of occupants may have changed with the reloaded set
        self.occupants.rebuild_index();
        self.bump_window();
        log::debug!(
            "[SHIFT] Window shifted by ({}, {}) to {}: {} chunks out, {} in",
            dx,
            dy,
            self.origin(),
            leaving.len(),
            entering.len()
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Re-point the window at another resident z-level
    pub fn vertical_shift(&mut self, z: i32) -> Result<(), MapError> {
        self.check_z(z)?;
        if z == self.focus_z {
            return Ok(());
        }
        let from = self.focus_z;
        self.focus_z = z;
        self.occupants.rebuild_index();
        self.bump_window();
        log::debug!("[SHIFT] Focus layer moved from z={} to z={}", from, z);
        Ok(())
    }

    fn check_z(&self, z: i32) -> Result<(), MapError> {
        if z < self.window.z_min || z > self.window.z_max {
            return Err(MapError::ZLevelOutOfRange {
                z,
                min: self.window.z_min,
                max: self.window.z_max,
            });
        }
        Ok(())
    }

    fn bump_window(&mut self) {
        self.window_version += 1;
        self.content_version += 1;
    }

    /// Page one chunk of the window in from the buffer, generating its region
    /// on a miss. A chunk already resident in the slot is flushed first.
    pub fn load_chunk(&mut self, pos: ChunkPos) -> Result<(), MapError> {
        if !self.contains_chunk(pos) {
            return Err(MapError::OutOfWindow(pos.origin_tile()));
        }
        let idx = self.slot_index(pos);
        if let Slot::Loaded(resident) = &self.slots[idx] {
            let resident = resident.pos;
            self.flush_slot(resident)?;
        }

        let mut chunk = match self.fetch_or_generate(pos) {
            Ok(chunk) => chunk,
            Err(e) => {
                log::error!("[LOAD] Chunk {} unavailable: {}", pos, e);
                self.slots[idx] = Slot::Failed(pos);
                self.content_version += 1;
                return Err(e);
            }
        };

        chunk.actualize(self.turn);
        for occupant in chunk.occupants.drain(..) {
            self.occupants.insert(occupant);
        }
        chunk.dirty = false;
        self.slots[idx] = Slot::Loaded(Box::new(chunk));
        self.content_version += 1;
        Ok(())
    }

    fn fetch_or_generate(&mut self, pos: ChunkPos) -> Result<Chunk, MapError> {
        if let Some(chunk) = self.buffer.get(pos)? {
            log::trace!("[LOAD] Chunk {} from buffer", pos);
            return Ok(chunk);
        }

        // Regions are generated whole so neighboring chunks stay consistent
        let region = pos.region();
        let kind = self.regions.region_type(region);
        let generated = match kind.uniform_fill() {
            Some(name) => match self.tiles.terrain_id(name) {
                Some(fill) => Ok(generate_uniform(region, fill)),
                None => Err(format!("uniform fill terrain '{name}' is not registered")),
            },
            None => self
                .generator
                .generate_region(region, kind, &self.tiles)
                .map_err(|e| e.to_string()),
        };

        match generated {
            Ok(chunks) => {
                log::debug!("[GEN] Region {} ({:?}): {} chunks", region, kind, chunks.len());
                for mut chunk in chunks {
                    // Never overwrite a chunk that already has buffer data
                    if self.buffer.contains(chunk.pos) || self.is_resident(chunk.pos) {
                        continue;
                    }
                    chunk.turn_last_touched = self.turn;
                    self.buffer.put(chunk)?;
                }
            }
            Err(reason) => {
                log::warn!("[GEN] Region {} ({:?}) failed to generate: {}", region, kind, reason);
            }
        }

        self.buffer.get(pos)?.ok_or_else(|| MapError::GenerationFailure {
            pos,
            reason: format!("region {region} ({kind:?}) did not produce it"),
        })
    }

    fn is_resident(&self, pos: ChunkPos) -> bool {
        self.contains_chunk(pos)
            && matches!(&self.slots[self.slot_index(pos)], Slot::Loaded(c) if c.pos == pos)
    }

    /// Write a resident chunk to the buffer, keeping it resident
    pub fn save_chunk(&mut self, pos: ChunkPos) -> Result<(), MapError> {
        let turn = self.turn;
        let occupants = self.occupants.anchored(pos);
        let chunk = self.chunk_mut(pos)?;
        chunk.turn_last_touched = turn;
        chunk.dirty = false;
        let mut copy = chunk.clone();
        copy.occupants = occupants;
        let count = copy.occupants.len();
        self.buffer.put(copy)?;
        log::debug!("[SAVE] Chunk {} saved ({} occupants)", pos, count);
        Ok(())
    }

    /// Save every resident chunk
    pub fn save_all(&mut self) -> Result<usize, MapError> {
        let resident: Vec<ChunkPos> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Loaded(chunk) => Some(chunk.pos),
                _ => None,
            })
            .collect();
        for pos in &resident {
            self.save_chunk(*pos)?;
        }
        log::info!("[SAVE] {} chunks saved", resident.len());
        Ok(resident.len())
    }

    /// Write a copy of a resident chunk and its anchored occupants to the
    /// buffer. The slot and the registry are left untouched.
    fn persist_slot(&mut self, pos: ChunkPos) -> Result<(), MapError> {
        if !self.is_resident(pos) {
            return Ok(());
        }
        let turn = self.turn;
        let occupants = self.occupants.anchored(pos);
        let mut copy = self.chunk(pos)?.clone();
        copy.occupants = occupants;
        copy.turn_last_touched = turn;
        copy.dirty = false;
        self.buffer
            .put(copy)
            .inspect_err(|e| log::error!("[SAVE] Chunk {} kept resident: {}", pos, e))?;
        Ok(())
    }

    /// Empty the slot of a persisted chunk and detach its occupants
    fn evict_slot(&mut self, pos: ChunkPos) {
        if !self.is_resident(pos) {
            return;
        }
        let idx = self.slot_index(pos);
        self.slots[idx] = Slot::Empty;
        let detached = self.occupants.take_anchored(pos);
        self.content_version += 1;
        log::trace!("[SAVE] Chunk {} flushed ({} occupants)", pos, detached.len());
    }

    /// Move a chunk out of its slot into the buffer. On a buffer failure the
    /// chunk stays resident with its occupants registered.
    fn flush_slot(&mut self, pos: ChunkPos) -> Result<(), MapError> {
        self.persist_slot(pos)?;
        self.evict_slot(pos);
        Ok(())
    }

    /// Persist every listed chunk, then evict them all. Nothing is evicted
    /// unless every write succeeded.
    fn flush_slots(&mut self, positions: &[ChunkPos]) -> Result<(), MapError> {
        for pos in positions {
            self.persist_slot(*pos)?;
        }
        for pos in positions {
            self.evict_slot(*pos);
        }
        Ok(())
    }

    fn flush_all(&mut self) -> Result<(), MapError> {
        let resident: Vec<ChunkPos> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Loaded(chunk) => Some(chunk.pos),
                _ => None,
            })
            .collect();
        self.flush_slots(&resident)
    }

    /// Slot states for diagnostics
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::error::BufferError;
    use crate::world::buffer::MemoryBuffer;
    use crate::world::coords::LocalPos;
    use crate::world::generation::NoiseGenerator;
    use crate::world::occupants::OccupantPart;
    use crate::world::region::{RegionType, UniformRegions};
    use tessera_tiles::{PartFlags, TerrainId};

    fn small_window() -> WindowConfig {
        WindowConfig {
            width: 3,
            height: 3,
            z_min: -1,
            z_max: 1,
        }
    }

    fn store(kind: RegionType) -> ChunkStore {
        ChunkStore::new(
            small_window(),
            Arc::new(TileRegistry::builtin()),
            Box::new(MemoryBuffer::new()),
            Box::new(UniformRegions(kind)),
            Box::new(NoiseGenerator::new(3, 0.12)),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_store_reports_out_of_window() {
        let store = store(RegionType::Field);
        let err = store.tile_at(TilePos::new(0, 0, 0)).unwrap_err();
        assert!(matches!(err, MapError::OutOfWindow(_)));
    }

    #[test]
    fn test_load_window_pages_every_layer() {
        let mut store = store(RegionType::Field);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();

        assert_eq!(store.window_chunks().count(), 27);
        for pos in store.window_chunks().collect::<Vec<_>>() {
            assert_eq!(store.chunk(pos).unwrap().pos, pos);
        }
        assert!(store.tile_at(TilePos::new(35, 35, 1)).is_ok());
        assert!(matches!(
            store.tile_at(TilePos::new(36, 0, 0)),
            Err(MapError::OutOfWindow(_))
        ));
        assert!(matches!(
            store.tile_at(TilePos::new(-1, 0, 0)),
            Err(MapError::OutOfWindow(_))
        ));
    }

    #[test]
    fn test_mutate_bumps_content_version() {
        let mut store = store(RegionType::Field);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        let window = store.window_version();
        let before = store.content_version();

        let pavement = store.tiles().terrain_id("t_pavement").unwrap();
        store
            .mutate(TilePos::new(4, 4, 0), |tile| tile.set_terrain(pavement))
            .unwrap();
        assert!(store.content_version() > before);
        assert_eq!(store.window_version(), window);
        assert_eq!(store.tile_at(TilePos::new(4, 4, 0)).unwrap().terrain, pavement);
    }

    #[test]
    fn test_shift_flushes_and_restores_content() {
        let mut store = store(RegionType::Field);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        let marker = TerrainId(6);
        store
            .mutate(TilePos::new(1, 1, 0), |tile| tile.set_terrain(marker))
            .unwrap();

        store.shift(1, 0).unwrap();
        assert!(store.tile_at(TilePos::new(1, 1, 0)).is_err());
        assert!(store.tile_at(TilePos::new(36, 1, 0)).is_ok());

        store.shift(-1, 0).unwrap();
        assert_eq!(store.tile_at(TilePos::new(1, 1, 0)).unwrap().terrain, marker);
    }

    #[test]
    fn test_shift_limits() {
        let mut store = store(RegionType::Field);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        let version = store.window_version();

        store.shift(0, 0).unwrap();
        assert_eq!(store.window_version(), version);
        assert!(matches!(
            store.shift(2, 0),
            Err(MapError::ShiftTooLarge { dx: 2, dy: 0 })
        ));
    }

    #[test]
    fn test_vertical_shift_range() {
        let mut store = store(RegionType::Field);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        store.vertical_shift(-1).unwrap();
        assert_eq!(store.focus_z(), -1);
        assert_eq!(store.origin(), ChunkPos::new(0, 0, -1));
        assert!(matches!(
            store.vertical_shift(5),
            Err(MapError::ZLevelOutOfRange { z: 5, .. })
        ));
    }

    #[test]
    fn test_uniform_regions_skip_generator() {
        let mut store = store(RegionType::EmptyRock);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        let rock = store.tiles().terrain_id("t_rock").unwrap();
        let chunk = store.chunk(ChunkPos::new(1, 1, 0)).unwrap();
        assert!(chunk.is_uniform());
        assert_eq!(chunk.terrain(LocalPos::new(0, 0)), rock);
    }

    struct FailingGenerator;

    impl ChunkGenerator for FailingGenerator {
        fn generate_region(
            &mut self,
            _region: crate::world::coords::RegionPos,
            _kind: RegionType,
            _tiles: &TileRegistry,
        ) -> Result<Vec<Chunk>, crate::error::GenerationError> {
            Err(crate::error::GenerationError::Failed("always".to_string()))
        }
    }

    #[test]
    fn test_generation_failure_leaves_slot_failed() {
        let mut store = ChunkStore::new(
            small_window(),
            Arc::new(TileRegistry::builtin()),
            Box::new(MemoryBuffer::new()),
            Box::new(UniformRegions(RegionType::Forest)),
            Box::new(FailingGenerator),
        )
        .unwrap();
        let err = store.load_window(ChunkPos::new(0, 0, 0)).unwrap_err();
        assert!(matches!(err, MapError::GenerationFailure { .. }));

        // Subsequent reads re-raise instead of crashing
        let err = store.tile_at(TilePos::new(0, 0, 0)).unwrap_err();
        assert!(matches!(err, MapError::SlotFailed(_)));
        let err = store
            .mutate(TilePos::new(0, 0, 0), |tile| tile.set_trap(1))
            .unwrap_err();
        assert!(matches!(err, MapError::SlotFailed(_)));
    }

    #[test]
    fn test_time_skip_actualizes_on_reload() {
        let mut store = store(RegionType::Field);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        store
            .mutate(TilePos::new(2, 2, 0), |tile| {
                tile.fields_mut().add(tessera_tiles::FieldKind::Smoke, 1);
            })
            .unwrap();

        store.shift(1, 0).unwrap();
        store.advance_turns(500);
        store.shift(-1, 0).unwrap();

        let chunk = store.chunk(ChunkPos::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.turn_last_touched, 500);
        assert!(store.tile_at(TilePos::new(2, 2, 0)).unwrap().fields.is_none());
    }

    #[test]
    fn test_zero_width_window_rejected() {
        let window = WindowConfig {
            width: 0,
            ..small_window()
        };
        let result = ChunkStore::new(
            window,
            Arc::new(TileRegistry::builtin()),
            Box::new(MemoryBuffer::new()),
            Box::new(UniformRegions(RegionType::Field)),
            Box::new(NoiseGenerator::new(3, 0.12)),
        );
        assert!(matches!(result, Err(MapError::InvalidConfig(_))));
    }

    fn crate_at(origin: TilePos) -> Occupant {
        Occupant::new(
            "crate",
            origin,
            [OccupantPart::new(IVec2::ZERO, PartFlags::OBSTACLE, 10)],
        )
    }

    /// Memory buffer whose writes can be switched off from outside
    struct FlakyBuffer {
        inner: MemoryBuffer,
        fail_puts: Rc<Cell<bool>>,
    }

    impl ChunkBuffer for FlakyBuffer {
        fn get(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, BufferError> {
            self.inner.get(pos)
        }

        fn put(&mut self, chunk: Chunk) -> Result<(), BufferError> {
            if self.fail_puts.get() {
                return Err(BufferError::Encode {
                    pos: chunk.pos,
                    reason: "disk full".to_string(),
                });
            }
            self.inner.put(chunk)
        }

        fn contains(&self, pos: ChunkPos) -> bool {
            self.inner.contains(pos)
        }
    }

    fn flaky_store() -> (ChunkStore, Rc<Cell<bool>>) {
        let fail_puts = Rc::new(Cell::new(false));
        let buffer = FlakyBuffer {
            inner: MemoryBuffer::new(),
            fail_puts: Rc::clone(&fail_puts),
        };
        let store = ChunkStore::new(
            small_window(),
            Arc::new(TileRegistry::builtin()),
            Box::new(buffer),
            Box::new(UniformRegions(RegionType::EmptyRock)),
            Box::new(NoiseGenerator::new(3, 0.12)),
        )
        .unwrap();
        (store, fail_puts)
    }

    #[test]
    fn test_failed_flush_keeps_chunks_resident() {
        let (mut store, fail_puts) = flaky_store();
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();
        let marker = TerrainId(6);
        let edited = TilePos::new(1, 1, 0);
        store.mutate(edited, |tile| tile.set_terrain(marker)).unwrap();
        let id = store
            .register_occupant(crate_at(TilePos::new(2, 2, 0)))
            .unwrap();

        fail_puts.set(true);
        let err = store.shift(1, 0).unwrap_err();
        assert!(matches!(err, MapError::Buffer(BufferError::Encode { .. })));

        // Window untouched: same origin, edit and occupant still there
        assert_eq!(store.origin(), ChunkPos::new(0, 0, 0));
        assert_eq!(store.window_chunks().filter(|p| store.is_resident(*p)).count(), 27);
        assert_eq!(store.tile_at(edited).unwrap().terrain, marker);
        assert!(store.occupants().get(id).is_some());

        // Once writes succeed again the edit survives a round trip
        fail_puts.set(false);
        store.shift(1, 0).unwrap();
        assert!(store.occupants().get(id).is_none());
        store.shift(-1, 0).unwrap();
        assert_eq!(store.tile_at(edited).unwrap().terrain, marker);
        assert!(store.occupants().get(id).is_some());
    }

    #[test]
    fn test_occupant_cannot_leave_window() {
        let mut store = store(RegionType::EmptyRock);
        store.load_window(ChunkPos::new(0, 0, 0)).unwrap();

        let outside = crate_at(TilePos::new(-1, 0, 0));
        assert!(matches!(
            store.register_occupant(outside),
            Err(MapError::OutOfWindow(_))
        ));

        let origin = TilePos::new(34, 5, 0);
        let id = store
            .register_occupant(crate_at(origin))
            .unwrap();
        store.move_occupant(id, IVec3::new(1, 0, 0)).unwrap();
        let err = store.move_occupant(id, IVec3::new(1, 0, 0)).unwrap_err();
        assert!(matches!(err, MapError::OutOfWindow(pos) if pos == TilePos::new(36, 5, 0)));
        assert_eq!(store.occupants().get(id).unwrap().origin, origin.offset(1, 0));

        assert!(matches!(
            store.move_occupant(OccupantId(99), IVec3::ZERO),
            Err(MapError::UnknownOccupant(_))
        ));
    }
}
