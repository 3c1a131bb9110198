//! Chunk - CHUNK_SIZE x CHUNK_SIZE block of tiles, the unit of paging

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_tiles::{FieldContainer, FurnitureId, TerrainId};

use super::coords::{CHUNK_AREA, ChunkPos, LocalPos};
use super::occupants::Occupant;

/// A block of tiles with per-tile terrain, furniture, fields and extras
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub pos: ChunkPos,

    /// Row-major, index = y * CHUNK_SIZE + x
    #[serde(with = "serde_big_array::BigArray")]
    terrain: [TerrainId; CHUNK_AREA],

    #[serde(with = "serde_big_array::BigArray")]
    furniture: [FurnitureId; CHUNK_AREA],

    /// Trap ids (0 = none); trap behavior lives outside the map core
    #[serde(with = "serde_big_array::BigArray")]
    traps: [u16; CHUNK_AREA],

    #[serde(with = "serde_big_array::BigArray")]
    radiation: [u8; CHUNK_AREA],

    /// Sparse: most tiles carry no fields
    fields: BTreeMap<u16, FieldContainer>,

    /// Sparse signage / graffiti text
    signage: BTreeMap<u16, String>,

    /// Turn this chunk was last simulated or persisted
    pub turn_last_touched: u64,

    /// Occupants anchored here while the chunk is parked in the buffer
    pub occupants: Vec<Occupant>,

    /// Modified since last save (not persisted)
    #[serde(skip)]
    pub dirty: bool,
}

impl Chunk {
    /// A chunk filled with one terrain
    pub fn new(pos: ChunkPos, fill: TerrainId) -> Self {
        Self {
            pos,
            terrain: [fill; CHUNK_AREA],
            furniture: [FurnitureId::NULL; CHUNK_AREA],
            traps: [0; CHUNK_AREA],
            radiation: [0; CHUNK_AREA],
            fields: BTreeMap::new(),
            signage: BTreeMap::new(),
            turn_last_touched: 0,
            occupants: Vec::new(),
            dirty: false,
        }
    }

    #[inline]
    pub fn terrain(&self, local: LocalPos) -> TerrainId {
        self.terrain[local.index()]
    }

    #[inline]
    pub fn furniture(&self, local: LocalPos) -> FurnitureId {
        self.furniture[local.index()]
    }

    pub fn fields(&self, local: LocalPos) -> Option<&FieldContainer> {
        self.fields.get(&(local.index() as u16))
    }

    pub fn trap(&self, local: LocalPos) -> u16 {
        self.traps[local.index()]
    }

    pub fn radiation(&self, local: LocalPos) -> u8 {
        self.radiation[local.index()]
    }

    pub fn signage(&self, local: LocalPos) -> Option<&str> {
        self.signage.get(&(local.index() as u16)).map(String::as_str)
    }

    /// Read-only view of one tile
    pub fn tile(&self, local: LocalPos) -> TileRef<'_> {
        TileRef {
            terrain: self.terrain(local),
            furniture: self.furniture(local),
            fields: self.fields(local),
            trap: self.trap(local),
            radiation: self.radiation(local),
            signage: self.signage(local),
        }
    }

    /// Mutable view of one tile; marks the chunk dirty
    pub fn tile_mut(&mut self, local: LocalPos) -> TileMut<'_> {
        self.dirty = true;
        TileMut { chunk: self, local }
    }

    /// True when every tile has the same terrain and nothing else on it
    pub fn is_uniform(&self) -> bool {
        let first = self.terrain[0];
        self.terrain.iter().all(|&t| t == first)
            && self.furniture.iter().all(|f| f.is_null())
            && self.traps.iter().all(|&t| t == 0)
            && self.radiation.iter().all(|&r| r == 0)
            && self.fields.is_empty()
            && self.signage.is_empty()
            && self.occupants.is_empty()
    }

    /// Number of tiles carrying at least one field
    pub fn field_tile_count(&self) -> usize {
        self.fields.len()
    }

    /// Catch up on the turns elapsed while the chunk was not in memory.
    /// Fields age and dissipate; the chunk is stamped with `now`.
    pub fn actualize(&mut self, now: u64) {
        if now <= self.turn_last_touched {
            return;
        }
        let elapsed = now - self.turn_last_touched;
        for fields in self.fields.values_mut() {
            fields.age_by(elapsed);
        }
        self.fields.retain(|_, fields| !fields.is_empty());
        self.turn_last_touched = now;
        log::trace!("[LOAD] Chunk {} actualized after {} turns", self.pos, elapsed);
    }
}

/// Snapshot of one tile's content
#[derive(Clone, Copy, Debug)]
pub struct TileRef<'a> {
    pub terrain: TerrainId,
    pub furniture: FurnitureId,
    pub fields: Option<&'a FieldContainer>,
    pub trap: u16,
    pub radiation: u8,
    pub signage: Option<&'a str>,
}

impl TileRef<'_> {
    /// Light transmission of the fields on this tile (1.0 when none)
    pub fn field_transparency(&self) -> f32 {
        self.fields.map_or(1.0, FieldContainer::transparency)
    }
}

/// Mutable access to one tile of a chunk
pub struct TileMut<'a> {
    chunk: &'a mut Chunk,
    local: LocalPos,
}

impl TileMut<'_> {
    pub fn local(&self) -> LocalPos {
        self.local
    }

    pub fn terrain(&self) -> TerrainId {
        self.chunk.terrain(self.local)
    }

    pub fn set_terrain(&mut self, id: TerrainId) {
        self.chunk.terrain[self.local.index()] = id;
    }

    pub fn furniture(&self) -> FurnitureId {
        self.chunk.furniture(self.local)
    }

    pub fn set_furniture(&mut self, id: FurnitureId) {
        self.chunk.furniture[self.local.index()] = id;
    }

    pub fn set_trap(&mut self, trap: u16) {
        self.chunk.traps[self.local.index()] = trap;
    }

    pub fn set_radiation(&mut self, level: u8) {
        self.chunk.radiation[self.local.index()] = level;
    }

    pub fn set_signage(&mut self, text: Option<String>) {
        let key = self.local.index() as u16;
        match text {
            Some(text) => {
                self.chunk.signage.insert(key, text);
            }
            None => {
                self.chunk.signage.remove(&key);
            }
        }
    }

    /// Field container of this tile, created on demand
    pub fn fields_mut(&mut self) -> &mut FieldContainer {
        self.chunk
            .fields
            .entry(self.local.index() as u16)
            .or_default()
    }
}

impl Drop for TileMut<'_> {
    fn drop(&mut self) {
        // Drop containers emptied through fields_mut
        let key = self.local.index() as u16;
        if self.chunk.fields.get(&key).is_some_and(FieldContainer::is_empty) {
            self.chunk.fields.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_tiles::FieldKind;

    #[test]
    fn test_new_chunk_is_uniform() {
        let chunk = Chunk::new(ChunkPos::new(0, 0, 0), TerrainId(3));
        assert!(chunk.is_uniform());
        assert_eq!(chunk.terrain(LocalPos::new(11, 11)), TerrainId(3));
        assert!(!chunk.dirty);
    }

    #[test]
    fn test_tile_mut_edits() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), TerrainId(3));
        let local = LocalPos::new(2, 5);
        {
            let mut tile = chunk.tile_mut(local);
            tile.set_terrain(TerrainId(4));
            tile.set_furniture(FurnitureId(1));
            tile.set_signage(Some("keep out".to_string()));
            tile.fields_mut().add(FieldKind::Smoke, 2);
        }

        assert!(chunk.dirty);
        assert!(!chunk.is_uniform());
        let tile = chunk.tile(local);
        assert_eq!(tile.terrain, TerrainId(4));
        assert_eq!(tile.furniture, FurnitureId(1));
        assert_eq!(tile.signage, Some("keep out"));
        assert!(tile.field_transparency() < 1.0);
    }

    #[test]
    fn test_empty_field_container_is_dropped() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), TerrainId(3));
        let local = LocalPos::new(0, 0);
        chunk.tile_mut(local).fields_mut().add(FieldKind::Fog, 1);
        assert_eq!(chunk.field_tile_count(), 1);

        chunk.tile_mut(local).fields_mut().remove(FieldKind::Fog);
        assert_eq!(chunk.field_tile_count(), 0);
        assert!(chunk.fields(local).is_none());
    }

    #[test]
    fn test_actualize_ages_fields() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), TerrainId(3));
        chunk.tile_mut(LocalPos::new(1, 1)).fields_mut().add(FieldKind::Smoke, 1);
        chunk.tile_mut(LocalPos::new(2, 1)).fields_mut().add(FieldKind::Blood, 1);
        chunk.turn_last_touched = 100;

        chunk.actualize(1000);
        assert_eq!(chunk.turn_last_touched, 1000);
        assert!(chunk.fields(LocalPos::new(1, 1)).is_none());
        assert!(chunk.fields(LocalPos::new(2, 1)).is_some());

        // Going back in time is a no-op
        chunk.actualize(10);
        assert_eq!(chunk.turn_last_touched, 1000);
    }
}
