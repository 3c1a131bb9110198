//! Occupant registry - the source of truth for occupant (vehicle) geometry
//!
//! The registry owns every occupant currently in the window and a tile index
//! (absolute tile -> parts covering it, most recent last). The derived
//! occupancy cache only mirrors this index; it never writes back.

use std::collections::BTreeMap;

use ahash::AHashMap;
use glam::{IVec2, IVec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tessera_tiles::{OccupantSample, PartFlags};

use super::coords::{ChunkPos, TilePos};
use crate::error::MapError;

/// Stable occupant identifier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccupantId(pub u32);

/// One part of an occupant, placed at an offset from its origin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupantPart {
    pub offset: IVec2,
    pub flags: PartFlags,
    pub hp: i32,
}

impl OccupantPart {
    pub fn new(offset: IVec2, flags: PartFlags, hp: i32) -> Self {
        Self { offset, flags, hp }
    }
}

/// An entity whose footprint can block or shade tiles independent of terrain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: OccupantId,
    pub name: String,
    /// Anchor tile; the occupant is persisted with the chunk holding it
    pub origin: TilePos,
    pub parts: SmallVec<[OccupantPart; 8]>,
}

impl Occupant {
    pub fn new(name: &str, origin: TilePos, parts: impl IntoIterator<Item = OccupantPart>) -> Self {
        Self {
            id: OccupantId::default(),
            name: name.to_string(),
            origin,
            parts: parts.into_iter().collect(),
        }
    }

    /// Tiles covered by at least one part (deduplicated, in part order)
    pub fn footprint(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.parts
            .iter()
            .enumerate()
            .filter(|(idx, part)| {
                !self.parts[..*idx].iter().any(|p| p.offset == part.offset)
            })
            .map(|(_, part)| self.origin.offset(part.offset.x, part.offset.y))
    }

    /// Index of the part that represents a tile: the obstacle part if there
    /// is one, otherwise the first part at that offset
    pub fn primary_part_at(&self, offset: IVec2) -> Option<usize> {
        let mut first = None;
        for (idx, part) in self.parts.iter().enumerate() {
            if part.offset != offset {
                continue;
            }
            if part.flags.contains(PartFlags::OBSTACLE) {
                return Some(idx);
            }
            first.get_or_insert(idx);
        }
        first
    }

    /// Combined flags of all parts at an offset, with the primary part's hp
    pub fn sample_at(&self, offset: IVec2) -> Option<OccupantSample> {
        let primary = self.primary_part_at(offset)?;
        let flags = self
            .parts
            .iter()
            .filter(|p| p.offset == offset)
            .fold(PartFlags::empty(), |acc, p| acc | p.flags);
        Some(OccupantSample::new(flags, self.parts[primary].hp))
    }
}

/// Reference from a tile to the occupant part covering it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OccupantRef {
    pub id: OccupantId,
    pub part: usize,
}

/// Registered occupants plus the tile index derived from their geometry
#[derive(Debug, Default)]
pub struct OccupantRegistry {
    occupants: BTreeMap<OccupantId, Occupant>,
    index: AHashMap<TilePos, SmallVec<[OccupantRef; 2]>>,
    next_id: u32,
    version: u64,
}

impl OccupantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every change to occupant geometry or part state
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// Register a new occupant, assigning a fresh id
    pub fn register(&mut self, mut occupant: Occupant) -> OccupantId {
        self.next_id += 1;
        occupant.id = OccupantId(self.next_id);
        let id = occupant.id;
        self.insert(occupant);
        id
    }

    /// Re-register an occupant that keeps its id (e.g. loaded with its chunk)
    pub fn insert(&mut self, occupant: Occupant) {
        let id = occupant.id;
        self.next_id = self.next_id.max(id.0);
        if self.occupants.contains_key(&id) {
            self.unindex(id);
        }
        self.occupants.insert(id, occupant);
        self.index_occupant(id);
        self.version += 1;
    }

    pub fn remove(&mut self, id: OccupantId) -> Option<Occupant> {
        if !self.occupants.contains_key(&id) {
            return None;
        }
        self.unindex(id);
        self.version += 1;
        self.occupants.remove(&id)
    }

    pub fn get(&self, id: OccupantId) -> Option<&Occupant> {
        self.occupants.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Occupant> {
        self.occupants.values()
    }

    /// Translate an occupant, updating the index incrementally
    pub fn move_by(&mut self, id: OccupantId, delta: IVec3) -> Result<(), MapError> {
        if !self.occupants.contains_key(&id) {
            return Err(MapError::UnknownOccupant(id));
        }
        self.unindex(id);
        if let Some(occupant) = self.occupants.get_mut(&id) {
            occupant.origin = TilePos(occupant.origin.0 + delta);
        }
        self.index_occupant(id);
        self.version += 1;
        Ok(())
    }

    /// Change one part's state (open a door, damage a panel...)
    pub fn update_part(
        &mut self,
        id: OccupantId,
        part: usize,
        edit: impl FnOnce(&mut OccupantPart),
    ) -> Result<(), MapError> {
        if !self.occupants.get(&id).is_some_and(|o| part < o.parts.len()) {
            return Err(MapError::UnknownOccupant(id));
        }
        // The edit may move the part or change which part is primary
        self.unindex(id);
        if let Some(target) = self
            .occupants
            .get_mut(&id)
            .and_then(|o| o.parts.get_mut(part))
        {
            edit(target);
        }
        self.index_occupant(id);
        self.version += 1;
        Ok(())
    }

    /// Part covering a tile; with overlapping occupants the latest indexed wins
    pub fn at(&self, pos: TilePos) -> Option<OccupantRef> {
        self.index.get(&pos).and_then(|refs| refs.last()).copied()
    }

    /// Cost-model view of the part covering a tile
    pub fn sample_at(&self, pos: TilePos) -> Option<(OccupantRef, OccupantSample)> {
        let occ_ref = self.at(pos)?;
        let occupant = self.occupants.get(&occ_ref.id)?;
        let offset = pos.xy() - occupant.origin.xy();
        occupant.sample_at(offset).map(|sample| (occ_ref, sample))
    }

    /// Detach every occupant anchored in `chunk` (for persisting with it)
    pub fn take_anchored(&mut self, chunk: ChunkPos) -> Vec<Occupant> {
        let ids: Vec<OccupantId> = self
            .occupants
            .values()
            .filter(|o| o.origin.chunk() == chunk)
            .map(|o| o.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Copies of occupants anchored in `chunk`, leaving them registered
    pub fn anchored(&self, chunk: ChunkPos) -> Vec<Occupant> {
        self.occupants
            .values()
            .filter(|o| o.origin.chunk() == chunk)
            .cloned()
            .collect()
    }

    /// Rebuild the whole tile index from occupant geometry
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        let ids: Vec<OccupantId> = self.occupants.keys().copied().collect();
        for id in ids {
            self.index_occupant(id);
        }
        self.version += 1;
        log::trace!("[CACHE] Occupant index rebuilt: {} tiles", self.index.len());
    }

    /// Number of indexed tiles
    pub fn indexed_tiles(&self) -> usize {
        self.index.len()
    }

    /// Every indexed tile with the part reported by [`Self::at`]
    pub fn index_iter(&self) -> impl Iterator<Item = (TilePos, OccupantRef)> + '_ {
        self.index
            .iter()
            .filter_map(|(pos, refs)| refs.last().map(|occ_ref| (*pos, *occ_ref)))
    }

    fn index_occupant(&mut self, id: OccupantId) {
        let Some(occupant) = self.occupants.get(&id) else {
            return;
        };
        for tile in occupant.footprint() {
            let offset = tile.xy() - occupant.origin.xy();
            let Some(part) = occupant.primary_part_at(offset) else {
                continue;
            };
            let refs = self.index.entry(tile).or_default();
            if let Some(previous) = refs.iter().find(|r| r.id != id) {
                log::warn!(
                    "Occupant {} overlaps occupant {} at {}",
                    id.0,
                    previous.id.0,
                    tile
                );
            }
            refs.retain(|r| r.id != id);
            refs.push(OccupantRef { id, part });
        }
    }

    fn unindex(&mut self, id: OccupantId) {
        let Some(occupant) = self.occupants.get(&id) else {
            return;
        };
        for tile in occupant.footprint() {
            if let Some(refs) = self.index.get_mut(&tile) {
                refs.retain(|r| r.id != id);
                if refs.is_empty() {
                    self.index.remove(&tile);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart(origin: TilePos) -> Occupant {
        Occupant::new(
            "cart",
            origin,
            [
                OccupantPart::new(IVec2::new(0, 0), PartFlags::AISLE, 20),
                OccupantPart::new(IVec2::new(1, 0), PartFlags::OBSTACLE | PartFlags::OPAQUE, 40),
                OccupantPart::new(IVec2::new(1, 0), PartFlags::INSIDE, 10),
            ],
        )
    }

    #[test]
    fn test_register_indexes_footprint() {
        let mut registry = OccupantRegistry::new();
        let id = registry.register(cart(TilePos::new(5, 5, 0)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.indexed_tiles(), 2);

        let (occ_ref, sample) = registry.sample_at(TilePos::new(6, 5, 0)).unwrap();
        assert_eq!(occ_ref.id, id);
        // Obstacle part is primary, flags are combined
        assert_eq!(occ_ref.part, 1);
        assert!(sample.is_obstacle());
        assert!(sample.flags.contains(PartFlags::INSIDE));
        assert_eq!(sample.hp, 40);

        assert!(registry.at(TilePos::new(7, 5, 0)).is_none());
    }

    #[test]
    fn test_move_updates_index_and_version() {
        let mut registry = OccupantRegistry::new();
        let id = registry.register(cart(TilePos::new(0, 0, 0)));
        let before = registry.version();

        registry.move_by(id, IVec3::new(3, 0, 0)).unwrap();
        assert!(registry.version() > before);
        assert!(registry.at(TilePos::new(0, 0, 0)).is_none());
        assert!(registry.at(TilePos::new(3, 0, 0)).is_some());
        assert!(registry.at(TilePos::new(4, 0, 0)).is_some());

        let missing = registry.move_by(OccupantId(99), IVec3::ZERO);
        assert!(matches!(missing, Err(MapError::UnknownOccupant(_))));
    }

    #[test]
    fn test_take_anchored_detaches() {
        let mut registry = OccupantRegistry::new();
        registry.register(cart(TilePos::new(1, 1, 0)));
        let far = registry.register(cart(TilePos::new(40, 1, 0)));

        let taken = registry.take_anchored(ChunkPos::new(0, 0, 0));
        assert_eq!(taken.len(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(far).is_some());
        assert!(registry.at(TilePos::new(1, 1, 0)).is_none());

        // Re-inserting keeps the id and does not collide with new ids
        let id = taken[0].id;
        registry.insert(taken.into_iter().next().unwrap());
        assert!(registry.get(id).is_some());
        let fresh = registry.register(cart(TilePos::new(80, 1, 0)));
        assert!(fresh.0 > far.0);
    }

    #[test]
    fn test_update_part_opens_door() {
        let mut registry = OccupantRegistry::new();
        let door = Occupant::new(
            "van",
            TilePos::new(0, 0, 0),
            [OccupantPart::new(
                IVec2::ZERO,
                PartFlags::OBSTACLE | PartFlags::OPENABLE | PartFlags::OPAQUE,
                30,
            )],
        );
        let id = registry.register(door);
        let (_, closed) = registry.sample_at(TilePos::new(0, 0, 0)).unwrap();
        assert!(closed.is_closed_door());

        registry
            .update_part(id, 0, |part| part.flags.insert(PartFlags::OPEN))
            .unwrap();
        let (_, open) = registry.sample_at(TilePos::new(0, 0, 0)).unwrap();
        assert!(!open.is_obstacle());
        assert!(!open.blocks_light());
    }

    #[test]
    fn test_rebuild_index_matches_incremental() {
        let mut registry = OccupantRegistry::new();
        registry.register(cart(TilePos::new(2, 2, 0)));
        registry.register(cart(TilePos::new(10, 2, 0)));
        let incremental = registry.indexed_tiles();

        registry.rebuild_index();
        assert_eq!(registry.indexed_tiles(), incremental);
    }

    #[test]
    fn test_overlapping_occupant_removal_keeps_other() {
        let mut registry = OccupantRegistry::new();
        let a = registry.register(cart(TilePos::new(5, 5, 0)));
        let b = registry.register(cart(TilePos::new(6, 5, 0)));
        let shared = TilePos::new(6, 5, 0);
        assert_eq!(registry.at(shared).unwrap().id, b);

        registry.remove(b);
        let (occ_ref, sample) = registry.sample_at(shared).unwrap();
        assert_eq!(occ_ref.id, a);
        assert!(sample.is_obstacle());
        assert!(registry.at(TilePos::new(7, 5, 0)).is_none());
        assert_eq!(registry.indexed_tiles(), 2);
    }

    #[test]
    fn test_overlapping_occupant_move_keeps_other() {
        let mut registry = OccupantRegistry::new();
        let a = registry.register(cart(TilePos::new(5, 5, 0)));
        let b = registry.register(cart(TilePos::new(6, 5, 0)));

        registry.move_by(b, IVec3::new(10, 0, 0)).unwrap();
        assert_eq!(registry.at(TilePos::new(6, 5, 0)).unwrap().id, a);
        assert_eq!(registry.at(TilePos::new(16, 5, 0)).unwrap().id, b);

        // Index stays in step with a full rebuild
        let incremental: Vec<_> = {
            let mut tiles: Vec<_> = registry.index_iter().collect();
            tiles.sort_by_key(|(pos, _)| (pos.x(), pos.y()));
            tiles
        };
        registry.rebuild_index();
        let mut rebuilt: Vec<_> = registry.index_iter().collect();
        rebuilt.sort_by_key(|(pos, _)| (pos.x(), pos.y()));
        assert_eq!(incremental, rebuilt);
    }
}
