//! Backing buffer - the key-value store chunks are paged in from and out to

use ahash::AHashMap;

use super::chunk::Chunk;
use super::coords::ChunkPos;
use crate::error::BufferError;

/// Storage for chunks outside the window, keyed by chunk coordinate
pub trait ChunkBuffer {
    /// Fetch a chunk, `Ok(None)` on a miss
    fn get(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, BufferError>;

    /// Store a chunk, replacing any previous entry
    fn put(&mut self, chunk: Chunk) -> Result<(), BufferError>;

    fn contains(&self, pos: ChunkPos) -> bool;
}

/// In-memory buffer holding chunks bincode-serialized and lz4-compressed
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    entries: AHashMap<ChunkPos, Vec<u8>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total compressed bytes held
    pub fn stored_bytes(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    fn encode(chunk: &Chunk) -> Result<Vec<u8>, BufferError> {
        let serialized =
            bincode_next::serde::encode_to_vec(chunk, bincode_next::config::standard()).map_err(
                |e| BufferError::Encode {
                    pos: chunk.pos,
                    reason: format!("{e:?}"),
                },
            )?;
        Ok(lz4_flex::compress_prepend_size(&serialized))
    }

    fn decode(pos: ChunkPos, bytes: &[u8]) -> Result<Chunk, BufferError> {
        let serialized = lz4_flex::decompress_size_prepended(bytes)?;
        let (chunk, _): (Chunk, _) =
            bincode_next::serde::decode_from_slice(&serialized, bincode_next::config::standard())
                .map_err(|e| BufferError::Decode {
                    pos,
                    reason: format!("{e:?}"),
                })?;
        Ok(chunk)
    }
}

impl ChunkBuffer for MemoryBuffer {
    fn get(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, BufferError> {
        let Some(bytes) = self.entries.get(&pos) else {
            return Ok(None);
        };
        let chunk = Self::decode(pos, bytes)?;
        log::trace!("[LOAD] Chunk {} from buffer ({} bytes)", pos, bytes.len());
        Ok(Some(chunk))
    }

    fn put(&mut self, chunk: Chunk) -> Result<(), BufferError> {
        let bytes = Self::encode(&chunk)?;
        log::trace!(
            "[SAVE] Chunk {} to buffer ({} bytes compressed, {} occupants)",
            chunk.pos,
            bytes.len(),
            chunk.occupants.len()
        );
        self.entries.insert(chunk.pos, bytes);
        Ok(())
    }

    fn contains(&self, pos: ChunkPos) -> bool {
        self.entries.contains_key(&pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::coords::{LocalPos, TilePos};
    use crate::world::occupants::{Occupant, OccupantPart};
    use glam::IVec2;
    use tessera_tiles::{FieldKind, FurnitureId, PartFlags, TerrainId};

    #[test]
    fn test_miss_returns_none() {
        let mut buffer = MemoryBuffer::new();
        assert!(buffer.get(ChunkPos::new(0, 0, 0)).unwrap().is_none());
        assert!(!buffer.contains(ChunkPos::new(0, 0, 0)));
    }

    #[test]
    fn test_put_get_preserves_content() {
        let pos = ChunkPos::new(-3, 4, -1);
        let mut chunk = Chunk::new(pos, TerrainId(2));
        {
            let mut tile = chunk.tile_mut(LocalPos::new(3, 7));
            tile.set_furniture(FurnitureId(5));
            tile.set_signage(Some("exit".to_string()));
            tile.fields_mut().add(FieldKind::Fire, 2);
        }
        chunk.turn_last_touched = 77;
        chunk.occupants.push(Occupant::new(
            "crate",
            TilePos::new(-30, 50, -1),
            [OccupantPart::new(IVec2::ZERO, PartFlags::OBSTACLE, 5)],
        ));

        let mut buffer = MemoryBuffer::new();
        buffer.put(chunk).unwrap();
        assert!(buffer.contains(pos));
        assert!(buffer.stored_bytes() > 0);

        let loaded = buffer.get(pos).unwrap().unwrap();
        assert_eq!(loaded.pos, pos);
        assert_eq!(loaded.turn_last_touched, 77);
        assert_eq!(loaded.furniture(LocalPos::new(3, 7)), FurnitureId(5));
        assert_eq!(loaded.signage(LocalPos::new(3, 7)), Some("exit"));
        assert!(loaded.fields(LocalPos::new(3, 7)).is_some());
        assert_eq!(loaded.occupants.len(), 1);
        // Not persisted
        assert!(!loaded.dirty);
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let pos = ChunkPos::new(0, 0, 0);
        let mut buffer = MemoryBuffer::new();
        buffer.entries.insert(pos, vec![1, 2, 3]);
        assert!(buffer.get(pos).is_err());
    }
}
