//! Error types for paging, generation and map mutation

use tessera_tiles::{FurnitureId, TerrainId};
use thiserror::Error;

use crate::world::{ChunkPos, OccupantId, TilePos};

/// Failures of map operations
#[derive(Debug, Error)]
pub enum MapError {
    /// Tile is outside the paged window; shift first
    #[error("tile {0} is outside the paged window")]
    OutOfWindow(TilePos),

    /// Neither the backing buffer nor the generator produced the chunk
    #[error("failed to produce chunk {pos}: {reason}")]
    GenerationFailure { pos: ChunkPos, reason: String },

    /// Slot was left empty by an earlier generation failure
    #[error("chunk {0} failed to load and is unavailable")]
    SlotFailed(ChunkPos),

    #[error("shift by ({dx}, {dy}) exceeds one chunk per call")]
    ShiftTooLarge { dx: i32, dy: i32 },

    #[error("z-level {z} is outside the window range {min}..={max}")]
    ZLevelOutOfRange { z: i32, min: i32, max: i32 },

    #[error("unknown occupant {0:?}")]
    UnknownOccupant(OccupantId),

    #[error("unknown terrain id {0:?}")]
    UnknownTerrain(TerrainId),

    #[error("unknown furniture id {0:?}")]
    UnknownFurniture(FurnitureId),

    #[error("invalid map configuration: {0}")]
    InvalidConfig(String),

    #[error("backing buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// Failures of the chunk backing buffer
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("failed to serialize chunk {pos}: {reason}")]
    Encode { pos: ChunkPos, reason: String },

    #[error("failed to deserialize chunk {pos}: {reason}")]
    Decode { pos: ChunkPos, reason: String },

    #[error("failed to decompress chunk: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),
}

/// Failures of procedural generation
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("terrain '{0}' required by the generator is not registered")]
    MissingTerrain(&'static str),

    #[error("furniture '{0}' required by the generator is not registered")]
    MissingFurniture(&'static str),

    #[error("generation failed: {0}")]
    Failed(String),
}
