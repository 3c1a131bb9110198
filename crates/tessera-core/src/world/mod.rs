//! World module - chunked tile storage, paging and derived caches

mod buffer;
mod caches;
mod chunk;
mod chunk_store;
mod coords;
mod generation;
mod line;
mod map;
mod occupants;
mod region;

pub use buffer::{ChunkBuffer, MemoryBuffer};
pub use caches::{CLEAR, CacheStats, CachedView, DerivedCaches, SOLID, compute_outdoor, compute_transparency};
pub use chunk::{Chunk, TileMut, TileRef};
pub use chunk_store::{ChunkStore, Slot};
pub use coords::{CHUNK_AREA, CHUNK_SIZE, ChunkPos, LocalPos, REGION_SIZE, RegionPos, TilePos, WindowPos, rl_dist};
pub use generation::{ChunkGenerator, NoiseGenerator, generate_uniform};
pub use line::{line_to, line_variants, line_with_slope};
pub use map::{BashOutcome, Map};
pub use occupants::{Occupant, OccupantId, OccupantPart, OccupantRef, OccupantRegistry};
pub use region::{RegionIndex, RegionMap, RegionType, UniformRegions};
