//! Typed coordinates - absolute tiles, chunks, regions and window-local positions
//!
//! All conversions use Euclidean division so negative coordinates land in the
//! right chunk (`-1` lies in chunk `-1` at local `CHUNK_SIZE - 1`).

use std::fmt;

use glam::{IVec2, IVec3};
use serde::{Deserialize, Serialize};

/// Tiles per chunk side
pub const CHUNK_SIZE: i32 = 12;
/// Tiles per chunk
pub const CHUNK_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;
/// Chunks per region side; a region is generated as one unit
pub const REGION_SIZE: i32 = 2;

/// Chebyshev ("roguelike") distance between two points
#[inline]
pub fn rl_dist(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}

/// Absolute tile coordinate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos(pub IVec3);

impl TilePos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.0.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.0.y
    }

    #[inline]
    pub fn z(self) -> i32 {
        self.0.z
    }

    #[inline]
    pub fn xy(self) -> IVec2 {
        self.0.truncate()
    }

    /// Chunk containing this tile
    pub fn chunk(self) -> ChunkPos {
        ChunkPos::new(
            self.0.x.div_euclid(CHUNK_SIZE),
            self.0.y.div_euclid(CHUNK_SIZE),
            self.0.z,
        )
    }

    /// Position inside the containing chunk
    pub fn local(self) -> LocalPos {
        LocalPos::new(
            self.0.x.rem_euclid(CHUNK_SIZE) as usize,
            self.0.y.rem_euclid(CHUNK_SIZE) as usize,
        )
    }

    /// Same layer, shifted horizontally
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z)
    }

    pub fn rl_dist(self, other: TilePos) -> i32 {
        rl_dist(self.xy(), other.xy())
    }

    /// 8-adjacent on the same layer (a tile is not adjacent to itself)
    pub fn is_adjacent(self, other: TilePos) -> bool {
        self.0.z == other.0.z && self != other && self.rl_dist(other) <= 1
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

/// Absolute chunk coordinate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos(pub IVec3);

impl ChunkPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.0.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.0.y
    }

    #[inline]
    pub fn z(self) -> i32 {
        self.0.z
    }

    /// Top-left tile of this chunk
    pub fn origin_tile(self) -> TilePos {
        TilePos::new(self.0.x * CHUNK_SIZE, self.0.y * CHUNK_SIZE, self.0.z)
    }

    /// Absolute tile at a local offset inside this chunk
    pub fn tile(self, local: LocalPos) -> TilePos {
        self.origin_tile().offset(local.x as i32, local.y as i32)
    }

    /// Region this chunk is generated with
    pub fn region(self) -> RegionPos {
        RegionPos::new(
            self.0.x.div_euclid(REGION_SIZE),
            self.0.y.div_euclid(REGION_SIZE),
            self.0.z,
        )
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z)
    }

    pub fn with_z(self, z: i32) -> Self {
        Self::new(self.0.x, self.0.y, z)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0.x, self.0.y, self.0.z)
    }
}

/// Coarse region coordinate (REGION_SIZE x REGION_SIZE chunks)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPos(pub IVec3);

impl RegionPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    #[inline]
    pub fn z(self) -> i32 {
        self.0.z
    }

    /// Top-left chunk of the region
    pub fn first_chunk(self) -> ChunkPos {
        ChunkPos::new(self.0.x * REGION_SIZE, self.0.y * REGION_SIZE, self.0.z)
    }

    /// Every chunk of the region, row-major
    pub fn chunks(self) -> impl Iterator<Item = ChunkPos> {
        let first = self.first_chunk();
        (0..REGION_SIZE).flat_map(move |dy| (0..REGION_SIZE).map(move |dx| first.offset(dx, dy)))
    }

    /// Top-left tile of the region
    pub fn origin_tile(self) -> TilePos {
        self.first_chunk().origin_tile()
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.0.x, self.0.y, self.0.z)
    }
}

/// Tile offset inside a chunk (`0..CHUNK_SIZE` on both axes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
}

impl LocalPos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Row-major index into chunk arrays
    #[inline]
    pub fn index(self) -> usize {
        self.y * CHUNK_SIZE as usize + self.x
    }

    pub fn from_index(index: usize) -> Self {
        Self::new(index % CHUNK_SIZE as usize, index / CHUNK_SIZE as usize)
    }

    /// All local positions, row-major
    pub fn all() -> impl Iterator<Item = LocalPos> {
        (0..CHUNK_AREA).map(Self::from_index)
    }
}

/// Tile offset from the top-left tile of the window (focus layer)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowPos(pub IVec2);

impl WindowPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self(IVec2::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_tiles_use_euclidean_division() {
        let pos = TilePos::new(-1, -13, 0);
        assert_eq!(pos.chunk(), ChunkPos::new(-1, -2, 0));
        assert_eq!(pos.local(), LocalPos::new(CHUNK_SIZE as usize - 1, 11));
        assert_eq!(pos.chunk().tile(pos.local()), pos);
    }

    #[test]
    fn test_chunk_and_region() {
        let chunk = TilePos::new(25, 3, 1).chunk();
        assert_eq!(chunk, ChunkPos::new(2, 0, 1));
        assert_eq!(chunk.region(), RegionPos::new(1, 0, 1));
        assert_eq!(ChunkPos::new(-1, -1, 0).region(), RegionPos::new(-1, -1, 0));

        let chunks: Vec<_> = RegionPos::new(1, 0, 1).chunks().collect();
        assert_eq!(
            chunks,
            vec![
                ChunkPos::new(2, 0, 1),
                ChunkPos::new(3, 0, 1),
                ChunkPos::new(2, 1, 1),
                ChunkPos::new(3, 1, 1),
            ]
        );
    }

    #[test]
    fn test_rl_dist_and_adjacency() {
        let a = TilePos::new(0, 0, 0);
        assert_eq!(a.rl_dist(TilePos::new(3, -5, 0)), 5);
        assert!(a.is_adjacent(TilePos::new(1, 1, 0)));
        assert!(!a.is_adjacent(a));
        assert!(!a.is_adjacent(TilePos::new(2, 0, 0)));
        assert!(!a.is_adjacent(TilePos::new(1, 0, 1)));
    }

    #[test]
    fn test_local_index_roundtrip() {
        for local in LocalPos::all() {
            assert_eq!(LocalPos::from_index(local.index()), local);
        }
        assert_eq!(LocalPos::all().count(), CHUNK_AREA);
    }
}
