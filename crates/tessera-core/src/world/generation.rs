//! Region generation - uniform fills and noise-driven procedural regions

use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tessera_tiles::{FurnitureId, TerrainId, TileRegistry};

use super::chunk::Chunk;
use super::coords::{CHUNK_SIZE, LocalPos, REGION_SIZE, RegionPos, TilePos};
use super::region::RegionType;
use crate::error::GenerationError;

/// Tiles per region side
const REGION_TILES: i32 = CHUNK_SIZE * REGION_SIZE;

/// Produces every chunk of a region at once
pub trait ChunkGenerator {
    fn generate_region(
        &mut self,
        region: RegionPos,
        kind: RegionType,
        tiles: &TileRegistry,
    ) -> Result<Vec<Chunk>, GenerationError>;
}

/// Fill a whole region with one terrain (fast path for homogeneous regions)
pub fn generate_uniform(region: RegionPos, terrain: TerrainId) -> Vec<Chunk> {
    region.chunks().map(|pos| Chunk::new(pos, terrain)).collect()
}

/// Terrain and furniture ids the procedural generator draws from
struct Palette {
    grass: TerrainId,
    dirt: TerrainId,
    shrub: TerrainId,
    tree: TerrainId,
    pavement: TerrainId,
    floor: TerrainId,
    wall: TerrainId,
    door: TerrainId,
    back_door: TerrainId,
    window: TerrainId,
    table: FurnitureId,
    chair: FurnitureId,
    bed: FurnitureId,
    bookcase: FurnitureId,
}

impl Palette {
    fn resolve(tiles: &TileRegistry) -> Result<Self, GenerationError> {
        let ter = |name: &'static str| {
            tiles
                .terrain_id(name)
                .ok_or(GenerationError::MissingTerrain(name))
        };
        let furn = |name: &'static str| {
            tiles
                .furniture_id(name)
                .ok_or(GenerationError::MissingFurniture(name))
        };
        Ok(Self {
            grass: ter("t_grass")?,
            dirt: ter("t_dirt")?,
            shrub: ter("t_shrub")?,
            tree: ter("t_tree")?,
            pavement: ter("t_pavement")?,
            floor: ter("t_floor")?,
            wall: ter("t_wall")?,
            door: ter("t_door_c")?,
            back_door: ter("t_door_inside_c")?,
            window: ter("t_window")?,
            table: furn("f_table")?,
            chair: furn("f_chair")?,
            bed: furn("f_bed")?,
            bookcase: furn("f_bookcase")?,
        })
    }
}

/// Region-sized scratch grid, split into chunks when done
struct Canvas {
    origin: TilePos,
    terrain: Vec<TerrainId>,
    furniture: Vec<FurnitureId>,
}

impl Canvas {
    fn new(region: RegionPos, fill: TerrainId) -> Self {
        let area = (REGION_TILES * REGION_TILES) as usize;
        Self {
            origin: region.origin_tile(),
            terrain: vec![fill; area],
            furniture: vec![FurnitureId::NULL; area],
        }
    }

    fn index(x: i32, y: i32) -> usize {
        (y * REGION_TILES + x) as usize
    }

    fn set_terrain(&mut self, x: i32, y: i32, id: TerrainId) {
        self.terrain[Self::index(x, y)] = id;
    }

    fn set_furniture(&mut self, x: i32, y: i32, id: FurnitureId) {
        self.furniture[Self::index(x, y)] = id;
    }

    fn world(&self, x: i32, y: i32) -> TilePos {
        self.origin.offset(x, y)
    }

    fn into_chunks(self, region: RegionPos) -> Vec<Chunk> {
        region
            .chunks()
            .map(|pos| {
                let base = pos.origin_tile();
                let mut chunk = Chunk::new(pos, TerrainId::NULL);
                for local in LocalPos::all() {
                    let x = base.x() - self.origin.x() + local.x as i32;
                    let y = base.y() - self.origin.y() + local.y as i32;
                    let idx = Self::index(x, y);
                    let mut tile = chunk.tile_mut(local);
                    tile.set_terrain(self.terrain[idx]);
                    tile.set_furniture(self.furniture[idx]);
                }
                chunk.dirty = false;
                chunk
            })
            .collect()
    }
}

/// Procedural generator driven by simplex noise and a per-region seeded RNG
pub struct NoiseGenerator {
    seed: u64,
    detail: FastNoiseLite,
}

impl NoiseGenerator {
    pub fn new(seed: u64, detail_frequency: f32) -> Self {
        let mut detail = FastNoiseLite::with_seed((seed as i32).wrapping_add(1));
        detail.set_noise_type(Some(NoiseType::OpenSimplex2));
        detail.set_frequency(Some(detail_frequency));
        Self { seed, detail }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deterministic RNG for one region
    fn region_rng(&self, region: RegionPos) -> Xoshiro256StarStar {
        let p = region.0;
        let mixed = self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ ((p.x as u32 as u64) << 32 | p.y as u32 as u64)
            ^ (p.z as i64 as u64).rotate_left(17);
        Xoshiro256StarStar::seed_from_u64(mixed)
    }

    fn detail_at(&self, pos: TilePos) -> f32 {
        self.detail.get_noise_2d(pos.x() as f32, pos.y() as f32)
    }

    fn fill_field(&self, canvas: &mut Canvas, palette: &Palette) {
        for y in 0..REGION_TILES {
            for x in 0..REGION_TILES {
                let n = self.detail_at(canvas.world(x, y));
                if n > 0.55 {
                    canvas.set_terrain(x, y, palette.shrub);
                } else if n < -0.6 {
                    canvas.set_terrain(x, y, palette.dirt);
                }
            }
        }
    }

    fn fill_forest(&self, canvas: &mut Canvas, palette: &Palette, rng: &mut Xoshiro256StarStar) {
        for y in 0..REGION_TILES {
            for x in 0..REGION_TILES {
                let n = self.detail_at(canvas.world(x, y));
                if n > 0.3 || rng.gen_bool(0.12) {
                    canvas.set_terrain(x, y, palette.tree);
                } else if n > 0.0 && rng.gen_bool(0.2) {
                    canvas.set_terrain(x, y, palette.shrub);
                }
            }
        }
    }

    fn fill_road(&self, canvas: &mut Canvas, palette: &Palette, rng: &mut Xoshiro256StarStar) {
        let horizontal = rng.gen_bool(0.5);
        let half = REGION_TILES / 2;
        for a in 0..REGION_TILES {
            for b in (half - 4)..(half + 4) {
                let (x, y) = if horizontal { (a, b) } else { (b, a) };
                canvas.set_terrain(x, y, palette.pavement);
            }
        }
    }

    fn fill_house(&self, canvas: &mut Canvas, palette: &Palette, rng: &mut Xoshiro256StarStar) {
        let left = rng.gen_range(2..=5);
        let top = rng.gen_range(2..=5);
        let right = REGION_TILES - 1 - rng.gen_range(2..=5);
        let bottom = REGION_TILES - 1 - rng.gen_range(2..=5);

        for y in top..=bottom {
            for x in left..=right {
                let edge = x == left || x == right || y == top || y == bottom;
                let id = if edge { palette.wall } else { palette.floor };
                canvas.set_terrain(x, y, id);
            }
        }

        // Front door on the south wall; a back door that only opens from inside on the north wall
        let door_x = rng.gen_range(left + 1..right);
        canvas.set_terrain(door_x, bottom, palette.door);
        let back_x = rng.gen_range(left + 1..right);
        canvas.set_terrain(back_x, top, palette.back_door);

        let mid_y = (top + bottom) / 2;
        canvas.set_terrain(left, mid_y, palette.window);
        canvas.set_terrain(right, mid_y, palette.window);

        // Furniture against the walls keeps the middle walkable
        canvas.set_furniture(left + 1, top + 1, palette.bed);
        for x in (right - 3).max(left + 2)..right {
            canvas.set_furniture(x, top + 1, palette.bookcase);
        }
        let table_x = (left + right) / 2;
        canvas.set_furniture(table_x, mid_y, palette.table);
        canvas.set_furniture(table_x - 1, mid_y, palette.chair);
        canvas.set_furniture(table_x + 1, mid_y, palette.chair);
    }
}

impl ChunkGenerator for NoiseGenerator {
    fn generate_region(
        &mut self,
        region: RegionPos,
        kind: RegionType,
        tiles: &TileRegistry,
    ) -> Result<Vec<Chunk>, GenerationError> {
        if let Some(name) = kind.uniform_fill() {
            let fill = tiles
                .terrain_id(name)
                .ok_or(GenerationError::MissingTerrain(name))?;
            return Ok(generate_uniform(region, fill));
        }

        let palette = Palette::resolve(tiles)?;
        let mut rng = self.region_rng(region);
        let mut canvas = Canvas::new(region, palette.grass);

        match kind {
            RegionType::Field => self.fill_field(&mut canvas, &palette),
            RegionType::Forest => self.fill_forest(&mut canvas, &palette, &mut rng),
            RegionType::Road => self.fill_road(&mut canvas, &palette, &mut rng),
            RegionType::House => self.fill_house(&mut canvas, &palette, &mut rng),
            RegionType::EmptyRock | RegionType::OpenAir => {}
        }

        log::trace!("[GEN] Region {} laid out as {:?}", region, kind);
        Ok(canvas.into_chunks(region))
    }
}
