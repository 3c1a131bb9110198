//! Region index - coarse region types that drive generation-on-miss

use ahash::AHashMap;
use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::{Deserialize, Serialize};

use super::coords::RegionPos;

/// Coarse classification of a region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionType {
    /// Solid rock (underground default)
    EmptyRock,
    /// Nothing but air (above-ground default)
    OpenAir,
    Field,
    Forest,
    House,
    Road,
}

impl RegionType {
    /// Terrain filling a homogeneous region, None when it needs procedural generation
    pub fn uniform_fill(self) -> Option<&'static str> {
        match self {
            RegionType::EmptyRock => Some("t_rock"),
            RegionType::OpenAir => Some("t_open_air"),
            _ => None,
        }
    }

    pub fn is_uniform(self) -> bool {
        self.uniform_fill().is_some()
    }
}

/// Maps a region coordinate to its type
pub trait RegionIndex {
    fn region_type(&self, pos: RegionPos) -> RegionType;
}

/// Noise-driven region layout with explicit overrides.
///
/// Below ground is rock, above ground is air, and the surface (z = 0) picks
/// field, forest, road or house regions from a low-frequency noise.
pub struct RegionMap {
    noise: FastNoiseLite,
    overrides: AHashMap<RegionPos, RegionType>,
}

impl RegionMap {
    pub fn new(seed: u64, frequency: f32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        Self {
            noise,
            overrides: AHashMap::new(),
        }
    }

    /// Force a region type, regardless of z or noise
    pub fn set_override(&mut self, pos: RegionPos, kind: RegionType) {
        self.overrides.insert(pos, kind);
    }

    pub fn with_override(mut self, pos: RegionPos, kind: RegionType) -> Self {
        self.set_override(pos, kind);
        self
    }

    fn surface_type(&self, pos: RegionPos) -> RegionType {
        let value = self.noise.get_noise_2d(pos.0.x as f32, pos.0.y as f32);
        match value {
            v if v < -0.35 => RegionType::Forest,
            v if v < 0.25 => RegionType::Field,
            v if v < 0.45 => RegionType::Road,
            _ => RegionType::House,
        }
    }
}

impl RegionIndex for RegionMap {
    fn region_type(&self, pos: RegionPos) -> RegionType {
        if let Some(kind) = self.overrides.get(&pos) {
            return *kind;
        }
        match pos.z() {
            z if z < 0 => RegionType::EmptyRock,
            z if z > 0 => RegionType::OpenAir,
            _ => self.surface_type(pos),
        }
    }
}

/// Region index returning one type everywhere (tests, scratch maps)
#[derive(Clone, Copy, Debug)]
pub struct UniformRegions(pub RegionType);

impl RegionIndex for UniformRegions {
    fn region_type(&self, _pos: RegionPos) -> RegionType {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_above_and_below_are_uniform() {
        let regions = RegionMap::new(1, 0.35);
        assert_eq!(regions.region_type(RegionPos::new(4, 4, -1)), RegionType::EmptyRock);
        assert_eq!(regions.region_type(RegionPos::new(4, 4, 2)), RegionType::OpenAir);
        assert!(!regions.region_type(RegionPos::new(4, 4, 0)).is_uniform());
    }

    #[test]
    fn test_override_wins() {
        let pos = RegionPos::new(0, 0, 0);
        let regions = RegionMap::new(1, 0.35).with_override(pos, RegionType::House);
        assert_eq!(regions.region_type(pos), RegionType::House);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let a = RegionMap::new(99, 0.35);
        let b = RegionMap::new(99, 0.35);
        for x in -5..5 {
            for y in -5..5 {
                let pos = RegionPos::new(x, y, 0);
                assert_eq!(a.region_type(pos), b.region_type(pos));
            }
        }
    }

    #[test]
    fn test_uniform_fill() {
        assert_eq!(RegionType::EmptyRock.uniform_fill(), Some("t_rock"));
        assert_eq!(RegionType::House.uniform_fill(), None);
    }
}
