//! Tile registry - dense ids for terrain and furniture, loadable from RON

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::terrain::{FurnitureDef, FurnitureId, TerrainDef, TerrainId, TileFlags};

/// Errors raised while building a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to parse tile definitions: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("first {kind} definition must be '{expected}', found '{found}'")]
    MissingNull {
        kind: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("duplicate {kind} definition '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[error("'{owner}' references unknown terrain '{target}'")]
    UnknownReference { owner: String, target: String },
    #[error("too many {0} definitions for a u16 id")]
    TooMany(&'static str),
}

/// On-disk layout of a tile definition file
#[derive(Debug, Serialize, Deserialize)]
struct TileDefinitions {
    terrain: Vec<TerrainDef>,
    #[serde(default)]
    furniture: Vec<FurnitureDef>,
}

/// All terrain and furniture definitions, indexed by load order
#[derive(Debug, Clone)]
pub struct TileRegistry {
    terrain: Vec<TerrainDef>,
    furniture: Vec<FurnitureDef>,
    terrain_by_name: AHashMap<String, TerrainId>,
    furniture_by_name: AHashMap<String, FurnitureId>,
}

impl TileRegistry {
    /// Build a registry from definition lists.
    ///
    /// The first terrain must be `t_null` and the first furniture `f_null`.
    /// Name references (`open`, `close`, `bash.result`) are resolved here.
    pub fn from_defs(
        mut terrain: Vec<TerrainDef>,
        mut furniture: Vec<FurnitureDef>,
    ) -> Result<Self, RegistryError> {
        if furniture.is_empty() {
            furniture.push(FurnitureDef::new("f_null", ' ', 0, TileFlags::TRANSPARENT));
        }
        check_null("terrain", "t_null", terrain.first().map(|t| t.name.as_str()))?;
        check_null("furniture", "f_null", furniture.first().map(|f| f.name.as_str()))?;

        if terrain.len() > u16::MAX as usize {
            return Err(RegistryError::TooMany("terrain"));
        }
        if furniture.len() > u16::MAX as usize {
            return Err(RegistryError::TooMany("furniture"));
        }

        let mut terrain_by_name = AHashMap::with_capacity(terrain.len());
        for (idx, def) in terrain.iter().enumerate() {
            if terrain_by_name
                .insert(def.name.clone(), TerrainId(idx as u16))
                .is_some()
            {
                return Err(RegistryError::Duplicate {
                    kind: "terrain",
                    name: def.name.clone(),
                });
            }
        }

        let mut furniture_by_name = AHashMap::with_capacity(furniture.len());
        for (idx, def) in furniture.iter().enumerate() {
            if furniture_by_name
                .insert(def.name.clone(), FurnitureId(idx as u16))
                .is_some()
            {
                return Err(RegistryError::Duplicate {
                    kind: "furniture",
                    name: def.name.clone(),
                });
            }
        }

        let resolve = |owner: &str, target: &Option<String>| -> Result<Option<TerrainId>, RegistryError> {
            match target {
                None => Ok(None),
                Some(name) => terrain_by_name
                    .get(name)
                    .copied()
                    .map(Some)
                    .ok_or_else(|| RegistryError::UnknownReference {
                        owner: owner.to_string(),
                        target: name.clone(),
                    }),
            }
        };

        for def in terrain.iter_mut() {
            def.open_id = resolve(&def.name, &def.open)?;
            def.close_id = resolve(&def.name, &def.close)?;
            let bash_result = def.bash.as_ref().and_then(|b| b.result.clone());
            def.bash_result_id = resolve(&def.name, &bash_result)?;
        }

        log::debug!(
            "Tile registry built: {} terrain, {} furniture",
            terrain.len(),
            furniture.len()
        );

        Ok(Self {
            terrain,
            furniture,
            terrain_by_name,
            furniture_by_name,
        })
    }

    /// Parse a RON definition file
    pub fn from_ron(text: &str) -> Result<Self, RegistryError> {
        let defs: TileDefinitions = ron::from_str(text)?;
        Self::from_defs(defs.terrain, defs.furniture)
    }

    /// Builtin definitions covering natural terrain, buildings and doors
    pub fn builtin() -> Self {
        let open = TileFlags::TRANSPARENT | TileFlags::FLAT;
        let terrain = vec![
            TerrainDef::new("t_null", ' ', 0, TileFlags::empty()),
            TerrainDef::new("t_open_air", ' ', 2, TileFlags::TRANSPARENT),
            TerrainDef::new("t_rock", '#', 0, TileFlags::empty()).with_bash(100, 400, "t_rock_floor"),
            TerrainDef::new("t_rock_floor", '.', 2, open),
            TerrainDef::new("t_dirt", '.', 2, open | TileFlags::DIGGABLE),
            TerrainDef::new("t_grass", '.', 2, open | TileFlags::DIGGABLE),
            TerrainDef::new("t_pavement", '.', 2, open),
            TerrainDef::new("t_floor", '.', 2, open | TileFlags::INDOORS),
            TerrainDef::new("t_wall", '|', 0, TileFlags::empty()).with_bash(30, 210, "t_rubble"),
            TerrainDef::new("t_wall_wood", '#', 0, TileFlags::empty()).with_bash(12, 80, "t_rubble"),
            TerrainDef::new("t_door_c", '+', 0, TileFlags::FLAT)
                .with_open("t_door_o")
                .with_bash(8, 80, "t_door_b"),
            TerrainDef::new("t_door_o", '\'', 2, open).with_close("t_door_c"),
            TerrainDef::new("t_door_b", '&', 2, open),
            TerrainDef::new("t_door_locked", '+', 0, TileFlags::FLAT).with_bash(8, 80, "t_door_b"),
            TerrainDef::new("t_door_inside_c", '+', 0, TileFlags::FLAT | TileFlags::OPENCLOSE_INSIDE)
                .with_open("t_door_inside_o")
                .with_bash(8, 80, "t_door_b"),
            TerrainDef::new("t_door_inside_o", '\'', 2, open | TileFlags::OPENCLOSE_INSIDE)
                .with_close("t_door_inside_c"),
            TerrainDef::new("t_window", '"', 0, TileFlags::TRANSPARENT).with_bash(3, 6, "t_window_frame"),
            TerrainDef::new("t_window_frame", '0', 8, TileFlags::TRANSPARENT),
            TerrainDef::new("t_tree", '7', 0, TileFlags::empty()),
            TerrainDef::new("t_shrub", '#', 8, TileFlags::TRANSPARENT).with_bash(4, 60, "t_dirt"),
            TerrainDef::new("t_rubble", '^', 4, TileFlags::TRANSPARENT),
            TerrainDef::new("t_water_sh", '~', 5, TileFlags::TRANSPARENT),
        ];

        let furniture_flags = TileFlags::TRANSPARENT;
        let furniture = vec![
            FurnitureDef::new("f_null", ' ', 0, furniture_flags),
            FurnitureDef::new("f_table", '#', 2, furniture_flags).with_bash(12, 50),
            FurnitureDef::new("f_chair", '#', 1, furniture_flags).with_bash(12, 30),
            FurnitureDef::new("f_bed", '#', 3, furniture_flags).with_bash(12, 40),
            FurnitureDef::new("f_counter", '#', 2, furniture_flags).with_bash(12, 40),
            FurnitureDef::new("f_bookcase", '{', -1, TileFlags::empty()).with_bash(6, 40),
            FurnitureDef::new("f_boulder_large", 'O', -1, TileFlags::TRANSPARENT).with_bash(16, 32),
        ];

        match Self::from_defs(terrain, furniture) {
            Ok(registry) => registry,
            // Builtin table is static; a failure here is a programming error
            Err(e) => panic!("builtin tile table is invalid: {e}"),
        }
    }

    /// Terrain definition (unknown ids resolve to the null terrain)
    pub fn terrain(&self, id: TerrainId) -> &TerrainDef {
        self.terrain.get(id.index()).unwrap_or(&self.terrain[0])
    }

    /// Furniture definition (unknown ids resolve to no furniture)
    pub fn furniture(&self, id: FurnitureId) -> &FurnitureDef {
        self.furniture.get(id.index()).unwrap_or(&self.furniture[0])
    }

    pub fn terrain_id(&self, name: &str) -> Option<TerrainId> {
        self.terrain_by_name.get(name).copied()
    }

    pub fn furniture_id(&self, name: &str) -> Option<FurnitureId> {
        self.furniture_by_name.get(name).copied()
    }

    /// Terrain produced by opening `id`, if it is a door
    pub fn open_door(&self, id: TerrainId) -> Option<TerrainId> {
        self.terrain(id).open_id
    }

    /// Terrain produced by closing `id`
    pub fn close_door(&self, id: TerrainId) -> Option<TerrainId> {
        self.terrain(id).close_id
    }

    /// Terrain left after bashing `id`
    pub fn bash_result(&self, id: TerrainId) -> Option<TerrainId> {
        self.terrain(id).bash_result_id
    }

    pub fn terrain_count(&self) -> usize {
        self.terrain.len()
    }

    pub fn furniture_count(&self) -> usize {
        self.furniture.len()
    }
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_null(kind: &'static str, expected: &'static str, found: Option<&str>) -> Result<(), RegistryError> {
    match found {
        Some(name) if name == expected => Ok(()),
        other => Err(RegistryError::MissingNull {
            kind,
            expected,
            found: other.unwrap_or("<none>").to_string(),
        }),
    }
}
