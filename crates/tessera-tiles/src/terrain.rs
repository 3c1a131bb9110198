//! Terrain and furniture definitions

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Dense terrain id (load order index into the registry, 0 = null terrain)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

impl TerrainId {
    pub const NULL: TerrainId = TerrainId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense furniture id (load order index into the registry, 0 = no furniture)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FurnitureId(pub u16);

impl FurnitureId {
    pub const NULL: FurnitureId = FurnitureId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

bitflags! {
    /// Attribute flags shared by terrain and furniture
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TileFlags: u16 {
        /// Light passes through
        const TRANSPARENT = 1 << 0;
        /// Roofed; blocks outdoor classification for itself and its Moore neighborhood
        const INDOORS = 1 << 1;
        /// Door that can only be opened from an indoor tile
        const OPENCLOSE_INSIDE = 1 << 2;
        /// Level walking surface
        const FLAT = 1 << 3;
        /// Can be dug through
        const DIGGABLE = 1 << 4;
    }
}

/// Strength thresholds for smashing a tile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BashInfo {
    /// Below this strength bashing never succeeds
    pub str_min: i32,
    /// At or above this strength bashing always succeeds
    pub str_max: i32,
    /// Terrain left behind (terrain bash only; furniture is simply removed)
    #[serde(default)]
    pub result: Option<String>,
}

/// Definition of a terrain type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainDef {
    pub name: String,
    pub symbol: char,
    /// Base move cost (0 = impassable)
    pub move_cost: i32,
    #[serde(default)]
    pub flags: TileFlags,
    #[serde(default)]
    pub bash: Option<BashInfo>,
    /// Terrain this becomes when opened (doors, windows)
    #[serde(default)]
    pub open: Option<String>,
    /// Terrain this becomes when closed
    #[serde(default)]
    pub close: Option<String>,

    /// Resolved `open` target (filled in by the registry)
    #[serde(skip)]
    pub open_id: Option<TerrainId>,
    /// Resolved `close` target
    #[serde(skip)]
    pub close_id: Option<TerrainId>,
    /// Resolved `bash.result`
    #[serde(skip)]
    pub bash_result_id: Option<TerrainId>,
}

impl TerrainDef {
    pub fn new(name: &str, symbol: char, move_cost: i32, flags: TileFlags) -> Self {
        Self {
            name: name.to_string(),
            symbol,
            move_cost,
            flags,
            bash: None,
            open: None,
            close: None,
            open_id: None,
            close_id: None,
            bash_result_id: None,
        }
    }

    pub fn with_bash(mut self, str_min: i32, str_max: i32, result: &str) -> Self {
        self.bash = Some(BashInfo {
            str_min,
            str_max,
            result: Some(result.to_string()),
        });
        self
    }

    pub fn with_open(mut self, open: &str) -> Self {
        self.open = Some(open.to_string());
        self
    }

    pub fn with_close(mut self, close: &str) -> Self {
        self.close = Some(close.to_string());
        self
    }

    pub fn has_flag(&self, flag: TileFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Whether this terrain can be opened (resolved door target exists)
    pub fn is_openable(&self) -> bool {
        self.open_id.is_some()
    }
}

/// Definition of a furniture type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FurnitureDef {
    pub name: String,
    pub symbol: char,
    /// Move cost modifier added to terrain cost (negative = impassable)
    pub move_cost: i32,
    #[serde(default)]
    pub flags: TileFlags,
    #[serde(default)]
    pub bash: Option<BashInfo>,
}

impl FurnitureDef {
    pub fn new(name: &str, symbol: char, move_cost: i32, flags: TileFlags) -> Self {
        Self {
            name: name.to_string(),
            symbol,
            move_cost,
            flags,
            bash: None,
        }
    }

    pub fn with_bash(mut self, str_min: i32, str_max: i32) -> Self {
        self.bash = Some(BashInfo {
            str_min,
            str_max,
            result: None,
        });
        self
    }

    pub fn has_flag(&self, flag: TileFlags) -> bool {
        self.flags.contains(flag)
    }
}
