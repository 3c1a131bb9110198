//! Map configuration - window size, pathfinding costs and generation seed

use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// Top-level map configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub pathfinding: PathfindingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Size of the paged window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in chunks
    pub width: i32,
    /// Window height in chunks
    pub height: i32,
    /// Lowest resident z-level
    pub z_min: i32,
    /// Highest resident z-level
    pub z_max: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 11,
            height: 11,
            z_min: -1,
            z_max: 1,
        }
    }
}

impl WindowConfig {
    /// Number of resident z-levels
    pub fn depth(&self) -> i32 {
        self.z_max - self.z_min + 1
    }

    /// Total chunk slots
    pub fn slot_count(&self) -> usize {
        (self.width * self.height * self.depth()).max(0) as usize
    }

    /// Minimal shape a chunk store can index: at least one slot per layer
    pub fn validate(&self) -> Result<(), MapError> {
        if self.width < 1 || self.height < 1 {
            return Err(MapError::InvalidConfig(format!(
                "window needs at least one chunk per axis, got {}x{}",
                self.width, self.height
            )));
        }
        if self.z_min > self.z_max {
            return Err(MapError::InvalidConfig(format!(
                "z_min {} is above z_max {}",
                self.z_min, self.z_max
            )));
        }
        Ok(())
    }
}

/// Pathfinder tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Tiles added around the start/goal bounding box
    pub padding: i32,
    /// Multiplier on the distance-to-goal estimate. Values above 1 favor
    /// greedy, faster searches over strictly shortest paths.
    pub heuristic_weight: i32,
    /// Searches whose best open score exceeds this give up
    pub abandon_cost: i32,
    /// Extra cost to open a terrain door and step through
    pub door_cost: i32,
    /// Extra cost to open an occupant door and step through
    pub occupant_door_cost: i32,
    /// Turn budget numerator for bashing (`bash_turns / rating`)
    pub bash_turns: i32,
    /// Penalty added to every bash so obstacles are not trashed casually
    pub bash_penalty: i32,
    /// Added to `hp / strength` when bashing through an occupant
    pub occupant_bash_penalty: i32,
    /// Cost of a bash with the lowest non-zero rating
    pub desperate_bash_cost: i32,
    /// Cost assigned to a closed door that cannot be opened from here
    pub unopenable_cost: i32,
    /// Node expansions before the search stops
    pub max_expansions: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            padding: 8,
            heuristic_weight: 2,
            abandon_cost: 9999,
            door_cost: 4,
            occupant_door_cost: 10,
            bash_turns: 20,
            bash_penalty: 6,
            occupant_bash_penalty: 12,
            desperate_bash_cost: 1000,
            unopenable_cost: 10_000,
            max_expansions: 200_000,
        }
    }
}

/// Procedural generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub seed: u64,
    /// Frequency of the region-type noise (per region)
    pub region_frequency: f32,
    /// Frequency of the in-region detail noise (per tile)
    pub detail_frequency: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            region_frequency: 0.35,
            detail_frequency: 0.12,
        }
    }
}

impl MapConfig {
    /// Parse a RON configuration; missing sections use defaults
    pub fn from_ron(text: &str) -> Result<Self, MapError> {
        let config: MapConfig =
            ron::from_str(text).map_err(|e| MapError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the window or pathfinder cannot work with
    pub fn validate(&self) -> Result<(), MapError> {
        let w = &self.window;
        w.validate()?;
        if w.width < 3 || w.height < 3 {
            return Err(MapError::InvalidConfig(format!(
                "window must be at least 3x3 chunks, got {}x{}",
                w.width, w.height
            )));
        }
        let p = &self.pathfinding;
        if p.padding < 0 || p.heuristic_weight < 0 || p.bash_turns <= 0 {
            return Err(MapError::InvalidConfig(
                "padding, heuristic_weight and bash_turns must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
