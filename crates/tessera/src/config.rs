//! Driver configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `tessera.ron` file (if exists)
//! 3. Environment variables prefixed with `TESSERA_`
//!
//! Example environment variable: `TESSERA_MAP__PATHFINDING__DOOR_COST=6`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tessera_core::MapConfig;

/// Everything the driver needs besides CLI flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

/// ASCII output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Draw occupants over terrain
    pub show_occupants: bool,
    /// Draw sheltered ground as ',' instead of '.'
    pub shade_indoors: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_occupants: true,
            shade_indoors: false,
        }
    }
}

impl DriverConfig {
    /// Load configuration from `name` (without extension) plus the environment
    pub fn load(name: &str) -> Result<Self> {
        let defaults = MapConfig::default();
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("map.window.width", i64::from(defaults.window.width))?
            .set_default("map.window.height", i64::from(defaults.window.height))?
            .set_default("map.window.z_min", i64::from(defaults.window.z_min))?
            .set_default("map.window.z_max", i64::from(defaults.window.z_max))?
            .set_default("map.generation.seed", defaults.generation.seed)?
            .set_default("render.show_occupants", true)?
            .set_default("render.shade_indoors", false)?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name(name)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (TESSERA_MAP__WINDOW__WIDTH, etc.)
            .add_source(Environment::with_prefix("TESSERA").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        let loaded: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        loaded
            .map
            .validate()
            .context("Invalid map configuration")?;
        Ok(loaded)
    }
}
