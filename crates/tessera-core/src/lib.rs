//! Tessera core - the spatial world model
//!
//! - `world`: chunks, the paged chunk window, occupants and derived caches
//! - `pathfinding`: cost-aware best-first search over the window
//! - `config`: window, pathfinding and generation settings
//! - `error`: typed failures of map operations

pub mod config;
pub mod error;
pub mod pathfinding;
pub mod world;

pub use config::{GenerationConfig, MapConfig, PathfindingConfig, WindowConfig};
pub use error::{BufferError, GenerationError, MapError};
pub use pathfinding::{Path, PathOutcome, PathStep, Pathfinder, StepAction};
pub use world::{ChunkPos, Map, TilePos};
