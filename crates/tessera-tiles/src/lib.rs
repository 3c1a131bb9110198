//! Tile vocabulary for Tessera
//!
//! This crate provides the data types every map query is phrased in:
//! - Terrain and furniture definitions (TerrainDef, FurnitureDef, TileFlags, BashInfo)
//! - The tile registry that resolves names to dense ids (TileRegistry)
//! - Field kinds and per-tile field containers (FieldKind, FieldContainer)
//! - Occupant part flags (PartFlags, OccupantSample)
//! - The pure movement/bash cost model (CostModel)

mod cost;
mod field;
mod occupant;
mod registry;
mod terrain;

pub use cost::CostModel;
pub use field::{Field, FieldContainer, FieldKind, MAX_FIELD_DENSITY};
pub use occupant::{OccupantSample, PartFlags};
pub use registry::{RegistryError, TileRegistry};
pub use terrain::{BashInfo, FurnitureDef, FurnitureId, TerrainDef, TerrainId, TileFlags};
