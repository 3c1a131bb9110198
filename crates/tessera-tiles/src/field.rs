//! Field kinds (smoke, fire, gas...) and the per-tile field container

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Highest density a field can reach
pub const MAX_FIELD_DENSITY: u8 = 3;

/// Kinds of fields that can occupy a tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Smoke,
    Fire,
    Blood,
    ToxicGas,
    Fog,
}

impl FieldKind {
    /// Light transmission multiplier at the given density (1.0 = no effect)
    pub fn transparency(self, density: u8) -> f32 {
        let table: [f32; 3] = match self {
            FieldKind::Smoke => [0.7, 0.4, 0.1],
            FieldKind::Fire => [1.0, 0.9, 0.7],
            FieldKind::Blood => [1.0, 1.0, 1.0],
            FieldKind::ToxicGas => [0.9, 0.7, 0.5],
            FieldKind::Fog => [0.8, 0.5, 0.2],
        };
        let idx = density.clamp(1, MAX_FIELD_DENSITY) as usize - 1;
        table[idx]
    }

    /// Turns for one density step to dissipate (None = permanent)
    pub fn half_life(self) -> Option<u64> {
        match self {
            FieldKind::Smoke => Some(50),
            FieldKind::Fire => Some(30),
            FieldKind::Blood => None,
            FieldKind::ToxicGas => Some(100),
            FieldKind::Fog => Some(200),
        }
    }
}

/// A single field entry on a tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub kind: FieldKind,
    /// 1..=MAX_FIELD_DENSITY
    pub density: u8,
    /// Turns since the last density step
    pub age: u64,
}

impl Field {
    pub fn new(kind: FieldKind, density: u8) -> Self {
        Self {
            kind,
            density: density.clamp(1, MAX_FIELD_DENSITY),
            age: 0,
        }
    }
}

/// Fields present on one tile (at most one per kind)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldContainer {
    fields: SmallVec<[Field; 2]>,
}

impl FieldContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn get(&self, kind: FieldKind) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == kind)
    }

    /// Add a field, or raise the density of an existing one of the same kind.
    /// Returns true if a new entry was created.
    pub fn add(&mut self, kind: FieldKind, density: u8) -> bool {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.kind == kind) {
            existing.density = existing
                .density
                .saturating_add(density)
                .min(MAX_FIELD_DENSITY);
            existing.age = 0;
            false
        } else {
            self.fields.push(Field::new(kind, density));
            true
        }
    }

    /// Remove a field kind. Returns true if it was present.
    pub fn remove(&mut self, kind: FieldKind) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.kind != kind);
        self.fields.len() != before
    }

    /// Combined light transmission multiplier of all fields
    pub fn transparency(&self) -> f32 {
        self.fields
            .iter()
            .map(|f| f.kind.transparency(f.density))
            .product()
    }

    /// Age all fields by `turns`, dropping density steps past each half-life.
    /// Fields that reach zero density are removed.
    pub fn age_by(&mut self, turns: u64) {
        for field in self.fields.iter_mut() {
            let Some(half_life) = field.kind.half_life() else {
                continue;
            };
            let total = field.age + turns;
            let steps = total / half_life;
            field.age = total % half_life;
            field.density = field.density.saturating_sub(steps.min(u8::MAX as u64) as u8);
        }
        self.fields.retain(|f| f.density > 0);
    }
}
