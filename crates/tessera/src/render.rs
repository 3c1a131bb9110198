//! ASCII view of the focus layer with an optional path overlay

use ahash::AHashMap;
use tessera_core::world::{CachedView, TilePos};
use tessera_core::{Path, StepAction};
use tessera_tiles::OccupantSample;

use crate::config::RenderConfig;

fn step_symbol(action: StepAction) -> char {
    match action {
        StepAction::Walk => '*',
        StepAction::OpenDoor => '/',
        StepAction::Bash => '!',
    }
}

fn occupant_symbol(sample: &OccupantSample) -> char {
    if sample.is_closed_door() {
        '+'
    } else if sample.is_obstacle() {
        'V'
    } else {
        '='
    }
}

/// Symbol for one tile: furniture over terrain, occupants over both
fn tile_symbol(view: &CachedView<'_>, config: &RenderConfig, pos: TilePos) -> char {
    let Ok(tile) = view.tile_at(pos) else {
        return '?';
    };
    if config.show_occupants
        && let Ok(Some((_, sample))) = view.occupant_at(pos)
    {
        return occupant_symbol(&sample);
    }

    let tiles = view.store().tiles();
    let symbol = if tile.furniture.is_null() {
        tiles.terrain(tile.terrain).symbol
    } else {
        tiles.furniture(tile.furniture).symbol
    };
    if config.shade_indoors && symbol == '.' && matches!(view.is_outdoor(pos), Ok(false)) {
        return ',';
    }
    symbol
}

/// Render the whole window on the focus layer, one line per tile row
pub fn render_window(
    view: &CachedView<'_>,
    config: &RenderConfig,
    start: Option<TilePos>,
    path: Option<&Path>,
) -> String {
    let store = view.store();
    let origin = store.origin_tile();
    let extent = store.tile_extent();
    let marks: AHashMap<TilePos, StepAction> = path
        .into_iter()
        .flat_map(|p| p.steps.iter())
        .map(|step| (step.pos, step.action))
        .collect();

    let mut out = String::with_capacity(((extent.x + 1) * extent.y) as usize);
    for y in 0..extent.y {
        for x in 0..extent.x {
            let pos = TilePos::new(origin.x() + x, origin.y() + y, view.focus_z());
            let symbol = if Some(pos) == start {
                '@'
            } else if let Some(&action) = marks.get(&pos) {
                step_symbol(action)
            } else {
                tile_symbol(view, config, pos)
            };
            out.push(symbol);
        }
        out.push('\n');
    }
    out
}
