//! Occupant part vocabulary used by the cost model

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Features of one occupant (vehicle) part covering a tile
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PartFlags: u16 {
        /// Blocks movement (walls, closed doors, boards)
        const OBSTACLE = 1 << 0;
        /// Walkway inside the occupant, cheap to cross
        const AISLE = 1 << 1;
        /// Door or hatch that can be opened
        const OPENABLE = 1 << 2;
        /// Openable part is currently open
        const OPEN = 1 << 3;
        /// Door that can only be opened from within the same occupant
        const OPENCLOSE_INSIDE = 1 << 4;
        /// Blocks light while intact and closed
        const OPAQUE = 1 << 5;
        /// Roofed; the tile counts as indoors
        const INSIDE = 1 << 6;
    }
}

/// What the cost model needs to know about the occupant part on a tile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OccupantSample {
    pub flags: PartFlags,
    pub hp: i32,
}

impl OccupantSample {
    pub fn new(flags: PartFlags, hp: i32) -> Self {
        Self { flags, hp }
    }

    /// An obstacle blocks movement unless it is an opened door
    pub fn is_obstacle(&self) -> bool {
        if self.flags.contains(PartFlags::OPENABLE) && self.flags.contains(PartFlags::OPEN) {
            return false;
        }
        self.flags.contains(PartFlags::OBSTACLE)
    }

    pub fn is_aisle(&self) -> bool {
        self.flags.contains(PartFlags::AISLE)
    }

    /// Closed door that could be opened
    pub fn is_closed_door(&self) -> bool {
        self.flags.contains(PartFlags::OPENABLE) && !self.flags.contains(PartFlags::OPEN)
    }

    /// Blocks light: opaque, intact, and not an opened door
    pub fn blocks_light(&self) -> bool {
        self.flags.contains(PartFlags::OPAQUE)
            && self.hp > 0
            && !(self.flags.contains(PartFlags::OPENABLE) && self.flags.contains(PartFlags::OPEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_door_is_not_obstacle() {
        let closed = OccupantSample::new(PartFlags::OBSTACLE | PartFlags::OPENABLE, 50);
        assert!(closed.is_obstacle());
        assert!(closed.is_closed_door());

        let open = OccupantSample::new(
            PartFlags::OBSTACLE | PartFlags::OPENABLE | PartFlags::OPEN,
            50,
        );
        assert!(!open.is_obstacle());
        assert!(!open.is_closed_door());
    }

    #[test]
    fn test_blocks_light() {
        let panel = OccupantSample::new(PartFlags::OBSTACLE | PartFlags::OPAQUE, 10);
        assert!(panel.blocks_light());

        let broken = OccupantSample::new(PartFlags::OBSTACLE | PartFlags::OPAQUE, 0);
        assert!(!broken.blocks_light());

        let open_door = OccupantSample::new(
            PartFlags::OPAQUE | PartFlags::OPENABLE | PartFlags::OPEN,
            10,
        );
        assert!(!open_door.blocks_light());
    }
}
