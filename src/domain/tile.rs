/// Tile codes and classification tables.
///
/// Tile codes stay raw u8 so the grid matches the on-disk tileset; what
/// a code *means* (solid, one-way, grapple-forbidden) is data, loaded
/// from config.toml with defaults matching the built-in tileset. The
/// simulation only ever consults these tables.

use serde::Deserialize;

pub const T_EMPTY: u8 = 0;
pub const T_CRATE: u8 = 2; // pushable/pullable block
pub const T_POLE_TOP: u8 = 5; // swing-bar cap, grabbable in its bottom-left quarter
pub const T_LADDER_R: u8 = 6; // ladder occupying the right 8 px half-column
pub const T_LADDER_L: u8 = 7; // ladder occupying the left 8 px half-column
pub const T_ROPE_ITEM: u8 = 12; // tether pickup
pub const T_DOOR_TOP: u8 = 14; // upper half of the doorway
pub const T_DOOR: u8 = 15; // level exit trigger

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TileClasses {
    /// Fully solid tiles.
    pub solid: Vec<u8>,
    /// One-way platforms: solid from above only.
    pub down_solid: Vec<u8>,
    /// Tiles that destroy a rope on contact.
    pub no_grapple: Vec<u8>,
    /// Indexed by the tile above a cell: the tile code expected (and
    /// revealed) in the cell below it. Used to validate crate moves.
    pub fill_below: Vec<u8>,
}

impl Default for TileClasses {
    fn default() -> Self {
        TileClasses {
            solid: vec![1, 2, 3, 13],
            down_solid: vec![17],
            no_grapple: vec![13],
            fill_below: vec![
                0, 3, 2, 3, 4, 4, 6, 7, 0, 0, 0, 0, 1, 13, 15, 1, 16, 16, 16, 20, 1, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0,
            ],
        }
    }
}

impl TileClasses {
    pub fn is_solid(&self, t: u8) -> bool {
        self.solid.contains(&t)
    }

    pub fn is_down_solid(&self, t: u8) -> bool {
        self.down_solid.contains(&t)
    }

    pub fn is_no_grapple(&self, t: u8) -> bool {
        self.no_grapple.contains(&t)
    }

    /// Can a crate tumble into or out from under this tile?
    /// Solids block, and so do the fixtures that must not be buried.
    pub fn blocks_tumble(&self, t: u8) -> bool {
        self.is_solid(t) || matches!(t, T_POLE_TOP | T_ROPE_ITEM | T_DOOR_TOP | T_DOOR)
    }

    /// The tile code expected below `above`.
    pub fn predict_fill(&self, above: u8) -> u8 {
        self.fill_below.get(above as usize).copied().unwrap_or(0)
    }
}
