/// World state: the tile plane plus everything that moves on it.
///
/// The plane is 12 visible rows tall (ROWS) and as many 16 px columns
/// wide as the level needs. Reads outside the stored area return empty,
/// which makes the edge handling in the collision and rope code uniform.

use crate::domain::block::TumblingBlock;
use crate::domain::player::Player;
use crate::domain::tile::{
    TileClasses, T_CRATE, T_DOOR, T_DOOR_TOP, T_LADDER_L, T_LADDER_R, T_POLE_TOP, T_ROPE_ITEM,
};

pub const ROWS: usize = 12;

/// Tile size in pixels.
pub const TILE: i32 = 16;

#[derive(Clone, Debug)]
pub struct TilePlane {
    cols: Vec<[u8; ROWS]>,
}

impl TilePlane {
    pub fn new(width: usize) -> Self {
        TilePlane {
            cols: vec![[0; ROWS]; width],
        }
    }

    /// Build a plane from ASCII rows, top row first. Rows may be fewer
    /// than ROWS (the rest stay empty) and may have ragged lengths.
    ///
    ///   ' ' empty   '#' solid 1    'B' crate      '=' solid 3
    ///   'T' pole top  '>' ladder-R  '<' ladder-L  '%' no-grapple solid
    ///   '*' tether item  'd'/'D' door top/bottom  '-' one-way platform
    pub fn from_rows(rows: &[&str]) -> Self {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut plane = TilePlane::new(width);
        for (y, row) in rows.iter().enumerate().take(ROWS) {
            for (x, ch) in row.chars().enumerate() {
                let t = match ch {
                    ' ' => 0,
                    '#' => 1,
                    'B' => T_CRATE,
                    '=' => 3,
                    'T' => T_POLE_TOP,
                    '>' => T_LADDER_R,
                    '<' => T_LADDER_L,
                    '*' => T_ROPE_ITEM,
                    '%' => 13,
                    'd' => T_DOOR_TOP,
                    'D' => T_DOOR,
                    '-' => 17,
                    c => c.to_digit(10).map(|d| d as u8).unwrap_or(0),
                };
                plane.cols[x][y] = t;
            }
        }
        plane
    }

    pub fn width(&self) -> usize {
        self.cols.len()
    }

    /// Tile at (col, row), or empty when out of the stored area.
    pub fn get(&self, col: i32, row: i32) -> u8 {
        if col < 0 || row < 0 || row >= ROWS as i32 {
            return 0;
        }
        self.cols
            .get(col as usize)
            .map(|c| c[row as usize])
            .unwrap_or(0)
    }

    /// Write a tile, growing the plane rightward if needed.
    pub fn set(&mut self, col: i32, row: i32, t: u8) {
        if col < 0 || row < 0 || row >= ROWS as i32 {
            return;
        }
        let col = col as usize;
        if col >= self.cols.len() {
            self.cols.resize(col + 1, [0; ROWS]);
        }
        self.cols[col][row as usize] = t;
    }
}

pub struct World {
    pub plane: TilePlane,
    pub classes: TileClasses,
    pub player: Player,
    pub blocks: Vec<TumblingBlock>,
    /// Frame counter; its parity drives the alternating gravity step.
    pub tick: u64,
}

impl World {
    pub fn new(plane: TilePlane, classes: TileClasses) -> Self {
        World {
            plane,
            classes,
            player: Player::new(),
            blocks: Vec::new(),
            tick: 0,
        }
    }

    /// Stand the player on the floor of the given cell.
    pub fn spawn_at(&mut self, col: i32, row: i32) {
        self.player.pos.x = (col * TILE + 8) as f64;
        self.player.pos.y = (row * TILE + 11) as f64;
    }

    pub fn door_cell(&self) -> Option<(i32, i32)> {
        for col in 0..self.plane.width() as i32 {
            for row in 0..ROWS as i32 {
                if self.plane.get(col, row) == T_DOOR {
                    return Some((col, row));
                }
            }
        }
        None
    }
}
