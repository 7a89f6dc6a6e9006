/// Tumbling blocks: crates in transit.
///
/// A pushed or pulled crate leaves the grid, slides one tile sideways
/// over 52 frames, then falls under the shared gravity rule until the
/// tile below it is solid, at which point it writes itself back into
/// the grid. A block that leaves the bottom of the play area is gone.

use crate::domain::motion::plus_gravity;
use crate::domain::tile::{TileClasses, T_CRATE};
use crate::sim::event::GameEvent;
use crate::sim::world::TilePlane;

const SLIDE_STEP: i32 = 5;
const SLIDE_DONE: i32 = 256;
const MAX_FALL: f64 = 8.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TumbleDir {
    SlidingLeft,
    SlidingRight,
    Falling,
    Done,
}

#[derive(Clone, Debug)]
pub struct TumblingBlock {
    /// Origin cell corner in pixels; during the slide the visual box is
    /// offset by progress/16 px.
    pub x: f64,
    pub y: f64,
    pub dir: TumbleDir,
    progress: i32,
    fall_vel: f64,
}

impl TumblingBlock {
    pub fn new(x: f64, y: f64, dir: TumbleDir) -> Self {
        TumblingBlock {
            x,
            y,
            dir,
            progress: 0,
            fall_vel: 0.0,
        }
    }

    pub fn done(&self) -> bool {
        self.dir == TumbleDir::Done
    }

    /// Collision box (x, y, w, h) while the block is in transit.
    pub fn hitbox(&self) -> Option<(f64, f64, f64, f64)> {
        let x = match self.dir {
            TumbleDir::SlidingRight => self.x + (self.progress / 16) as f64,
            TumbleDir::SlidingLeft => self.x - (self.progress / 16) as f64,
            TumbleDir::Falling => self.x,
            TumbleDir::Done => return None,
        };
        Some((x, self.y, 16.0, 16.0))
    }

    pub fn advance(
        &mut self,
        plane: &mut TilePlane,
        classes: &TileClasses,
        tick: u64,
        events: &mut Vec<GameEvent>,
    ) {
        match self.dir {
            TumbleDir::SlidingLeft | TumbleDir::SlidingRight => {
                self.progress += SLIDE_STEP;
                if self.progress >= SLIDE_DONE {
                    self.x += if self.dir == TumbleDir::SlidingRight {
                        16.0
                    } else {
                        -16.0
                    };
                    self.progress = 0;
                    self.fall_vel = 0.0;
                    self.dir = TumbleDir::Falling;
                }
            }
            TumbleDir::Falling => {
                let first_fall_frame = self.fall_vel == 0.0;
                self.fall_vel = plus_gravity(self.fall_vel, tick).min(MAX_FALL);
                self.y += self.fall_vel;
                let col = (self.x / 16.0).floor() as i32;
                let row = (self.y / 16.0).floor() as i32;
                let below = if row < 11 { plane.get(col, row + 1) } else { 0 };
                if row >= 12 {
                    // fell out of the play area
                    self.dir = TumbleDir::Done;
                } else if classes.is_solid(below) || classes.is_down_solid(below) {
                    events.push(GameEvent::BlockLand { col, row });
                    plane.set(col, row, T_CRATE);
                    self.dir = TumbleDir::Done;
                } else if first_fall_frame {
                    events.push(GameEvent::BlockFall);
                }
            }
            TumbleDir::Done => {}
        }
    }
}
