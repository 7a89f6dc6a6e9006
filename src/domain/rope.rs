/// Rope solver.
///
/// A launched rope head flies ballistically, constrained each frame to
/// the current cable length so it can never overshoot its own tether.
/// When the head enters a grabbable tile it anchors there; afterwards
/// the cable can wrap: whenever the head or the ball crosses into a new
/// tile, the straight-line tile path between them is retraced and the
/// first grabbable cell on it becomes the new anchor, with 8 px of
/// slack folded out of the length.
///
/// Half-tile fixtures (pole tops, ladder halves) are only grabbable in
/// the 8 px half they actually occupy, tested by half-tile parity.

use log::debug;

use crate::domain::motion::{clip_vel_to_cable, plus_gravity, Vec2};
use crate::domain::tile::{TileClasses, T_LADDER_L, T_LADDER_R, T_POLE_TOP};
use crate::sim::world::TilePlane;

pub const MIN_CABLELEN: f64 = 0.0;

/// Length surrendered when the cable bends around a wrap cell.
const WRAP_SLACK: f64 = 8.0;

/// Wrap retrace gives up beyond this many cells.
const WRAP_TRACE_CAP: usize = 100;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RopePhase {
    Flying { vel: Vec2 },
    Anchored,
}

/// What a frame of rope motion produced. `Lost` means the owner must
/// drop the rope this same frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RopeUpdate {
    Flying,
    Anchored,
    Lost,
}

#[derive(Clone, Debug)]
pub struct Rope {
    /// Head (anchor once anchored) position in pixels.
    pub pos: Vec2,
    pub length: f64,
    pub max_len: f64,
    pub phase: RopePhase,
    wrap_key: u8,
}

// half-tile occupancy of the grabbable fixtures
fn left_half(t: u8) -> bool {
    matches!(t, T_POLE_TOP | T_LADDER_L)
}
fn right_half(t: u8) -> bool {
    t == T_LADDER_R
}
fn bottom_half(t: u8) -> bool {
    t == T_POLE_TOP
}

impl Rope {
    pub fn launch(max_len: f64, pos: Vec2, vel: Vec2) -> Self {
        Rope {
            pos,
            length: max_len,
            max_len,
            phase: RopePhase::Flying { vel },
            wrap_key: Self::wrap_key_for(pos, pos),
        }
    }

    /// An already-anchored cable, used when latching onto a swing bar.
    pub fn anchored(pos: Vec2, length: f64, max_len: f64) -> Self {
        Rope {
            pos,
            length,
            max_len,
            phase: RopePhase::Anchored,
            wrap_key: Self::wrap_key_for(pos, pos),
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.phase == RopePhase::Anchored
    }

    pub fn is_flying(&self) -> bool {
        !self.is_anchored()
    }

    // low bits of both endpoint tile coordinates; a change means one of
    // them crossed a tile boundary and the wrap path needs retracing
    fn wrap_key_for(ball: Vec2, anchor: Vec2) -> u8 {
        ((((ball.x / 16.0).floor() as i32 & 3) << 6)
            | (((ball.y / 16.0).floor() as i32 & 3) << 4)
            | (((anchor.x / 16.0).floor() as i32 & 3) << 2)
            | ((anchor.y / 16.0).floor() as i32 & 3)) as u8
    }

    /// One frame of flight for the rope head. `ball` is the tethered
    /// end's position from the previous frame.
    pub fn update(
        &mut self,
        plane: &TilePlane,
        classes: &TileClasses,
        ball: Vec2,
        tick: u64,
    ) -> RopeUpdate {
        let mut vel = match self.phase {
            RopePhase::Anchored => return RopeUpdate::Anchored,
            RopePhase::Flying { vel } => vel,
        };

        let mut disp = Vec2::new(self.pos.x - ball.x, self.pos.y - ball.y);
        let clip = clip_vel_to_cable(&mut disp, &mut vel, self.length);
        let r = clip.r;
        vel.y = plus_gravity(vel.y, tick);
        self.pos = Vec2::new(disp.x + ball.x + vel.x, disp.y + ball.y + vel.y);
        if self.pos.x < 0.0 {
            self.pos.x = 0.0;
            vel.x = 0.0;
        }
        if self.pos.y >= 192.0 && vel.y > 0.0 {
            debug!("rope head fell out of the play area");
            return RopeUpdate::Lost;
        }
        self.phase = RopePhase::Flying { vel };

        let halftile_x = (self.pos.x.trunc() as i32).div_euclid(8);
        let halftile_y = (self.pos.y.trunc() as i32).div_euclid(8);
        let anchor_tile = (halftile_x.div_euclid(2), halftile_y.div_euclid(2));
        let ball_tile = (
            (ball.x / 16.0).floor() as i32,
            (ball.y / 16.0).floor() as i32,
        );
        let wraptest_near: i32 = if self.pos.x > ball.x { 1 } else { 15 };

        // the band below the play area reads as solid ground, so a head
        // dipping under the bottom edge while still rising can anchor
        let mut t = if halftile_y >= 24 {
            1
        } else {
            plane.get(anchor_tile.0, anchor_tile.1)
        };
        let wrap_include_last =
            anchor_tile.1 < ball_tile.1 && anchor_tile.0 > ball_tile.0 && t == T_POLE_TOP;

        // half-tile parity: a fixture in the other 8 px half is air
        if (right_half(t) && halftile_x & 1 == 0)
            || (left_half(t) && halftile_x & 1 == 1)
            || (bottom_half(t) && halftile_y & 1 == 0)
        {
            t = 0;
        }
        if classes.is_no_grapple(t) {
            debug!("rope hit a no-grapple tile");
            return RopeUpdate::Lost;
        }

        let down_ok = vel.y > 0.0 && self.pos.y.rem_euclid(16.0) < 3.0;
        let displ_right = disp.x > 0.0;
        let grabbable = |tile: u8| {
            tile == T_POLE_TOP
                || tile == if displ_right { T_LADDER_R } else { T_LADDER_L }
                || classes.is_solid(tile)
                || (down_ok && classes.is_down_solid(tile))
        };

        if grabbable(t) {
            self.phase = RopePhase::Anchored;
            self.length = r.max(MIN_CABLELEN);
            // snap to the near top corner of a solid anchor so the
            // cable bends at the edge instead of inside the tile
            let up_solid = (0..12).contains(&anchor_tile.1)
                && classes.is_solid(plane.get(anchor_tile.0, anchor_tile.1 - 1));
            let near_x = anchor_tile.0 + if self.pos.x < ball.x { 1 } else { -1 };
            let near_tile = if anchor_tile.1 > 0 && anchor_tile.1 < 12 && near_x >= 0 {
                plane.get(near_x, anchor_tile.1)
            } else {
                0
            };
            if classes.is_solid(t)
                && self.pos.y.rem_euclid(16.0) < 3.0
                && !classes.is_solid(near_tile)
                && !up_solid
            {
                self.pos.x = (anchor_tile.0 * 16 + wraptest_near) as f64;
            }
            return RopeUpdate::Anchored;
        }

        // wrap test: only when an endpoint crossed into a new tile
        let new_key = Self::wrap_key_for(ball, self.pos);
        if new_key == self.wrap_key {
            return RopeUpdate::Flying;
        }
        self.wrap_key = new_key;

        let wrap_grabbable =
            |tile: u8| grabbable(tile) || (anchor_tile.1 > anchor_tile.0 && classes.is_down_solid(tile));
        let mut hit = None;
        for (cx, cy) in wrap_trace(ball_tile.0, ball_tile.1, anchor_tile.0, anchor_tile.1) {
            if (cx, cy) == ball_tile {
                continue;
            }
            if (cx, cy) == anchor_tile && !wrap_include_last {
                continue;
            }
            if cx < 0 || !(0..12).contains(&cy) {
                continue;
            }
            let tile = plane.get(cx, cy);
            if wrap_grabbable(tile) {
                hit = Some((cx, cy, tile));
                break;
            }
        }
        if let Some((cx, cy, tile)) = hit {
            if classes.is_no_grapple(tile) {
                debug!("rope wrapped onto a no-grapple tile");
                return RopeUpdate::Lost;
            }
            debug!("rope wrapped at ({cx}, {cy})");
            let px = wraptest_near
                .min(if left_half(tile) { 7 } else { 15 })
                .max(if right_half(tile) { 8 } else { 0 });
            let py = if bottom_half(tile) { 8 } else { 0 };
            self.phase = RopePhase::Anchored;
            self.length = r - WRAP_SLACK;
            self.pos = Vec2::new((16 * cx + px) as f64, (16 * cy + py) as f64);
            return RopeUpdate::Anchored;
        }
        RopeUpdate::Flying
    }
}

/// Cells on the straightened tile path from (x1, y1) to (x2, y2),
/// endpoints included. Upward paths climb first and cut diagonally at
/// the end; downward paths run flat first. This matches how a taut
/// cable hugs geometry when the anchor end moves.
pub fn wrap_trace(mut x1: i32, mut y1: i32, x2: i32, y2: i32) -> Vec<(i32, i32)> {
    let mut out = vec![(x1, y1)];
    while x1 != x2 || y1 != y2 {
        let mut dx = if x1 > x2 { -1 } else { 1 };
        let mut dy = if y1 > y2 { -1 } else { 1 };
        if y1 > y2 {
            if (x1 - x2).abs() < y1 - y2 {
                dx = 0;
            }
        } else if (x1 - x2).abs() > y2 - y1 {
            dy = 0;
        } else if x1 == x2 {
            dx = 0;
        }
        x1 += dx;
        y1 += dy;
        out.push((x1, y1));
        if out.len() > WRAP_TRACE_CAP {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> TileClasses {
        TileClasses::default()
    }

    #[test]
    fn trace_downward_runs_flat_first() {
        assert_eq!(
            wrap_trace(0, 0, 3, 1),
            vec![(0, 0), (1, 0), (2, 0), (3, 1)]
        );
    }

    #[test]
    fn trace_upward_climbs_first() {
        assert_eq!(
            wrap_trace(0, 5, 2, 0),
            vec![(0, 5), (0, 4), (0, 3), (0, 2), (1, 1), (2, 0)]
        );
    }

    #[test]
    fn trace_vertical_and_trivial() {
        assert_eq!(wrap_trace(4, 3, 4, 3), vec![(4, 3)]);
        assert_eq!(wrap_trace(2, 0, 2, 2), vec![(2, 0), (2, 1), (2, 2)]);
    }

    #[test]
    fn flying_rope_falls_and_is_lost_below_the_play_area() {
        let plane = TilePlane::from_rows(&[""]);
        let ball = Vec2::new(40.0, 100.0);
        let mut rope = Rope::launch(48.0, ball, Vec2::new(2.75, -2.75));
        for tick in 0..600 {
            match rope.update(&plane, &classes(), ball, tick) {
                RopeUpdate::Flying => {}
                RopeUpdate::Lost => return,
                RopeUpdate::Anchored => panic!("nothing to anchor to"),
            }
        }
        panic!("rope never fell out");
    }

    #[test]
    fn flight_never_exceeds_the_cable_length() {
        let plane = TilePlane::from_rows(&[""]);
        let ball = Vec2::new(60.0, 100.0);
        let mut rope = Rope::launch(48.0, ball, Vec2::new(4.0, -4.0));
        for tick in 0..120 {
            if rope.update(&plane, &classes(), ball, tick) == RopeUpdate::Lost {
                break;
            }
            let dx = rope.pos.x - ball.x;
            let dy = rope.pos.y - ball.y;
            // the head may lead the clipped displacement by up to one
            // frame of velocity, but can never run away from the cable
            assert!((dx * dx + dy * dy).sqrt() < 48.0 + 7.0);
        }
    }

    #[test]
    fn rising_head_below_the_bottom_edge_anchors_in_the_ground_band() {
        let plane = TilePlane::from_rows(&[""]);
        let ball = Vec2::new(40.0, 180.0);
        // head dips under y = 192 while still moving upward: not lost,
        // and the band below the play area grabs like solid ground
        let mut rope = Rope::launch(48.0, Vec2::new(40.0, 196.0), Vec2::new(0.0, -0.5));
        match rope.update(&plane, &classes(), ball, 0) {
            RopeUpdate::Anchored => assert!(rope.is_anchored()),
            other => panic!("expected an anchor in the ground band, got {other:?}"),
        }
    }

    #[test]
    fn rope_anchors_in_a_solid_tile() {
        // wall of solid tiles to the upper right of the ball
        let plane = TilePlane::from_rows(&["", "   ##", "   ##", "   ##", "   ##"]);
        let ball = Vec2::new(16.0, 100.0);
        let mut rope = Rope::launch(48.0, ball, Vec2::new(2.75, -2.75));
        for tick in 0..120 {
            match rope.update(&plane, &classes(), ball, tick) {
                RopeUpdate::Anchored => {
                    assert!(rope.is_anchored());
                    assert!(rope.length <= 48.0);
                    return;
                }
                RopeUpdate::Lost => panic!("lost before reaching the wall"),
                RopeUpdate::Flying => {}
            }
        }
        panic!("never anchored");
    }

    #[test]
    fn no_grapple_tile_destroys_the_rope() {
        let plane = TilePlane::from_rows(&["", "   %%", "   %%", "   %%", "   %%"]);
        let ball = Vec2::new(16.0, 100.0);
        let mut rope = Rope::launch(48.0, ball, Vec2::new(2.75, -2.75));
        for tick in 0..120 {
            match rope.update(&plane, &classes(), ball, tick) {
                RopeUpdate::Lost => return,
                RopeUpdate::Anchored => panic!("anchored in a no-grapple tile"),
                RopeUpdate::Flying => {}
            }
        }
        panic!("never resolved");
    }

    #[test]
    fn pole_top_grabs_only_in_its_bottom_left_quarter() {
        let plane = TilePlane::from_rows(&["", "  T"]);
        let classes = classes();
        // aim through the top half of the pole tile: passes through
        let ball = Vec2::new(16.0, 18.0);
        let mut rope = Rope::launch(48.0, Vec2::new(16.0, 18.0), Vec2::new(4.0, 0.0));
        let mut anchored = false;
        for tick in 0..30 {
            match rope.update(&plane, &classes, ball, tick) {
                RopeUpdate::Anchored => {
                    anchored = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(!anchored, "top half of a pole tile must not grab");

        // aim through the bottom-left quarter: grabs
        let ball = Vec2::new(16.0, 27.0);
        let mut rope = Rope::launch(48.0, Vec2::new(16.0, 27.0), Vec2::new(4.0, 0.0));
        for tick in 0..30 {
            if rope.update(&plane, &classes, ball, tick) == RopeUpdate::Anchored {
                return;
            }
        }
        panic!("bottom-left quarter of the pole never grabbed");
    }
}
