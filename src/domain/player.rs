/// Player state machine.
///
/// The player is a point mass (the "ball") with a collision probe of
/// radius 5 offset by the current hand/arm/body pose. Each state has
/// one motion routine, dispatched once per frame after the rope and
/// block updates. Input arrives as NES-order bitmasks: `vkeys` is the
/// held set, `new_vkeys` the keys freshly pressed this frame.
///
/// Horizontal walking speed lives in integer 1/256 px units through
/// the accel/brake limiter, so walk acceleration is bit-exact.

use log::debug;

use crate::domain::block::{TumbleDir, TumblingBlock};
use crate::domain::collision::four_corner_collide;
use crate::domain::motion::{
    clip_vel_to_cable, cos_t, get_rtheta, plus_gravity, sin_t, Vec2, ANGLE_UNIT, TAU,
};
use crate::domain::rope::{Rope, MIN_CABLELEN};
use crate::domain::tile::{
    TileClasses, T_CRATE, T_DOOR, T_EMPTY, T_LADDER_L, T_LADDER_R, T_POLE_TOP, T_ROPE_ITEM,
};
use crate::sim::event::GameEvent;
use crate::sim::world::TilePlane;

// ── input bitmask, NES button order ──
pub const VK_A: u8 = 0x80;
pub const VK_UP: u8 = 0x08;
pub const VK_DOWN: u8 = 0x04;
pub const VK_LEFT: u8 = 0x02;
pub const VK_RIGHT: u8 = 0x01;

// walk speeds in 1/256 px units
const WALK_SPD: i32 = 106;
const BACK_SPD: i32 = 64;
const WALK_ACCEL: i32 = 4;
const WALK_BRAKE: i32 = 8;

pub const MAX_CABLELEN: f64 = 48.0;
/// Arm reach while hanging; the part beyond INCLUDED_LEN.
const OUTSTRETCHED_LEN: f64 = 20.0;
/// Cable length folded into the ball position so very short cables
/// stay stable.
const INCLUDED_LEN: f64 = 12.0;

// hand offset per arm pose frame, and the shoulder joint
const ARMS_OUT: [(i32, i32); 9] = [
    (4, 2),
    (2, 3),
    (1, 7),
    (1, 9),
    (3, 12),
    (5, 14),
    (6, 14),
    (9, 14),
    (11, 14),
];
const BODY_IN: (i32, i32) = (9, 10);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Walking,
    /// Holding A next to a crate, waiting for a push/pull direction.
    BlockManip,
    /// Backing away from a crate to get room to pull it.
    PrePulling,
    Falling,
    OnSwingBar,
    Pushing,
    Pulling,
    /// Clinging to the side of a ladder half-tile.
    LadderSide,
    /// Vaulting up onto a ledge.
    Climbing,
    EnteringDoor,
}

/// Everything outside the player that a motion routine may touch.
pub struct Ctx<'a> {
    pub plane: &'a mut TilePlane,
    pub classes: &'a TileClasses,
    pub blocks: &'a mut Vec<TumblingBlock>,
    pub events: &'a mut Vec<GameEvent>,
    pub tick: u64,
}

struct PushNeighborhood {
    xt: i32,
    yt: i32,
    /// Pixels between the player's leading edge and the crate.
    dist_fwd: i32,
    /// [ahead of the crate, behind the player]: open for a push / pull.
    dest_open: [bool; 2],
}

/// Integer accelerate/brake/limit step for the walk velocity.
fn accel_brake_limit(vel: i32, max_vel: i32, accel: i32, brake: i32, vkeys: u8) -> i32 {
    if vkeys & VK_RIGHT != 0 && vel >= 0 {
        return (vel + accel).min(max_vel);
    }
    if vkeys & VK_LEFT != 0 && vel <= 0 {
        return (vel - accel).max(-max_vel);
    }
    if vel >= 0 {
        (vel - brake).max(0)
    } else {
        (vel + brake).min(0)
    }
}

pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub state: PlayerState,
    pub facing_left: bool,
    /// Animation counter, 256 units per frame cell. Also drives the
    /// timed states (climb, push, door) and the PrePulling backoff.
    pub anim: i32,
    pub rope: Option<Rope>,
    pub has_rope: bool,
    /// One-way platforms in rows above this are ignored by the probe
    /// until the player falls past them again.
    pub downsolid_ignore_row: i32,
    /// Hang direction of the cable at the hand, in TAU units.
    pub theta: i32,
    /// Arm swing angle in TAU units, fractional, 0..=12.
    pub arm_angle: f64,
}

impl Player {
    pub fn new() -> Self {
        Player {
            pos: Vec2::new(40.0, 170.0),
            vel: Vec2::default(),
            state: PlayerState::Walking,
            facing_left: false,
            anim: 0,
            rope: None,
            has_rope: false,
            downsolid_ignore_row: 0,
            theta: 0,
            arm_angle: 0.0,
        }
    }

    fn fwd(&self) -> i32 {
        if self.facing_left {
            -1
        } else {
            1
        }
    }

    /// Dispatch one frame of motion. The caller has already advanced
    /// the rope against last frame's position.
    pub fn advance(&mut self, ctx: &mut Ctx, vkeys: u8, new_vkeys: u8) {
        match self.state {
            PlayerState::OnSwingBar => self.move_swinging(ctx, vkeys, new_vkeys),
            PlayerState::Falling => self.move_falling(ctx, vkeys, new_vkeys),
            PlayerState::BlockManip => self.move_block_manip(ctx, vkeys, new_vkeys),
            PlayerState::Pushing | PlayerState::Pulling => self.move_pushing(),
            PlayerState::Climbing => self.move_climbing(ctx),
            PlayerState::LadderSide => self.move_ladder_side(ctx, vkeys, new_vkeys),
            PlayerState::EnteringDoor => self.move_entering_door(ctx),
            PlayerState::Walking | PlayerState::PrePulling => {
                self.move_walking(ctx, vkeys, new_vkeys)
            }
        }
    }

    // ══════════════════════════════════════════
    // Pose chain
    // ══════════════════════════════════════════

    /// Offset from the ball to the collision probe, through the arm
    /// and body joints plus INCLUDED_LEN of cable along theta.
    fn hand_chain(&self) -> Vec2 {
        // theta 0 faces up, TAU/2 forward, TAU down; mirror for left
        let theta = if self.facing_left {
            TAU * 3 / 2 - self.theta
        } else {
            self.theta
        }
        .rem_euclid(TAU);
        let armangle = ((self.arm_angle / 4.0).floor() as i32 + theta).rem_euclid(TAU);
        let bodyangle = (theta - self.arm_angle as i32).rem_euclid(TAU);
        let armangle16 = (armangle * 16 + TAU / 2) / TAU;
        let bodyangle16 = (bodyangle * 16 + TAU / 2) / TAU;
        let arm_frame = (10 - armangle16).rem_euclid(16);
        let body_frame = (6 - bodyangle16).rem_euclid(16);

        let mut out1 = ARMS_OUT[(arm_frame % 8) as usize];
        if arm_frame >= 8 {
            out1 = (15 - out1.0, 15 - out1.1);
        }
        let truearm = (armangle + TAU / 32).rem_euclid(TAU);
        let mut in1 = (
            out1.0 as f64 - (11.0 * cos_t(truearm)).round(),
            out1.1 as f64 - (13.0 * sin_t(truearm)).round(),
        );
        let mut in2 = BODY_IN;
        if body_frame >= 8 {
            in2 = (19 - in2.0, 21 - in2.1);
        }
        let mut out2 = (
            in2.0 + (6.0 * cos_t(bodyangle)).round() as i32,
            in2.1 + (7.0 * sin_t(bodyangle)).round() as i32,
        );
        if self.facing_left {
            in1 = (15.0 - in1.0, in1.1);
            out1 = (15 - out1.0, out1.1);
            in2 = (19 - in2.0, in2.1);
            out2 = (19 - out2.0, out2.1);
        }
        let thw = self.theta.rem_euclid(TAU);
        in1 = (
            in1.0 + cos_t(thw) * INCLUDED_LEN,
            in1.1 + sin_t(thw) * INCLUDED_LEN,
        );
        Vec2::new(
            (out2.0 - in2.0 + out1.0) as f64 - in1.0,
            (out2.1 - in2.1 + out1.1) as f64 - in1.1,
        )
    }

    /// Run the four-corner probe at the pose-offset position and apply
    /// the resulting ejection. Returns the raw push and the probe
    /// position it was computed at.
    fn collide_probe(&mut self, ctx: &mut Ctx) -> (Option<Vec2>, Vec2) {
        let total = self.hand_chain();
        let butt = Vec2::new(self.pos.x + total.x, self.pos.y + total.y);
        let with_downsolid =
            butt.y + 4.0 >= (self.downsolid_ignore_row * 16) as f64 && self.vel.y >= 0.0;
        let colr = four_corner_collide(ctx.plane, ctx.classes, butt.x, butt.y, 5.0, with_downsolid);
        if let Some(push) = colr {
            if push.x != 0.0 {
                if self.vel.x.abs() > 0.5 {
                    ctx.events.push(GameEvent::Land);
                }
                if (self.vel.x > 1.0 && push.x < 0.0) || (self.vel.x < -1.0 && push.x > 0.0) {
                    self.bash_block(ctx, Vec2::new(butt.x + push.x, butt.y + 2.0));
                }
                self.pos.x += push.x;
                self.vel.x = if push.x < 0.0 {
                    self.vel.x.min(0.0)
                } else {
                    self.vel.x.max(0.0)
                };
                self.vel.y -= self.vel.y / 8.0;
            }
            if push.y != 0.0 {
                self.downsolid_ignore_row = 0;
                if self.vel.y.abs() > 0.5 {
                    ctx.events.push(GameEvent::Land);
                }
                self.pos.y += push.y;
                self.vel.y = if push.y < 0.0 {
                    self.vel.y.min(0.0)
                } else {
                    self.vel.y.max(0.0)
                };
                self.vel.x -= self.vel.x / 8.0;
            }
        }
        (colr, Vec2::new(self.pos.x + total.x, self.pos.y + total.y))
    }

    // ══════════════════════════════════════════
    // Crates
    // ══════════════════════════════════════════

    /// Knock the crate ahead of a fast horizontal impact loose.
    fn bash_block(&mut self, ctx: &mut Ctx, contact: Vec2) {
        let fwd: i32 = if self.vel.x > 0.0 { 1 } else { -1 };
        let xt = (contact.x / 16.0).floor() as i32 + fwd;
        let yt = (contact.y / 16.0).floor() as i32;
        let deanchor = match &self.rope {
            Some(r) if r.is_anchored() => {
                xt == (r.pos.x / 16.0).floor() as i32 && yt == (r.pos.y / 16.0).floor() as i32
            }
            _ => false,
        };
        if deanchor {
            debug!("rope de-anchored from bashed cell ({xt}, {yt})");
            self.rope = None;
        }
        self.spawn_tumbling_block(ctx, xt, yt, fwd < 0);
    }

    /// Lift the crate at (xcell, ycell) out of the grid and start it
    /// tumbling. All the rejection rules live here.
    fn spawn_tumbling_block(&mut self, ctx: &mut Ctx, xcell: i32, ycell: i32, to_left: bool) -> bool {
        if xcell < 0 || !(0..12).contains(&ycell) {
            debug!("no tumble out of bounds");
            return false;
        }
        let here = ctx.plane.get(xcell, ycell);
        if here != T_CRATE {
            if ctx.classes.is_solid(here) || ctx.classes.is_down_solid(here) {
                debug!("tile {here} does not tumble");
            } else {
                debug!("hit the air above the crate");
            }
            return false;
        }
        let above = if ycell > 0 {
            ctx.plane.get(xcell, ycell - 1)
        } else {
            0
        };
        if ctx.classes.blocks_tumble(above) {
            debug!("no tumble with something on top");
            return false;
        }
        let xdst = xcell + if to_left { -1 } else { 1 };
        let dst = ctx.plane.get(xdst, ycell);
        if xdst < 0 || ctx.classes.blocks_tumble(dst) {
            debug!("no tumble into a blocked destination");
            return false;
        }
        let fabove = if ycell > 0 { ctx.plane.get(xdst, ycell - 1) } else { 0 };
        let predicted = ctx.classes.predict_fill(fabove);
        if dst != predicted {
            debug!("no tumble: destination {dst} is not the predicted fill {predicted}");
            return false;
        }
        let dir = if to_left {
            TumbleDir::SlidingLeft
        } else {
            TumbleDir::SlidingRight
        };
        // reveal whatever was hidden behind the crate
        ctx.plane.set(xcell, ycell, ctx.classes.predict_fill(above));
        ctx.blocks.push(TumblingBlock::new(
            (xcell * 16) as f64,
            (ycell * 16) as f64,
            dir,
        ));
        true
    }

    /// The crate cell ahead of the player, if it is manipulable.
    fn pushing_neighborhood(&self, ctx: &Ctx) -> Option<PushNeighborhood> {
        let fwd = self.fwd();
        let x = self.pos.x.floor() as i32 + 4 * fwd;
        let xt = x.div_euclid(16);
        if xt + fwd < 0 {
            debug!("crate cell off the map edge");
            return None;
        }
        let mut dist_fwd = x.rem_euclid(16);
        if !self.facing_left {
            dist_fwd = 16 - dist_fwd;
        }
        let yt = (self.pos.y.floor() as i32).div_euclid(16);
        let tile_f = ctx.plane.get(xt + fwd, yt);
        if tile_f != T_CRATE {
            debug!("tile ahead is not a crate");
            return None;
        }
        let tile_fu = if yt == 0 { 0 } else { ctx.plane.get(xt + fwd, yt - 1) };
        if ctx.classes.is_solid(tile_fu) {
            debug!("overhang above the crate");
            return None;
        }
        let dest_open = [xt + 2 * fwd, xt - fwd]
            .map(|xtd| xtd >= 0 && !ctx.classes.is_solid(ctx.plane.get(xtd, yt)));
        Some(PushNeighborhood {
            xt,
            yt,
            dist_fwd,
            dest_open,
        })
    }

    fn try_pushing(&mut self, ctx: &mut Ctx, is_pull: bool, nb: Option<PushNeighborhood>) {
        let nb = match nb.or_else(|| self.pushing_neighborhood(ctx)) {
            Some(nb) => nb,
            None => return,
        };
        if !nb.dest_open[0] && !nb.dest_open[1] {
            debug!("crate boxed in");
            return;
        }
        let fwd = self.fwd();
        if is_pull {
            if !nb.dest_open[1] {
                return;
            }
            // pulling needs solid footing behind the player
            let below = if nb.yt < 11 && nb.xt - fwd >= 0 {
                ctx.plane.get(nb.xt - fwd, nb.yt + 1)
            } else {
                0
            };
            if !(ctx.classes.is_solid(below) || ctx.classes.is_down_solid(below)) {
                debug!("not backing onto nonsolid ({}, {})", nb.xt - fwd, nb.yt + 1);
                return;
            }
            if nb.dist_fwd < 12 {
                self.state = PlayerState::PrePulling;
            } else if self.spawn_tumbling_block(ctx, nb.xt + fwd, nb.yt, !self.facing_left) {
                self.state = PlayerState::Pulling;
                self.rope = None;
                self.anim = 0;
                self.pos.x -= ((16 - nb.dist_fwd) * fwd) as f64;
                ctx.events.push(GameEvent::Climb);
            }
        } else if nb.dest_open[0] && self.spawn_tumbling_block(ctx, nb.xt + fwd, nb.yt, self.facing_left)
        {
            self.state = PlayerState::Pushing;
            self.rope = None;
            self.anim = 0;
            self.pos.x += (nb.dist_fwd * fwd) as f64;
            ctx.events.push(GameEvent::Climb);
        }
    }

    // ══════════════════════════════════════════
    // Walking
    // ══════════════════════════════════════════

    fn do_pickup(&mut self, ctx: &mut Ctx, col: i32, row: i32) {
        if ctx.plane.get(col, row) == T_ROPE_ITEM {
            self.has_rope = true;
            ctx.plane.set(col, row, T_EMPTY);
            ctx.events.push(GameEvent::ItemPickup { col, row });
        }
    }

    fn walking_press_a(&mut self, ctx: &mut Ctx, vkeys: u8) {
        if self.rope.is_some() {
            // withdraw the rope
            self.rope = None;
            return;
        }
        let nb = self.pushing_neighborhood(ctx);
        let want_pushpull = match &nb {
            Some(nb) => vkeys & VK_DOWN != 0 || nb.dist_fwd < 6,
            None => false,
        };
        if want_pushpull {
            if vkeys & VK_DOWN != 0 {
                self.try_pushing(ctx, true, nb);
                return;
            }
            ctx.events.push(GameEvent::StepLift);
            self.state = PlayerState::BlockManip;
            self.anim = 0;
        } else if self.state == PlayerState::PrePulling {
            self.state = PlayerState::Walking;
        } else if self.has_rope && self.rope.is_none() {
            self.shoot_rope(ctx, vkeys);
        }
    }

    /// Down at a standstill tugs the cable to topple the crate it is
    /// anchored to, if the player is far enough away.
    fn walking_press_down(&mut self, ctx: &mut Ctx) {
        let anchor = match &self.rope {
            Some(r) if r.is_anchored() => r.pos,
            _ => return,
        };
        if self.vel.y != 0.0 {
            return;
        }
        let dx = self.pos.x - anchor.x;
        if dx.abs() < 24.0 {
            debug!("too close to tug the anchor cell");
            return;
        }
        let xt = (anchor.x / 16.0).floor() as i32;
        let yt = (anchor.y / 16.0).floor() as i32;
        if self.spawn_tumbling_block(ctx, xt, yt, dx < 0.0) {
            self.rope = None;
            let facing_away = if dx < 0.0 {
                self.facing_left
            } else {
                !self.facing_left
            };
            self.state = if facing_away {
                PlayerState::Pushing
            } else {
                PlayerState::Pulling
            };
            ctx.events.push(GameEvent::Climb);
            self.anim = 0;
        }
    }

    fn walking_press_up(&mut self, ctx: &mut Ctx, bothwall: Option<u8>) {
        if bothwall == Some(T_DOOR) {
            ctx.events.push(GameEvent::StepLift);
            ctx.events.push(GameEvent::DoorEntered);
            self.state = PlayerState::EnteringDoor;
            self.anim = 0;
            return;
        }
        if bothwall == Some(if self.facing_left { T_LADDER_L } else { T_LADDER_R }) {
            self.get_onto_ladder();
            return;
        }
        // otherwise try to mantle the ledge ahead
        let fwd = self.fwd();
        let x = self.pos.x.floor() as i32 + 4 * fwd;
        let y = self.pos.y.floor() as i32;
        let xt = x.div_euclid(16);
        let yt = y.div_euclid(16);
        let dist_fwd = (if self.facing_left { x } else { 15 - x }).rem_euclid(16);
        if xt + fwd < 0 || yt < 1 {
            return;
        }
        let tile_f = ctx.plane.get(xt + fwd, yt);
        let tile_u = ctx.plane.get(xt, yt - 1);
        let tile_fu = ctx.plane.get(xt + fwd, yt - 1);
        if dist_fwd < 6
            && (ctx.classes.is_solid(tile_f) || ctx.classes.is_down_solid(tile_f))
            && !ctx.classes.is_solid(tile_u)
            && !ctx.classes.is_solid(tile_fu)
        {
            self.begin_climbing(
                (self.pos.x / 16.0).floor() as i32,
                (self.pos.y / 16.0).floor() as i32,
                true,
            );
        }
    }

    fn move_walking(&mut self, ctx: &mut Ctx, vkeys: u8, new_vkeys: u8) {
        let mut vkeys = vkeys;
        let mut new_vkeys = new_vkeys;

        // PrePulling drives itself: back up, then pull once clear
        if self.state == PlayerState::PrePulling {
            let fwd = self.fwd();
            let x = self.pos.x.floor() as i32 + 4 * fwd;
            let mut dist_fwd = x.rem_euclid(16);
            if !self.facing_left {
                dist_fwd = 16 - dist_fwd;
            }
            vkeys = VK_DOWN;
            if dist_fwd < 12 {
                vkeys |= if self.facing_left { VK_RIGHT } else { VK_LEFT };
            } else {
                new_vkeys |= VK_A;
            }
        }

        // an anchored cable at full stretch walks the player back in
        if let Some(rope) = &self.rope {
            if rope.is_anchored() {
                let disp = Vec2::new(self.pos.x - rope.pos.x, self.pos.y - rope.pos.y);
                if get_rtheta(disp).r >= MAX_CABLELEN {
                    if self.state == PlayerState::PrePulling {
                        self.state = PlayerState::Walking;
                    }
                    vkeys = if disp.x > 0.0 { VK_LEFT } else { VK_RIGHT };
                }
            }
        }

        let was_stopped = self.vel.x == 0.0 && self.vel.y == 0.0;
        let vk_backward = if self.facing_left { VK_RIGHT } else { VK_LEFT };
        let mut walking_backward = false;
        if self.vel.y == 0.0 {
            let mut vel = (256.0 * self.vel.x).round_ties_even() as i32;
            if vel == 0 {
                // turning around requires a fresh press while stopped
                if vkeys & VK_DOWN != 0 {
                    walking_backward = vkeys & vk_backward != 0;
                } else if new_vkeys & VK_LEFT != 0 {
                    self.facing_left = true;
                } else if new_vkeys & VK_RIGHT != 0 {
                    self.facing_left = false;
                }
            } else if vel < 0 && !self.facing_left {
                walking_backward = true;
            } else if vel > 0 && self.facing_left {
                walking_backward = true;
            }
            let topspd = if walking_backward { BACK_SPD } else { WALK_SPD };
            vel = accel_brake_limit(vel, topspd, WALK_ACCEL, WALK_BRAKE, vkeys);
            self.vel.x = vel as f64 / 256.0;
        }

        self.pos.x += self.vel.x;
        if self.pos.x < 5.0 {
            self.pos.x = 5.0;
            self.vel.x = 0.0;
        }
        self.vel.y = plus_gravity(self.vel.y, ctx.tick);
        self.pos.y += self.vel.y;
        if self.pos.y < 15.0 {
            self.pos.y = 15.0;
            self.vel.y = 0.0;
        }

        // wall probes at the torso corners
        let colltl = (self.pos.x.floor() as i32 - 4, self.pos.y.floor() as i32 - 11);
        let collbr = (colltl.0 + 8, colltl.1 + 16);
        let (lwalltile, rwalltile) = if (0..192).contains(&colltl.1) {
            (
                ctx.plane.get(colltl.0.div_euclid(16), colltl.1.div_euclid(16)),
                ctx.plane.get(collbr.0.div_euclid(16), colltl.1.div_euclid(16)),
            )
        } else {
            (0, 0)
        };
        if lwalltile == T_ROPE_ITEM {
            self.do_pickup(ctx, colltl.0.div_euclid(16), colltl.1.div_euclid(16));
        } else if rwalltile == T_ROPE_ITEM {
            self.do_pickup(ctx, collbr.0.div_euclid(16), colltl.1.div_euclid(16));
        }

        // weight-bearing walk frames shift the floor contact point
        let fwd = self.fwd();
        const FLOOR_X: [i32; 7] = [0, 0, 0, 3, 0, -3, 0];
        let floor_x = FLOOR_X[self.anim.div_euclid(256).min(5).rem_euclid(7) as usize];
        let eff_x = (collbr.0 + colltl.0).div_euclid(2) + floor_x * fwd;
        let floortile = if eff_x >= 0 && (0..192).contains(&collbr.1) {
            ctx.plane.get(eff_x.div_euclid(16), collbr.1.div_euclid(16))
        } else {
            0
        };

        if ctx.classes.is_solid(rwalltile) {
            let eject = self.vel.x.max(1.0);
            self.pos.x -= eject;
            self.vel.x = self.vel.x.min(0.0);
            if self.state == PlayerState::PrePulling {
                self.state = PlayerState::Walking;
            }
        } else if ctx.classes.is_solid(lwalltile) {
            let eject = self.vel.x.min(-1.0);
            self.pos.x -= eject;
            self.vel.x = self.vel.x.max(0.0);
            if self.state == PlayerState::PrePulling {
                self.state = PlayerState::Walking;
            }
        }

        let solidfloor =
            ctx.classes.is_solid(floortile) || ctx.classes.is_down_solid(floortile);
        let want_swing = match &self.rope {
            Some(r) if r.is_anchored() => {
                new_vkeys & VK_UP != 0 || (self.pos.y > r.pos.y + 16.0 && !solidfloor)
            }
            _ => false,
        };
        if solidfloor {
            self.pos.y = (collbr.1 & !15) as f64 - 5.0;
            if self.vel.y > 0.5 {
                ctx.events.push(GameEvent::Land);
            }
            self.vel.y = 0.0;
        } else {
            // airborne: latch onto a ladder half-tile on the facing side
            let facing_wall = if self.facing_left { lwalltile } else { rwalltile };
            if facing_wall == if self.facing_left { T_LADDER_L } else { T_LADDER_R }
                && eff_x.div_euclid(8).rem_euclid(2) == if self.facing_left { 0 } else { 1 }
            {
                self.get_onto_ladder();
            }
            // nudge off ledges so the fall can start
            let lsolid = (0..192).contains(&collbr.1)
                && ctx
                    .classes
                    .is_solid(ctx.plane.get(colltl.0.div_euclid(16), collbr.1.div_euclid(16)));
            let rsolid = (0..192).contains(&collbr.1)
                && ctx
                    .classes
                    .is_solid(ctx.plane.get(collbr.0.div_euclid(16), collbr.1.div_euclid(16)));
            if lsolid {
                if self.vel.x < 3.0 / 16.0 {
                    self.vel.x += 1.0 / 16.0;
                }
            } else if rsolid && self.vel.x > -3.0 / 16.0 {
                self.vel.x -= 1.0 / 16.0;
            }
        }

        if want_swing && self.change_walking_to_swinging(ctx) {
            self.downsolid_ignore_row = 0;
            return;
        }

        if new_vkeys & VK_A != 0 {
            if self.vel.y == 0.0 {
                self.walking_press_a(ctx, vkeys);
            } else if self.has_rope && self.rope.is_none() {
                self.shoot_rope(ctx, vkeys);
            }
        }
        if self.vel.y == 0.0 && new_vkeys & VK_UP != 0 {
            let bothwall = if lwalltile == rwalltile {
                Some(lwalltile)
            } else {
                None
            };
            self.walking_press_up(ctx, bothwall);
        }
        if self.vel.y == 0.0 && new_vkeys & VK_DOWN != 0 {
            self.walking_press_down(ctx);
        }

        // walk cycle: the step sounds fire when the weight shifts
        let oldup = matches!(self.anim.div_euclid(256), 2..=5);
        if self.vel.y > 0.0 {
            // airborne: freeze the cycle
        } else if self.vel.x == 0.0 {
            self.anim = 128;
        } else {
            let fvel = (self.vel.x.abs() * 80.0).round_ties_even() as i32;
            self.anim += if walking_backward { -fvel } else { fvel };
        }
        if !walking_backward
            && self.anim.div_euclid(256) == 1
            && self.vel.x.abs() * 384.0 < WALK_SPD as f64
        {
            // skip the second contact frame at low speed
            self.anim += 256;
        }
        let newup = matches!(self.anim.div_euclid(256), 3..=5)
            || (!was_stopped && self.anim.div_euclid(256) == 2);
        if oldup && !newup {
            ctx.events.push(GameEvent::Step);
        } else if newup && !oldup {
            ctx.events.push(GameEvent::StepLift);
        }
        if self.anim >= 7 * 256 {
            self.anim -= 7 * 256;
        } else if self.anim < 0 {
            ctx.events.push(GameEvent::StepLift);
            self.anim += 5 * 256;
        }
    }

    // ══════════════════════════════════════════
    // Ladders and climbing
    // ══════════════════════════════════════════

    fn get_onto_ladder(&mut self) {
        self.state = PlayerState::LadderSide;
        self.vel = Vec2::default();
        self.anim = 0;
        self.rope = None;
        self.pos = Vec2::new(
            (self.pos.x / 16.0).floor() * 16.0 + 8.0,
            (self.pos.y / 8.0).floor() * 8.0 + 3.0,
        );
    }

    fn begin_climbing(&mut self, xt: i32, yt: i32, snap_to_side: bool) {
        let x = if snap_to_side {
            (xt * 16 + if self.facing_left { 5 } else { 11 }) as f64
        } else {
            self.pos.x + if self.facing_left { 4.0 } else { -4.0 }
        };
        self.pos = Vec2::new(x, (yt * 16 + 11) as f64);
        self.state = PlayerState::Climbing;
        self.anim = 0;
    }

    fn move_climbing(&mut self, ctx: &mut Ctx) {
        let fwd = self.fwd();
        if self.anim < 2 * 256 {
            self.anim += 64;
            if self.anim >= 2 * 256 {
                ctx.events.push(GameEvent::Climb);
            }
        } else {
            self.anim += 32;
        }
        if self.anim >= 7 * 256 {
            self.pos.x += (5 * fwd) as f64;
            self.pos.y -= 16.0;
            self.vel = Vec2::new((WALK_SPD * fwd) as f64 / 256.0, 0.0);
            self.state = PlayerState::Walking;
            self.anim = 3 * 256;
            ctx.events.push(GameEvent::StepLift);
        }
    }

    fn move_ladder_side(&mut self, ctx: &mut Ctx, vkeys: u8, new_vkeys: u8) {
        let fwd = self.fwd();
        if self.vel.y == 0.0 && (vkeys != 0 || new_vkeys != 0) {
            let xt = (self.pos.x / 16.0).floor() as i32;
            if vkeys & VK_UP != 0 {
                let yt = ((self.pos.y - 16.0) / 16.0).floor() as i32;
                let tile_u = if yt >= 0 { ctx.plane.get(xt, yt) } else { 0 };
                let tile_fu = if yt >= 0 { ctx.plane.get(xt + fwd, yt) } else { 0 };
                let tile_f = ctx.plane.get(xt + fwd, (yt + 1).min(11));
                if matches!(tile_u, T_LADDER_R | T_LADDER_L) {
                    self.vel = Vec2::new(0.0, -3.0 / 16.0);
                } else if !ctx.classes.is_solid(tile_u)
                    && !ctx.classes.is_solid(tile_fu)
                    && (ctx.classes.is_solid(tile_f) || ctx.classes.is_down_solid(tile_f))
                {
                    // top of the ladder: mantle off it
                    self.begin_climbing(xt, yt + 1, true);
                    return;
                }
            } else if vkeys & VK_DOWN != 0 {
                let yt = ((self.pos.y + 8.0) / 16.0).floor() as i32;
                let tile_d = if yt < 12 { ctx.plane.get(xt, yt) } else { 0 };
                if matches!(tile_d, T_LADDER_R | T_LADDER_L) {
                    self.vel = Vec2::new(0.0, 3.0 / 16.0);
                } else if ctx.classes.is_solid(tile_d) || ctx.classes.is_down_solid(tile_d) {
                    self.state = PlayerState::Walking;
                }
            } else if new_vkeys & VK_A != 0 {
                if self.rope.is_some() {
                    self.rope = None;
                } else if self.has_rope {
                    self.shoot_rope(ctx, 0);
                }
            } else if new_vkeys & (if self.facing_left { VK_RIGHT } else { VK_LEFT }) != 0
                && self.rope.as_ref().map_or(false, |r| r.is_anchored())
            {
                // push off the ladder into a swing
                self.change_walking_to_swinging(ctx);
                return;
            }
        }
        self.pos.y += self.vel.y;
        self.anim += (128.0 * self.vel.y.abs()) as i32;
        if self.anim >= 1024 {
            self.anim = 0;
            self.vel = Vec2::default();
            self.pos.y = (self.pos.y / 8.0).floor() * 8.0 + 3.0;
        }
    }

    // ══════════════════════════════════════════
    // Falling and swinging
    // ══════════════════════════════════════════

    /// Leave the ground and hang from the anchored cable.
    fn change_walking_to_swinging(&mut self, ctx: &mut Ctx) -> bool {
        let anchor = match &self.rope {
            Some(r) => r.pos,
            None => return false,
        };
        let adjust_len = OUTSTRETCHED_LEN - INCLUDED_LEN;
        let disp = Vec2::new(self.pos.x - anchor.x, self.pos.y - anchor.y - adjust_len);
        let r = get_rtheta(disp).r - INCLUDED_LEN;

        let at_top = r < MIN_CABLELEN / 2.0;
        let facing_anchor = (if self.facing_left { disp.x } else { -disp.x }) > 0.0;
        let not_backing = (if self.facing_left { -self.vel.x } else { self.vel.x }) >= 0.0;
        if at_top && facing_anchor && not_backing {
            debug!("autoclimb from the top of the cable");
            if self.swinging_press_up(ctx) {
                return true;
            }
        }
        self.theta = TAU / 4;
        if let Some(rope) = self.rope.as_mut() {
            if (disp.x >= 16.0 && self.vel.x < 0.0) || (disp.x <= -16.0 && self.vel.x > 0.0) {
                // scooting off a cliff toward the anchor: tuck the arm
                // and shorten for a little ground clearance
                self.arm_angle = (TAU * 3 / 32) as f64;
                self.anim = 16;
                rope.length = r + adjust_len;
            } else if self.state == PlayerState::LadderSide {
                rope.length = r;
            } else {
                self.arm_angle = 0.0;
                self.anim = 0;
                rope.length = MAX_CABLELEN;
            }
        }
        self.pos.y -= adjust_len;
        self.state = PlayerState::Falling;
        ctx.events.push(GameEvent::StepLift);
        true
    }

    /// Touch down out of a hang: fold the pose offset into the ball
    /// and pick the walk frame the body angle lands closest to.
    fn falling_to_walking(&mut self) {
        let total = self.hand_chain();
        self.pos.x += total.x;
        self.pos.y += total.y;
        self.state = PlayerState::Walking;
        let mut bodyangle = self.arm_angle as i32
            + if self.facing_left {
                self.theta
            } else {
                TAU / 2 - self.theta
            };
        bodyangle = (bodyangle * 32).div_euclid(TAU);
        if bodyangle >= 24 {
            bodyangle -= 32;
        }
        bodyangle = (bodyangle - 8).clamp(-2, 2);
        self.anim = 256 * (6 - bodyangle).rem_euclid(6);
    }

    fn move_falling(&mut self, ctx: &mut Ctx, vkeys: u8, new_vkeys: u8) {
        if self.rope.as_ref().map_or(false, |r| r.is_anchored()) {
            return self.move_swinging(ctx, vkeys, new_vkeys);
        }
        // free fall: the arm relaxes back to vertical
        if self.arm_angle > 2.0 {
            self.arm_angle -= 2.0;
            self.theta += if self.facing_left { 1 } else { -1 };
        }
        self.vel.y = plus_gravity(self.vel.y, ctx.tick);
        self.pos.x += self.vel.x;
        self.pos.y += self.vel.y;
        if self.pos.x < 0.0 {
            self.pos.x = 0.0;
            self.vel.x = 0.0;
        }

        let (colr, _butt) = self.collide_probe(ctx);
        if let Some(push) = colr {
            if push.y < 0.0 {
                self.falling_to_walking();
            } else if push.x != 0.0 && self.theta > 0 && self.theta < TAU / 2 {
                // glanced a wall: swing the hang angle toward vertical
                let dtheta = TAU / 4 - self.theta;
                self.theta += dtheta.div_euclid(2);
            }
        }

        // falling past a ladder half-tile with up or down held latches on
        if self.pos.y > 0.0 && self.pos.y < 192.0 && vkeys & (VK_UP | VK_DOWN) != 0 {
            let tox = (self.pos.x / 16.0).floor() as i32;
            let toy = (self.pos.y / 16.0).floor() as i32;
            let totile = ctx.plane.get(tox, toy);
            let toxhalf = ((self.pos.x / 8.0).floor() as i32).rem_euclid(2);
            if totile == if self.facing_left { T_LADDER_L } else { T_LADDER_R }
                && toxhalf == if self.facing_left { 0 } else { 1 }
            {
                self.get_onto_ladder();
                return;
            }
        }
        if new_vkeys & VK_A != 0 && self.has_rope && self.rope.is_none() {
            self.shoot_rope(ctx, vkeys);
        }
    }

    fn move_swinging(&mut self, ctx: &mut Ctx, vkeys: u8, new_vkeys: u8) {
        let mut vkeys = vkeys;
        let (anchor, cable_len, cable_max) = match &self.rope {
            Some(r) => (r.pos, r.length, r.max_len),
            None => {
                self.state = PlayerState::Falling;
                return;
            }
        };

        // holding down lets the cable pay out to its maximum
        let restrict = if vkeys & VK_DOWN != 0 { cable_max } else { cable_len };
        let mut disp = Vec2::new(self.pos.x - anchor.x, self.pos.y - anchor.y);
        let clip = clip_vel_to_cable(&mut disp, &mut self.vel, restrict + INCLUDED_LEN);
        let r = clip.r - INCLUDED_LEN;
        if r >= cable_len - 1.0 {
            // taut: rotate the hang angle toward the cable angle
            let dtheta = ((clip.theta - self.theta + TAU / 2).rem_euclid(TAU) - TAU / 2)
                .clamp(-(TAU / 32), TAU / 32);
            self.theta = (self.theta + dtheta).rem_euclid(TAU);
        }
        self.pos = Vec2::new(disp.x + anchor.x, disp.y + anchor.y);

        // pumping the swing: forward key raises the arm, releasing
        // drops it; the body moves opposite the arm's reaction
        let armangle_max = TAU as f64 * 3.0 / 16.0;
        let mut delta = if vkeys & (if self.facing_left { VK_LEFT } else { VK_RIGHT }) != 0 {
            TAU as f64 * 3.0 / 512.0
        } else {
            -(TAU as f64) * 3.0 / 256.0
        };
        delta = delta.min(armangle_max - self.arm_angle).max(-self.arm_angle);
        let com_dir = self.arm_angle + 0.5 * delta + (TAU / 4) as f64;
        self.arm_angle += delta;
        let com_dir = self.theta as f64 + if self.facing_left { com_dir } else { -com_dir };
        let com_dir = (com_dir.round_ties_even() as i32).rem_euclid(TAU);
        let move_amt = -delta * 6.0 / ANGLE_UNIT;
        self.pos.x += move_amt * cos_t(com_dir);
        self.pos.y += move_amt * sin_t(com_dir);

        // ground-clearance countdown from a cliff departure
        if self.anim > 0 {
            self.anim -= 1;
            vkeys |= VK_UP;
        }

        if new_vkeys & VK_UP != 0 && r <= MIN_CABLELEN + 1.0 {
            if self.swinging_press_up(ctx) {
                return;
            }
        } else if vkeys & VK_UP != 0 {
            if let Some(rope) = self.rope.as_mut() {
                rope.length = (r - 0.25).max(MIN_CABLELEN);
            }
        }
        if new_vkeys & VK_DOWN != 0
            && self.rope.as_ref().map_or(false, |ro| ro.length >= MAX_CABLELEN)
        {
            // paying out past the end: let go
            self.rope = None;
        } else if vkeys & VK_DOWN != 0 {
            if let Some(rope) = self.rope.as_mut() {
                rope.length = (r + 1.0).min(MAX_CABLELEN).max(MIN_CABLELEN);
            }
        }
        if new_vkeys & VK_A != 0 {
            self.rope = None;
        }
        if self.rope.is_none() {
            self.state = PlayerState::Falling;
        }

        self.vel.y = plus_gravity(self.vel.y, ctx.tick);
        self.pos.x += self.vel.x;
        self.pos.y += self.vel.y;

        let (colr, butt) = self.collide_probe(ctx);
        if self.vel.y < 0.0 {
            // rising: re-arm one-way platforms below the probe
            self.downsolid_ignore_row = self
                .downsolid_ignore_row
                .min(1 + ((butt.y + 5.0) / 16.0).floor() as i32);
        }
        if let Some(push) = colr {
            if push.y < 0.0 {
                if vkeys & VK_DOWN != 0 {
                    let xt = (butt.x / 16.0).floor() as i32;
                    let yt = (butt.y / 16.0).floor() as i32 + 1;
                    let on_downsolid = xt >= 0
                        && (0..12).contains(&yt)
                        && ctx.classes.is_down_solid(ctx.plane.get(xt, yt));
                    if on_downsolid {
                        // drop through the platform
                        self.downsolid_ignore_row = yt + 1;
                    } else if new_vkeys & VK_DOWN != 0 {
                        self.falling_to_walking();
                    }
                }
                if self.theta > TAU / 2 {
                    // dragged past horizontal on the ground: snap and
                    // compensate the probe for the pose change
                    self.pos.y += 4.0 * sin_t(self.theta);
                    self.theta = if self.theta < TAU * 3 / 4 { TAU / 2 } else { 0 };
                }
            }
        }

        // tension: the cable stretches, then snaps
        if self.rope.is_some() {
            if let (Some(push), Some(pull)) = (colr, clip.push) {
                let tension = (push.x + pull.x).abs().max((push.y + pull.y).abs());
                if tension >= 4.0 {
                    let mut snapped = false;
                    if let Some(rope) = self.rope.as_mut() {
                        rope.length += (tension / 2.0).floor();
                        snapped = rope.length > MAX_CABLELEN;
                    }
                    if snapped {
                        debug!("cable snapped under tension {tension}");
                        ctx.events.push(GameEvent::RopeSnapped);
                        self.rope = None;
                    }
                }
            }
        }
    }

    /// Up at the top of the cable: latch a ladder, mount a swing bar,
    /// or mantle onto the anchor tile.
    fn swinging_press_up(&mut self, ctx: &mut Ctx) -> bool {
        let anchor = match &self.rope {
            Some(r) => r.pos,
            None => return false,
        };
        let total = self.hand_chain();
        let butt_x = self.pos.x + total.x;
        let butt_y = self.pos.y + total.y;
        let from_x = (butt_x / 16.0).floor() as i32;
        let from_y = (butt_y / 16.0).floor() as i32;
        let to_x = (anchor.x / 16.0).floor() as i32;
        let to_y = (anchor.y / 16.0).floor() as i32;
        if to_x < 0 || !(0..12).contains(&to_y) {
            debug!("climb target out of bounds");
            return false;
        }
        let to_tile = ctx.plane.get(to_x, to_y);
        let to_xhalf = ((anchor.x / 8.0).floor() as i32).rem_euclid(2);

        if to_tile == if self.facing_left { T_LADDER_L } else { T_LADDER_R }
            && to_xhalf == if self.facing_left { 0 } else { 1 }
        {
            self.pos = Vec2::new((to_x * 16 + 8) as f64, (butt_y / 8.0).floor() * 8.0 + 3.0);
            self.get_onto_ladder();
            return true;
        }
        if to_tile == T_POLE_TOP {
            debug!("latched onto the bar at ({}, {})", anchor.x, anchor.y);
            self.anim = 0;
            let bar = Vec2::new(
                (anchor.x / 8.0).floor() * 8.0 + 2.0,
                (anchor.y / 8.0).floor() * 8.0 + 2.0,
            );
            self.pos = Vec2::new(
                bar.x + cos_t(self.theta) * INCLUDED_LEN,
                bar.y + sin_t(self.theta) * INCLUDED_LEN,
            );
            self.rope = Some(Rope::anchored(bar, 0.0, 0.0));
            self.state = PlayerState::OnSwingBar;
            return false;
        }
        if !ctx.classes.is_solid(to_tile) && !ctx.classes.is_down_solid(to_tile) {
            debug!("climb target not solid");
            return false;
        }
        let mut snap_to_side = true;
        if from_x == to_x && from_y == to_y + 1 {
            if ctx.classes.is_down_solid(to_tile) {
                debug!("climbing up through a one-way platform");
                snap_to_side = false;
            } else {
                debug!("already inside the target tile");
                return false;
            }
        }
        if anchor.y - (to_y * 16) as f64 >= 4.0 {
            debug!("anchor not at the top edge of the tile");
            return false;
        }
        debug!("mantling onto ({to_x}, {to_y})");
        let dx: i32 = if (anchor.x / 16.0).floor() * 16.0 + 8.0 > butt_x {
            1
        } else {
            -1
        };
        if snap_to_side && dx != self.fwd() {
            debug!("facing away from the climb");
            return false;
        }
        let mut from_x = from_x;
        if from_x == to_x {
            from_x -= dx;
        }
        // the climb path (up the side, then across the top) must be clear
        let mut coords: Vec<(i32, i32)> = Vec::new();
        let mut y = from_y.max(to_y);
        while y >= to_y {
            coords.push((from_x, y));
            y -= 1;
        }
        let mut x = from_x;
        while (dx > 0 && x <= to_x) || (dx < 0 && x >= to_x) {
            coords.push((x, to_y - 1));
            x += dx;
        }
        if coords
            .iter()
            .any(|&(x, y)| x >= 0 && (0..12).contains(&y) && ctx.classes.is_solid(ctx.plane.get(x, y)))
        {
            debug!("climb path blocked");
            return false;
        }
        self.rope = None;
        self.begin_climbing(to_x - dx, to_y, snap_to_side);
        true
    }

    // ══════════════════════════════════════════
    // Block manipulation states
    // ══════════════════════════════════════════

    fn move_block_manip(&mut self, ctx: &mut Ctx, vkeys: u8, new_vkeys: u8) {
        if new_vkeys & VK_RIGHT != 0 {
            self.try_pushing(ctx, self.facing_left, None);
        } else if new_vkeys & VK_LEFT != 0 {
            self.try_pushing(ctx, !self.facing_left, None);
        } else if new_vkeys & VK_DOWN != 0 {
            self.state = PlayerState::Walking;
        } else if vkeys & VK_A == 0 {
            // A released with no direction: default to a push
            self.state = PlayerState::Walking;
            self.try_pushing(ctx, false, None);
        }
    }

    fn move_pushing(&mut self) {
        self.anim += 20;
        if self.anim >= 4 * 256 {
            self.anim = 128;
            self.state = PlayerState::Walking;
            self.vel.x = 0.0;
        }
    }

    fn move_entering_door(&mut self, ctx: &mut Ctx) {
        let before = self.anim;
        self.anim = (self.anim + 32).min(1024);
        if before < 1024 && self.anim >= 1024 {
            ctx.events.push(GameEvent::LevelComplete);
        }
    }

    // ══════════════════════════════════════════
    // Rope launch
    // ══════════════════════════════════════════

    fn shoot_rope(&mut self, ctx: &mut Ctx, vkeys: u8) {
        let (pos, vel) = match self.state {
            PlayerState::LadderSide => (
                Vec2::new(self.pos.x, self.pos.y - 8.0),
                // away from the ladder face, upward
                Vec2::new(if self.facing_left { 2.75 } else { -2.75 }, -2.75),
            ),
            PlayerState::Walking => {
                let vk_fwd = if self.facing_left { VK_LEFT } else { VK_RIGHT };
                let aim = vkeys & (VK_UP | VK_DOWN | vk_fwd);
                let mut vel = if aim & VK_DOWN != 0 {
                    Vec2::new(4.0, 0.0)
                } else if aim == VK_UP {
                    Vec2::new(0.0, -4.0)
                } else if aim & VK_UP != 0 {
                    Vec2::new(2.0, -3.5)
                } else {
                    Vec2::new(2.75, -2.75)
                };
                if self.facing_left {
                    vel.x = -vel.x;
                }
                (Vec2::new(self.pos.x, self.pos.y - 8.0), vel)
            }
            _ => {
                // airborne: aim keys add to the current velocity
                let mut vk_ud = vkeys & (VK_UP | VK_DOWN);
                let mut vk_lr = vkeys & (VK_LEFT | VK_RIGHT);
                if vk_ud == 0 && vk_lr == 0 {
                    vk_ud = VK_UP;
                    vk_lr = if self.facing_left { VK_LEFT } else { VK_RIGHT };
                }
                let amt = if vk_ud != 0 && vk_lr != 0 { 2.75 } else { 4.0 };
                let vel = Vec2::new(
                    self.vel.x
                        + if vk_lr & VK_RIGHT != 0 {
                            amt
                        } else if vk_lr != 0 {
                            -amt
                        } else {
                            0.0
                        },
                    self.vel.y
                        + if vk_ud & VK_DOWN != 0 {
                            amt
                        } else if vk_ud != 0 {
                            -amt
                        } else {
                            0.0
                        },
                );
                (self.pos, vel)
            }
        };
        self.rope = Some(Rope::launch(MAX_CABLELEN, pos, vel));
        ctx.events.push(GameEvent::RopeLaunch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(rows: &[&str]) -> (TilePlane, TileClasses, Vec<TumblingBlock>, Vec<GameEvent>) {
        (
            TilePlane::from_rows(rows),
            TileClasses::default(),
            Vec::new(),
            Vec::new(),
        )
    }

    fn step_player(
        p: &mut Player,
        plane: &mut TilePlane,
        classes: &TileClasses,
        blocks: &mut Vec<TumblingBlock>,
        events: &mut Vec<GameEvent>,
        tick: u64,
        vkeys: u8,
        new_vkeys: u8,
    ) {
        let mut ctx = Ctx {
            plane,
            classes,
            blocks,
            events,
            tick,
        };
        p.advance(&mut ctx, vkeys, new_vkeys);
    }

    const FLAT: &[&str] = &[
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        "################################",
    ];

    #[test]
    fn accel_brake_reaches_top_speed_in_27_frames() {
        let mut vel = 0;
        let mut frames = 0;
        while vel < WALK_SPD {
            vel = accel_brake_limit(vel, WALK_SPD, WALK_ACCEL, WALK_BRAKE, VK_RIGHT);
            frames += 1;
            assert!(frames < 100);
        }
        assert_eq!(frames, 27);
        assert_eq!(vel, WALK_SPD);
        // braking never overshoots zero
        while vel > 0 {
            let next = accel_brake_limit(vel, WALK_SPD, WALK_ACCEL, WALK_BRAKE, 0);
            assert!(next < vel);
            vel = next;
        }
        assert_eq!(vel, 0);
    }

    #[test]
    fn backward_hold_does_not_accelerate_forward_motion() {
        let vel = accel_brake_limit(50, WALK_SPD, WALK_ACCEL, WALK_BRAKE, VK_LEFT);
        assert_eq!(vel, 42); // brakes, left press ignored while moving right
    }

    #[test]
    fn walking_right_accelerates_and_stays_on_the_floor() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.pos = Vec2::new(40.0, 171.0);
        for tick in 0..40 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, VK_RIGHT,
                if tick == 0 { VK_RIGHT } else { 0 },
            );
        }
        assert_eq!(p.state, PlayerState::Walking);
        assert_eq!(p.vel.x, WALK_SPD as f64 / 256.0);
        assert_eq!(p.pos.y, 171.0); // floor snap: (176 & !15) - 5
        assert!(p.pos.x > 50.0);
        assert!(events.contains(&GameEvent::StepLift) || events.contains(&GameEvent::Step));
    }

    #[test]
    fn left_edge_clamps_the_ball() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.pos = Vec2::new(8.0, 171.0);
        p.facing_left = true;
        for tick in 0..30 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, VK_LEFT,
                if tick == 0 { VK_LEFT } else { 0 },
            );
        }
        assert_eq!(p.pos.x, 5.0);
        assert_eq!(p.vel.x, 0.0);
    }

    #[test]
    fn item_pickup_grants_the_rope() {
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "   *",
            "################################",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        let mut p = Player::new();
        p.pos = Vec2::new(24.0, 171.0);
        for tick in 0..120 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, VK_RIGHT,
                if tick == 0 { VK_RIGHT } else { 0 },
            );
            if p.has_rope {
                break;
            }
        }
        assert!(p.has_rope);
        assert_eq!(plane.get(3, 10), T_EMPTY);
        assert!(events.iter().any(|e| matches!(e, GameEvent::ItemPickup { col: 3, row: 10 })));
    }

    #[test]
    fn blocked_push_is_a_noop() {
        // crate ahead, but the push destination is sealed solid
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "   B#",
            "#####",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        let mut p = Player::new();
        // leading edge 3 px from the crate at col 3
        p.pos = Vec2::new(41.0, 171.0);
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 0, VK_A, VK_A,
        );
        assert_eq!(p.state, PlayerState::BlockManip);
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 1, VK_A | VK_RIGHT, VK_RIGHT,
        );
        assert!(blocks.is_empty());
        assert_eq!(plane.get(3, 10), T_CRATE);
        assert_eq!(p.state, PlayerState::BlockManip);
    }

    #[test]
    fn push_rejected_when_destination_defies_fill_prediction() {
        // brick over the destination cell: the table predicts tile 3
        // underneath it, but the cell is empty, so the move is refused
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "    #",
            "   B",
            "################################",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        assert_eq!(classes.predict_fill(1), 3);
        let mut p = Player::new();
        p.pos = Vec2::new(41.0, 171.0);
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 0, VK_A, VK_A,
        );
        assert_eq!(p.state, PlayerState::BlockManip);
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 1, VK_A | VK_RIGHT, VK_RIGHT,
        );
        assert!(blocks.is_empty());
        assert_eq!(plane.get(3, 10), T_CRATE);
        assert_eq!(plane.get(4, 10), 0);
        assert_eq!(p.state, PlayerState::BlockManip);
    }

    #[test]
    fn overhang_above_the_crate_blocks_manipulation() {
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "   #",
            "   B",
            "################################",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        let mut p = Player::new();
        p.pos = Vec2::new(41.0, 171.0);
        // the crate is unreachable under a solid tile: A does nothing
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 0, VK_A, VK_A,
        );
        assert_eq!(p.state, PlayerState::Walking);
        assert!(blocks.is_empty());
        assert_eq!(plane.get(3, 10), T_CRATE);
        assert_eq!(plane.get(3, 9), 1);
    }

    #[test]
    fn push_with_open_destination_spawns_a_tumbling_block() {
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "   B",
            "################################",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        let mut p = Player::new();
        p.pos = Vec2::new(41.0, 171.0);
        // A next to the crate enters BlockManip
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 0, VK_A, VK_A,
        );
        assert_eq!(p.state, PlayerState::BlockManip);
        // then forward commits the push
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 1, VK_A | VK_RIGHT, VK_RIGHT,
        );
        assert_eq!(p.state, PlayerState::Pushing);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dir, TumbleDir::SlidingRight);
        // the crate cell was vacated (nothing hidden behind it)
        assert_eq!(plane.get(3, 10), 0);
        assert!(events.contains(&GameEvent::Climb));
    }

    #[test]
    fn pushing_state_times_out_back_to_walking() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.state = PlayerState::Pushing;
        p.anim = 0;
        for tick in 0..52 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, 0, 0,
            );
            if p.state == PlayerState::Walking {
                // 4*256 / 20 rounds up to 52 frames
                assert_eq!(tick, 51);
                return;
            }
        }
        panic!("push never finished");
    }

    #[test]
    fn entering_door_completes_the_level() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.state = PlayerState::EnteringDoor;
        p.anim = 0;
        for tick in 0..40 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, 0, 0,
            );
        }
        assert_eq!(p.anim, 1024);
        assert_eq!(
            events.iter().filter(|e| **e == GameEvent::LevelComplete).count(),
            1
        );
    }

    #[test]
    fn up_at_a_door_starts_entering() {
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "  D",
            "################################",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        let mut p = Player::new();
        // both torso probes inside the door column
        p.pos = Vec2::new(40.0, 171.0);
        // settle one frame so vel.y is zero at the press
        step_player(&mut p, &mut plane, &classes, &mut blocks, &mut events, 0, 0, 0);
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 1, VK_UP, VK_UP,
        );
        assert_eq!(p.state, PlayerState::EnteringDoor);
        assert!(events.contains(&GameEvent::DoorEntered));
    }

    #[test]
    fn paying_out_at_max_length_releases_the_rope() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.state = PlayerState::Falling;
        p.has_rope = true;
        p.pos = Vec2::new(80.0, 100.0);
        p.rope = Some(Rope::anchored(
            Vec2::new(80.0, 40.0),
            MAX_CABLELEN,
            MAX_CABLELEN,
        ));
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 0, VK_DOWN, VK_DOWN,
        );
        assert!(p.rope.is_none());
        assert_eq!(p.state, PlayerState::Falling);
    }

    #[test]
    fn swing_hold_down_extends_toward_max() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.state = PlayerState::Falling;
        p.has_rope = true;
        p.pos = Vec2::new(80.0, 70.0);
        p.rope = Some(Rope::anchored(Vec2::new(80.0, 40.0), 20.0, MAX_CABLELEN));
        // held (not fresh) down pays the cable out, clamped to max
        for tick in 0..120 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, VK_DOWN, 0,
            );
            if p.rope.is_none() {
                break;
            }
        }
        if let Some(rope) = &p.rope {
            assert!(rope.length <= MAX_CABLELEN);
        }
    }

    #[test]
    fn free_fall_lands_back_to_walking() {
        let (mut plane, classes, mut blocks, mut events) = world(FLAT);
        let mut p = Player::new();
        p.state = PlayerState::Falling;
        p.pos = Vec2::new(80.0, 100.0);
        p.theta = TAU / 4; // hanging straight down
        for tick in 0..120 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, 0, 0,
            );
            if p.state == PlayerState::Walking {
                break;
            }
        }
        assert_eq!(p.state, PlayerState::Walking);
        assert!(events.contains(&GameEvent::Land));
    }

    #[test]
    fn prepulling_backs_off_then_pulls() {
        // crate right next to the player, room behind to pull into
        let rows: &[&str] = &[
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "   B",
            "################################",
        ];
        let (mut plane, classes, mut blocks, mut events) = world(rows);
        let mut p = Player::new();
        p.pos = Vec2::new(41.0, 171.0);
        // down+A close to the crate requests a pull; too close, so the
        // player backs up first
        step_player(
            &mut p, &mut plane, &classes, &mut blocks, &mut events, 0, VK_A | VK_DOWN, VK_A,
        );
        assert_eq!(p.state, PlayerState::PrePulling);
        for tick in 1..120 {
            step_player(
                &mut p, &mut plane, &classes, &mut blocks, &mut events, tick, 0, 0,
            );
            if p.state == PlayerState::Pulling {
                assert_eq!(blocks.len(), 1);
                assert_eq!(blocks[0].dir, TumbleDir::SlidingLeft);
                return;
            }
        }
        panic!("pull never started, state {:?}", p.state);
    }

    #[test]
    fn hand_chain_is_bounded() {
        // the pose offset stays within arm + body + cable reach
        let mut p = Player::new();
        for theta in 0..TAU {
            for &left in &[false, true] {
                p.theta = theta;
                p.facing_left = left;
                p.arm_angle = (theta % 13) as f64;
                let t = p.hand_chain();
                assert!(t.x.abs() <= 48.0, "x {} at theta {theta}", t.x);
                assert!(t.y.abs() <= 48.0, "y {} at theta {theta}", t.y);
            }
        }
    }
}
