/// Shared numeric model: integer angle units, quantized trig tables,
/// gravity, and the cable-length constraint.
///
/// Angles are integers with TAU = 64 units per turn, and the trig tables
/// hold values rounded to multiples of 1/256. Positions and velocities
/// are f64 pixels whose sub-pixel parts are exact binary fractions
/// (1/256 units), so every frame of the simulation is bit-reproducible.

pub const TAU: i32 = 64;

/// Angle units per radian.
pub const ANGLE_UNIT: f64 = TAU as f64 / (2.0 * std::f64::consts::PI);

// round(256 * sin(i * 2*pi / 64)) for i in 0..64
const SIN_256: [i32; 64] = [
    0, 25, 50, 74, 98, 121, 142, 162, 181, 198, 213, 226, 237, 245, 251, 255,
    256, 255, 251, 245, 237, 226, 213, 198, 181, 162, 142, 121, 98, 74, 50, 25,
    0, -25, -50, -74, -98, -121, -142, -162, -181, -198, -213, -226, -237, -245, -251, -255,
    -256, -255, -251, -245, -237, -226, -213, -198, -181, -162, -142, -121, -98, -74, -50, -25,
];

/// Quantized sine of an angle in TAU units. Any i32 angle is accepted.
pub fn sin_t(theta: i32) -> f64 {
    SIN_256[theta.rem_euclid(TAU) as usize] as f64 / 256.0
}

/// Quantized cosine of an angle in TAU units.
pub fn cos_t(theta: i32) -> f64 {
    sin_t(theta + TAU / 4)
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }
}

/// Polar decomposition of a displacement through the quantized tables.
/// `r` is the projection of the displacement onto the table unit vector
/// at the rounded angle, not the true Euclidean norm.
pub struct Polar {
    pub r: f64,
    pub theta: i32,
    pub unit_x: f64,
    pub unit_y: f64,
}

pub fn get_rtheta(disp: Vec2) -> Polar {
    let theta = ((disp.y.atan2(disp.x) * ANGLE_UNIT).round() as i32).rem_euclid(TAU);
    let unit_x = cos_t(theta);
    let unit_y = sin_t(theta);
    Polar {
        r: unit_x * disp.x + unit_y * disp.y,
        theta,
        unit_x,
        unit_y,
    }
}

/// One frame of gravity: 17/256 px on even ticks, 18/256 on odd ticks,
/// exactly 35/512 px/frame^2 on average.
pub fn plus_gravity(vy: f64, tick: u64) -> f64 {
    vy + (17 + (tick & 1) as i32) as f64 / 256.0
}

pub struct CableClip {
    pub r: f64,
    pub theta: i32,
    /// Positional correction that was applied, when the cable was taut.
    pub push: Option<Vec2>,
}

/// Constrain a tethered point to at most `cable_len` from its anchor.
/// `disp` (point minus anchor) is projected back onto the cable circle;
/// the velocity correction is capped at 1 px/frame because a full
/// correction makes short cables oscillate.
pub fn clip_vel_to_cable(disp: &mut Vec2, vel: &mut Vec2, cable_len: f64) -> CableClip {
    let polar = get_rtheta(*disp);
    let mut r = polar.r;
    let mut push = None;
    let mut excess = r - cable_len;
    if excess > 0.0 {
        let ex = excess * polar.unit_x;
        let ey = excess * polar.unit_y;
        disp.x -= ex;
        disp.y -= ey;
        r = cable_len;
        push = Some(Vec2::new(ex, ey));
        if excess > 1.0 {
            excess = 1.0;
        }
        vel.x -= excess * polar.unit_x;
        vel.y -= excess * polar.unit_y;
    }
    CableClip {
        r,
        theta: polar.theta,
        push,
    }
}

// ══════════════════════════════════════════
// Tests
// ══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trig_tables_are_consistent() {
        assert_eq!(sin_t(0), 0.0);
        assert_eq!(sin_t(16), 1.0);
        assert_eq!(sin_t(32), 0.0);
        assert_eq!(sin_t(48), -1.0);
        assert_eq!(cos_t(0), 1.0);
        assert_eq!(cos_t(32), -1.0);
        // every entry is a multiple of 1/256
        for i in 0..TAU {
            let v = sin_t(i) * 256.0;
            assert_eq!(v, v.round());
        }
    }

    #[test]
    fn gravity_averages_35_per_512() {
        let mut vy = 0.0;
        for tick in 0..256u64 {
            vy = plus_gravity(vy, tick);
        }
        // 128 * 17/256 + 128 * 18/256, all exact binary fractions
        assert_eq!(vy, 17.5);
    }

    #[test]
    fn rtheta_cardinal_directions() {
        let p = get_rtheta(Vec2::new(10.0, 0.0));
        assert_eq!(p.theta, 0);
        assert_eq!(p.r, 10.0);
        let p = get_rtheta(Vec2::new(0.0, 10.0));
        assert_eq!(p.theta, 16);
        assert_eq!(p.r, 10.0);
        let p = get_rtheta(Vec2::new(-10.0, 0.0));
        assert_eq!(p.theta, 32);
    }

    #[test]
    fn clip_is_a_noop_inside_the_cable() {
        let mut disp = Vec2::new(3.0, 4.0);
        let mut vel = Vec2::new(1.0, 1.0);
        let clip = clip_vel_to_cable(&mut disp, &mut vel, 48.0);
        assert_eq!(disp, Vec2::new(3.0, 4.0));
        assert_eq!(vel, Vec2::new(1.0, 1.0));
        assert!(clip.push.is_none());
    }

    #[test]
    fn clip_projects_exactly_onto_the_cable() {
        // straight down: theta 16, unit (0, 1), r exact
        let mut disp = Vec2::new(0.0, 60.0);
        let mut vel = Vec2::new(0.0, 0.0);
        let clip = clip_vel_to_cable(&mut disp, &mut vel, 48.0);
        assert_eq!(disp.y, 48.0);
        assert_eq!(clip.r, 48.0);
        let push = clip.push.unwrap();
        assert_eq!(push, Vec2::new(0.0, 12.0));
        // velocity correction capped at 1 even though excess was 12
        assert_eq!(vel.y, -1.0);
    }

    #[test]
    fn clip_small_excess_corrects_velocity_fully() {
        let mut disp = Vec2::new(0.0, 48.5);
        let mut vel = Vec2::new(0.0, 2.0);
        clip_vel_to_cable(&mut disp, &mut vel, 48.0);
        assert_eq!(disp.y, 48.0);
        assert_eq!(vel.y, 1.5);
    }
}
