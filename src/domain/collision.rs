/// Four-corner tile collision.
///
/// A probe disc of radius `r` is tested against the 2x2 block of tiles
/// around it. Corner occupancy is a 4-bit mask:
///
///        1 | 2        (dx, dy) is the probe position relative to the
///        --+--        shared corner of the four tiles, so each corner
///        4 | 8        bit pairs with one quadrant.
///
/// The result is the displacement that separates the probe from the
/// occupied corners, or None when there is no contact.

use crate::domain::motion::Vec2;
use crate::domain::tile::TileClasses;
use crate::sim::world::{TilePlane, TILE};

pub fn four_corner_collide(
    plane: &TilePlane,
    classes: &TileClasses,
    x: f64,
    y: f64,
    r: f64,
    with_downsolid: bool,
) -> Option<Vec2> {
    let tlx = ((x - 8.0) / 16.0).floor() as i32;
    let tly = ((y - 8.0) / 16.0).floor() as i32;
    let dx = x - ((tlx + 1) * TILE) as f64;
    let dy = y - ((tly + 1) * TILE) as f64;
    // one-way platforms only matter for the bottom corners, and only
    // while the probe center is above the shared corner
    let with_downsolid = with_downsolid && dy < 0.0;

    let corners = [(tlx, tly), (tlx + 1, tly), (tlx, tly + 1), (tlx + 1, tly + 1)];
    let mut blks: u8 = 0;
    for (i, (cx, cy)) in corners.iter().enumerate() {
        let t = if *cx >= 0 && *cy >= 0 {
            plane.get(*cx, (*cy).min(11))
        } else {
            0
        };
        if classes.is_solid(t) || (i >= 2 && with_downsolid && classes.is_down_solid(t)) {
            blks |= 1 << i;
        }
    }
    if blks == 0 {
        return None;
    }
    if blks == 0x0F {
        // fully embedded: eject a whole tile toward the nearest face
        return Some(if dx < dy {
            if dx < -dy {
                Vec2::new(-16.0, 0.0)
            } else {
                Vec2::new(0.0, 16.0)
            }
        } else if dx < -dy {
            Vec2::new(0.0, -16.0)
        } else {
            Vec2::new(16.0, 0.0)
        });
    }

    let insideblk: u8 = (dx >= 0.0) as u8 | (((dy >= 0.0) as u8) << 1);
    let embedded = (1 << insideblk) & blks != 0;
    if !embedded {
        // project far corners onto the near side when the probe cannot
        // reach across the tile boundary
        if dx <= -r {
            blks &= 0x05;
            blks |= blks << 1;
        } else if dx >= r {
            blks &= 0x0A;
            blks |= blks >> 1;
        }
        if dy <= -r {
            blks &= 0x03;
            blks |= blks << 2;
        } else if dy >= r {
            blks &= 0x0C;
            blks |= blks >> 2;
        }
        if blks == 0 {
            return None;
        }
    }

    // lone corner diagonally opposite the probe's quadrant
    if blks == 8 >> insideblk {
        if dx * dx + dy * dy > r * r {
            return None;
        }
        return Some(Vec2::new(
            if dx > 0.0 { 1.0 } else { -1.0 },
            if dy > 0.0 { 1.0 } else { -1.0 },
        ));
    }

    // complete single corners and opposite-corner pairs into an edge
    if matches!(blks, 1 | 8 | 9) {
        blks |= if dx > dy { 4 } else { 2 };
    } else if matches!(blks, 2 | 4 | 6) {
        blks |= if dx > -dy { 1 } else { 8 };
    }
    debug_assert!(!matches!(blks, 0 | 1 | 2 | 4 | 6 | 8 | 9 | 15));

    let mut push = Vec2::default();
    if blks & 0x05 == 0x05 {
        push.x = r - dx; // left column occupied: push right
    } else if blks & 0x0A == 0x0A {
        push.x = -r - dx; // right column occupied: push left
    }
    if blks & 0x03 == 0x03 {
        push.y = r - dy; // top row occupied: push down
    } else if blks & 0x0C == 0x0C {
        push.y = -r - dy; // bottom row occupied: push up
    }
    debug_assert!(push.x != 0.0 || push.y != 0.0);
    Some(push)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> TileClasses {
        TileClasses::default()
    }

    #[test]
    fn no_contact_in_open_air() {
        let plane = TilePlane::from_rows(&["", "", "", "", "", "", "", "", "", "", "", ""]);
        assert!(four_corner_collide(&plane, &classes(), 40.0, 40.0, 5.0, true).is_none());
    }

    #[test]
    fn fully_embedded_ejects_one_whole_tile() {
        let plane = TilePlane::from_rows(&[
            "####", "####", "####", "####", "####", "####", "####", "####", "####", "####",
            "####", "####",
        ]);
        // dx = dy = -8: nearest face is up
        let push = four_corner_collide(&plane, &classes(), 24.0, 24.0, 5.0, false).unwrap();
        assert_eq!(push, Vec2::new(0.0, -16.0));
        // dx = 7, dy = -1: nearest face is right
        let push = four_corner_collide(&plane, &classes(), 39.0, 31.0, 5.0, false).unwrap();
        assert_eq!(push, Vec2::new(16.0, 0.0));
    }

    #[test]
    fn floor_contact_pushes_up() {
        let plane = TilePlane::from_rows(&["", "##"]);
        // probe at (8, 12): bottom corners land in the solid row,
        // dy = -4, push = -r - dy = -1
        let push = four_corner_collide(&plane, &classes(), 8.0, 12.0, 5.0, false).unwrap();
        assert_eq!(push, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn wall_contact_pushes_sideways() {
        let plane = TilePlane::from_rows(&["#", "#"]);
        // probe right of a wall column: dx = -12 projects the left
        // corners away entirely at r = 5
        assert!(four_corner_collide(&plane, &classes(), 28.0, 16.0, 5.0, false).is_none());
        // close enough to touch: push right... probe left corners in wall
        let push = four_corner_collide(&plane, &classes(), 20.0, 16.0, 5.0, false).unwrap();
        assert!(push.x > 0.0);
        assert_eq!(push.y, 0.0);
    }

    #[test]
    fn lone_opposite_corner_is_radius_checked() {
        // single solid tile; probe in the empty quadrant diagonally
        // touching its corner
        let plane = TilePlane::from_rows(&["", " #"]);
        // tile (1,1) spans 16..32 square; its top-left corner is (16,16)
        let far = four_corner_collide(&plane, &classes(), 10.0, 10.0, 5.0, false);
        assert!(far.is_none());
        let near = four_corner_collide(&plane, &classes(), 13.0, 13.0, 5.0, false).unwrap();
        assert_eq!(near, Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn down_solid_only_counts_from_above() {
        let plane = TilePlane::from_rows(&["", "--"]);
        // descending onto the platform: contact
        let push = four_corner_collide(&plane, &classes(), 8.0, 12.0, 5.0, true).unwrap();
        assert_eq!(push, Vec2::new(0.0, -1.0));
        // same spot with the one-way flag off: nothing
        assert!(four_corner_collide(&plane, &classes(), 8.0, 12.0, 5.0, false).is_none());
        // probe below the shared corner (dy >= 0): platforms are air
        assert!(four_corner_collide(&plane, &classes(), 8.0, 20.0, 5.0, true).is_none());
    }
}
